//! Services that wrap the database layer for the action handlers

mod local_store;

pub use local_store::{LocalStore, StoreEvent};
