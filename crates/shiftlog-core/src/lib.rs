//! shiftlog-core - Core library for shiftlog
//!
//! Shift and break models, the local libSQL store, last-writer-wins
//! reconciliation, the sync engine and the statistics projections shared by
//! the CLI and the API server.

pub mod config;
pub mod db;
pub mod error;
pub mod live;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod stats;
pub mod sync;
pub mod util;
pub mod watch;

pub use error::{Error, Result};
pub use models::{Account, BreakInterval, EndState, Shift, ShiftId};
