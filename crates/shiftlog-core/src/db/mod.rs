//! Database layer for shiftlog

mod account_repository;
mod connection;
pub mod migrations;
pub mod rows;
mod shift_repository;

pub use account_repository::{AccountRepository, LibSqlAccountRepository};
pub use connection::Database;
pub use migrations::Migration;
pub use shift_repository::{LibSqlShiftRepository, ShiftRepository};
