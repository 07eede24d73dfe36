//! Data models for shiftlog

mod account;
mod shift;

pub use account::{normalize_email, Account};
pub use shift::{BreakInterval, EndState, Shift, ShiftId};
