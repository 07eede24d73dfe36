pub mod account;
pub mod common;
pub mod completions;
pub mod list;
pub mod shift;
pub mod stats;
pub mod status;
pub mod sync;
pub mod wipe;
