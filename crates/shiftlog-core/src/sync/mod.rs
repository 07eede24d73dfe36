//! Synchronization between the local store and the remote store.
//!
//! [`SyncEngine`] is the only component that talks to both replicas. It
//! reaches the remote through a [`SyncTransport`]: [`HttpSyncClient`] for the
//! real API and [`InMemoryRemote`] for tests.

mod client;
mod engine;
mod memory;
mod payload;
mod transport;

pub use client::HttpSyncClient;
pub use engine::{SyncEngine, WipeReport};
pub use memory::InMemoryRemote;
pub use payload::{
    DeleteHistoryRequest, DeleteHistoryResponse, ListMeta, ListRequest, ListResponse, ShiftOrder,
    SyncAck, SyncPushRequest, MAX_PAGE_LIMIT,
};
pub use transport::SyncTransport;
