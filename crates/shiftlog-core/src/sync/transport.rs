//! Transport seam between the sync engine and a remote store.

use super::payload::{
    DeleteHistoryRequest, DeleteHistoryResponse, ListRequest, ListResponse, SyncAck,
    SyncPushRequest,
};
use crate::Result;

/// Carries sync requests to a remote replica.
///
/// Implementations map unreachable peers, timeouts and server failures to
/// [`Error::Transport`](crate::Error::Transport) and rejected payloads to
/// [`Error::Validation`](crate::Error::Validation).
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    /// Push a batch for reconciliation on the remote
    async fn push(&self, request: &SyncPushRequest) -> Result<SyncAck>;

    /// Fetch one page of the account's remote shifts
    async fn list(&self, request: &ListRequest) -> Result<ListResponse>;

    /// Delete every remote shift for the account
    async fn delete_history(&self, request: &DeleteHistoryRequest)
        -> Result<DeleteHistoryResponse>;
}
