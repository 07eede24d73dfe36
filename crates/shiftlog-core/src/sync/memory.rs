//! In-process remote used by tests and offline tooling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::Mutex;

use super::payload::{
    DeleteHistoryRequest, DeleteHistoryResponse, ListMeta, ListRequest, ListResponse, SyncAck,
    SyncPushRequest,
};
use super::transport::SyncTransport;
use crate::models::{normalize_email, Shift};
use crate::reconcile::MemoryReceiver;
use crate::{Error, Result};

/// Remote store kept in memory, one receiver per account email.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    accounts: Mutex<HashMap<String, MemoryReceiver>>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following request fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests received, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Stored shifts for `email`, newest first.
    pub async fn shifts_for(&self, email: &str) -> Vec<Shift> {
        self.accounts
            .lock()
            .await
            .get(email)
            .map(MemoryReceiver::all)
            .unwrap_or_default()
    }

    fn begin_request(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Transport("remote unreachable".to_string()));
        }
        Ok(())
    }
}

impl SyncTransport for InMemoryRemote {
    async fn push(&self, request: &SyncPushRequest) -> Result<SyncAck> {
        self.begin_request()?;
        let email = normalize_email(&request.email)?;

        let report = self
            .accounts
            .lock()
            .await
            .entry(email)
            .or_default()
            .apply(&request.shifts);
        Ok(SyncAck::from_report(report))
    }

    async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        self.begin_request()?;
        let email = normalize_email(&request.email)?;

        let shifts = self
            .accounts
            .lock()
            .await
            .entry(email)
            .or_default()
            .all();
        page(shifts, request)
    }

    async fn delete_history(
        &self,
        request: &DeleteHistoryRequest,
    ) -> Result<DeleteHistoryResponse> {
        self.begin_request()?;
        let email = normalize_email(&request.email)?;

        let deleted = self
            .accounts
            .lock()
            .await
            .get_mut(&email)
            .map_or(0, MemoryReceiver::clear);
        Ok(DeleteHistoryResponse {
            deleted: u64::try_from(deleted).unwrap_or(u64::MAX),
        })
    }
}

/// Cut one page out of an account's full record set.
///
/// An unknown cursor yields an empty last page.
fn page(mut shifts: Vec<Shift>, request: &ListRequest) -> Result<ListResponse> {
    let limit = request.effective_limit()?;
    shifts.sort_by(|a, b| request.order_by.compare(a, b));
    let total_items = u64::try_from(shifts.len()).unwrap_or(u64::MAX);

    let start = match &request.cursor {
        None => 0,
        Some(cursor) => shifts
            .iter()
            .position(|shift| &shift.id == cursor)
            .unwrap_or(shifts.len()),
    };
    let end = shifts.len().min(start + limit as usize);
    let next_cursor = shifts.get(end).map(|shift| shift.id.clone());

    Ok(ListResponse {
        items: shifts.drain(start..end).collect(),
        meta: ListMeta {
            next_cursor,
            limit,
            total_items,
        },
    })
}
