//! Orchestrates push, pull and wipe between the local store and a remote.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use super::payload::{DeleteHistoryRequest, ListRequest, SyncAck, SyncPushRequest};
use super::transport::SyncTransport;
use crate::models::{Account, ShiftId};
use crate::reconcile::ReconcileReport;
use crate::services::LocalStore;
use crate::{Error, Result};

/// Counts from a remote wipe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WipeReport {
    pub local: u64,
    pub remote: u64,
}

/// Stateless sync driver; every call reads fresh state from the store.
pub struct SyncEngine<T> {
    store: LocalStore,
    transport: T,
}

impl<T: SyncTransport> SyncEngine<T> {
    pub const fn new(store: LocalStore, transport: T) -> Self {
        Self { store, transport }
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    async fn require_account(&self) -> Result<Account> {
        self.store.account().await?.ok_or(Error::NoAccount)
    }

    /// Push every local shift to the remote.
    ///
    /// `synced_at` moves only after the remote acknowledged the batch; a
    /// failed push leaves local state untouched and can simply be retried.
    pub async fn sync(&self) -> Result<SyncAck> {
        let account = self.require_account().await?;
        let shifts = self.store.all_shifts().await?;
        tracing::info!(shifts = shifts.len(), "Pushing local shifts");

        let request = SyncPushRequest {
            email: account.email,
            shifts,
        };
        let ack = self.transport.push(&request).await.inspect_err(|e| {
            tracing::warn!("Sync push failed: {e}");
        })?;

        self.store.mark_synced(Utc::now()).await?;
        tracing::info!(
            inserted = ack.inserted,
            updated = ack.updated,
            discarded = ack.discarded,
            "Sync push acknowledged"
        );
        Ok(ack)
    }

    /// Fetch the account's full remote history and merge it locally.
    pub async fn pull(&self) -> Result<ReconcileReport> {
        let account = self.require_account().await?;
        let mut request = ListRequest::first_page(account.email);
        let mut total = ReconcileReport::default();
        let mut pages = 0_usize;
        let mut seen = HashSet::new();

        loop {
            let response = self.transport.list(&request).await?;
            pages += 1;

            let report = self.store.apply_incoming(&response.items).await?;
            total.inserted += report.inserted;
            total.updated += report.updated;
            total.discarded += report.discarded;

            match response.meta.next_cursor {
                None => break,
                Some(next) => {
                    ensure_progress(&mut seen, &next)?;
                    request.cursor = Some(next);
                }
            }
        }

        tracing::info!(
            pages,
            inserted = total.inserted,
            updated = total.updated,
            "Pulled remote shifts"
        );
        Ok(total)
    }

    /// Remove every local shift and the account.
    pub async fn wipe_local(&self) -> Result<u64> {
        self.store.wipe().await
    }

    /// Remove local data first, then the account's remote history.
    pub async fn wipe_remote_and_local(&self) -> Result<WipeReport> {
        let account = self.require_account().await?;
        let local = self.store.wipe().await?;

        let response = self
            .transport
            .delete_history(&DeleteHistoryRequest {
                email: account.email,
            })
            .await?;

        tracing::warn!(local, remote = response.deleted, "Wiped remote history");
        Ok(WipeReport {
            local,
            remote: response.deleted,
        })
    }
}

/// A cursor may be handed out once per pull; a repeat means the remote loops.
fn ensure_progress(seen: &mut HashSet<ShiftId>, next: &ShiftId) -> Result<()> {
    if !seen.insert(next.clone()) {
        return Err(Error::Transport(format!(
            "remote returned page cursor {next} more than once"
        )));
    }
    Ok(())
}
