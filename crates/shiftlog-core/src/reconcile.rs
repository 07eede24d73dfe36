//! Record-level last-writer-wins reconciliation.
//!
//! A pusher hands a batch of [`Shift`]s to a receiver replica. For each
//! record the receiver either inserts it (no record with that id), overwrites
//! its own copy (incoming `updated_at` is strictly newer), or discards it.
//! Whole records win; fields are never merged, so a newer ongoing record
//! replaces an older ended one and reopens the shift.
//!
//! All decisions are taken against one snapshot of receiver versions read at
//! the start of the batch. Accepted records are then written through the
//! receiver's conditional upsert, which re-checks `updated_at` atomically so
//! two concurrent batches for the same id cannot lose an update.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Shift, ShiftId};

/// Receiver-side `updated_at` per known id, read once per batch
pub type VersionSnapshot = HashMap<ShiftId, DateTime<Utc>>;

/// What to do with one incoming record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Receiver has no record with this id
    Insert,
    /// Incoming record is newer and replaces the receiver's copy
    Overwrite,
    /// Receiver's copy is as new or newer; incoming record is dropped
    Discard,
}

/// Outcome counts for one reconciled batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub discarded: usize,
}

impl ReconcileReport {
    /// Whether the batch changed receiver state at all
    pub const fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// A replica that can receive reconciled records
///
/// Implementations are already scoped to one owner (the remote binds an
/// account, the local store has a single implicit owner).
#[allow(async_fn_in_trait)]
pub trait ShiftReceiver {
    /// Current `updated_at` for each of `ids` the receiver knows about
    async fn versions(&self, ids: &[ShiftId]) -> Result<VersionSnapshot>;

    /// Atomically insert `shift`, or replace the stored record with the same
    /// id only when `shift.updated_at` is strictly newer.
    ///
    /// Returns whether a row was written.
    async fn upsert_if_newer(&self, shift: &Shift) -> Result<bool>;
}

/// Decide the fate of one incoming record given the receiver's version.
pub fn decide(incoming: &Shift, existing: Option<DateTime<Utc>>) -> Decision {
    match existing {
        None => Decision::Insert,
        Some(existing) if incoming.updated_at > existing => Decision::Overwrite,
        Some(_) => Decision::Discard,
    }
}

/// Decide every record of a batch against the same snapshot.
pub fn plan(batch: &[Shift], snapshot: &VersionSnapshot) -> Vec<Decision> {
    batch
        .iter()
        .map(|shift| decide(shift, snapshot.get(&shift.id).copied()))
        .collect()
}

/// Reconcile `batch` into `receiver`.
///
/// Records are applied independently; a failure part-way leaves earlier
/// records applied, which is safe because re-running the batch converges.
pub async fn reconcile<R: ShiftReceiver>(receiver: &R, batch: &[Shift]) -> Result<ReconcileReport> {
    let ids = batch.iter().map(|shift| shift.id.clone()).collect::<Vec<_>>();
    let snapshot = receiver.versions(&ids).await?;
    let decisions = plan(batch, &snapshot);

    let mut report = ReconcileReport::default();
    for (shift, decision) in batch.iter().zip(decisions) {
        if decision == Decision::Discard {
            report.discarded += 1;
            continue;
        }

        if !receiver.upsert_if_newer(shift).await? {
            // a newer copy landed after the snapshot was taken
            report.discarded += 1;
            continue;
        }

        match decision {
            Decision::Insert => report.inserted += 1,
            Decision::Overwrite => report.updated += 1,
            Decision::Discard => {}
        }
    }

    tracing::debug!(
        batch = batch.len(),
        inserted = report.inserted,
        updated = report.updated,
        discarded = report.discarded,
        "Reconciled shift batch"
    );
    Ok(report)
}

/// In-memory receiver keyed by id.
///
/// Used as the receiver half of [`crate::sync::InMemoryRemote`] and in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryReceiver {
    shifts: HashMap<ShiftId, Shift>,
}

impl MemoryReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ShiftId) -> Option<&Shift> {
        self.shifts.get(id)
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// All records ordered by start time, newest first
    pub fn all(&self) -> Vec<Shift> {
        let mut shifts = self.shifts.values().cloned().collect::<Vec<_>>();
        shifts.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        shifts
    }

    pub fn clear(&mut self) -> usize {
        let count = self.shifts.len();
        self.shifts.clear();
        count
    }

    fn versions_of(&self, ids: &[ShiftId]) -> VersionSnapshot {
        ids.iter()
            .filter_map(|id| self.shifts.get(id).map(|shift| (id.clone(), shift.updated_at)))
            .collect()
    }

    fn write_if_newer(&mut self, shift: &Shift) -> bool {
        match self.shifts.get(&shift.id) {
            Some(existing) if shift.updated_at <= existing.updated_at => false,
            _ => {
                self.shifts.insert(shift.id.clone(), shift.clone());
                true
            }
        }
    }

    /// Synchronous counterpart of [`reconcile`] for exclusive access.
    pub fn apply(&mut self, batch: &[Shift]) -> ReconcileReport {
        let ids = batch.iter().map(|shift| shift.id.clone()).collect::<Vec<_>>();
        let snapshot = self.versions_of(&ids);

        let mut report = ReconcileReport::default();
        for (shift, decision) in batch.iter().zip(plan(batch, &snapshot)) {
            match decision {
                Decision::Discard => report.discarded += 1,
                _ if !self.write_if_newer(shift) => report.discarded += 1,
                Decision::Insert => report.inserted += 1,
                Decision::Overwrite => report.updated += 1,
            }
        }
        report
    }
}

impl ShiftReceiver for tokio::sync::Mutex<MemoryReceiver> {
    async fn versions(&self, ids: &[ShiftId]) -> Result<VersionSnapshot> {
        Ok(self.lock().await.versions_of(ids))
    }

    async fn upsert_if_newer(&self, shift: &Shift) -> Result<bool> {
        Ok(self.lock().await.write_if_newer(shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EndState;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use tokio::sync::Mutex;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn shift_with(id: &ShiftId, updated: i64, ended: Option<i64>) -> Shift {
        Shift {
            id: id.clone(),
            started_at: t(0),
            ended_at: ended.map(t).into(),
            breaks: Vec::new(),
            updated_at: t(updated),
        }
    }

    #[test]
    fn decide_follows_last_writer_wins() {
        let id = ShiftId::new();
        let incoming = shift_with(&id, 10, None);
        assert_eq!(decide(&incoming, None), Decision::Insert);
        assert_eq!(decide(&incoming, Some(t(5))), Decision::Overwrite);
        assert_eq!(decide(&incoming, Some(t(10))), Decision::Discard);
        assert_eq!(decide(&incoming, Some(t(20))), Decision::Discard);
    }

    #[test]
    fn plan_uses_snapshot_not_earlier_batch_entries() {
        let id = ShiftId::new();
        let batch = vec![shift_with(&id, 10, None), shift_with(&id, 20, Some(30))];
        // both are inserts against an empty snapshot
        assert_eq!(
            plan(&batch, &VersionSnapshot::new()),
            vec![Decision::Insert, Decision::Insert]
        );
    }

    #[tokio::test]
    async fn create_on_absence_inserts_verbatim() {
        let receiver = Mutex::new(MemoryReceiver::new());
        let shift = shift_with(&ShiftId::new(), 1, None);

        let report = reconcile(&receiver, std::slice::from_ref(&shift)).await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(receiver.lock().await.get(&shift.id), Some(&shift));
    }

    #[tokio::test]
    async fn newer_incoming_overwrites_whole_record() {
        let id = ShiftId::new();
        let receiver = Mutex::new(MemoryReceiver::new());
        reconcile(&receiver, &[shift_with(&id, 1, None)]).await.unwrap();

        let closed = shift_with(&id, 2, Some(480));
        let report = reconcile(&receiver, std::slice::from_ref(&closed)).await.unwrap();

        assert_eq!(report.updated, 1);
        let stored = receiver.lock().await.get(&id).cloned().unwrap();
        assert_eq!(stored.ended_at, EndState::Ended(t(480)));
        assert_eq!(stored.updated_at, t(2));
    }

    #[tokio::test]
    async fn older_or_equal_incoming_never_changes_receiver() {
        let id = ShiftId::new();
        let receiver = Mutex::new(MemoryReceiver::new());
        let current = shift_with(&id, 5, Some(60));
        reconcile(&receiver, std::slice::from_ref(&current)).await.unwrap();

        let before = receiver.lock().await.clone();
        let report = reconcile(&receiver, &[shift_with(&id, 1, None), shift_with(&id, 5, None)])
            .await
            .unwrap();

        assert_eq!(report.discarded, 2);
        assert_eq!(*receiver.lock().await, before);
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let receiver = Mutex::new(MemoryReceiver::new());
        let existing = shift_with(&ShiftId::new(), 3, None);
        reconcile(&receiver, std::slice::from_ref(&existing)).await.unwrap();

        let batch = vec![
            shift_with(&existing.id, 9, Some(90)),
            shift_with(&ShiftId::new(), 4, None),
        ];
        reconcile(&receiver, &batch).await.unwrap();
        let once = receiver.lock().await.clone();

        let second = reconcile(&receiver, &batch).await.unwrap();
        assert!(!second.changed());
        assert_eq!(*receiver.lock().await, once);
    }

    #[tokio::test]
    async fn application_order_does_not_change_the_winner() {
        let id = ShiftId::new();
        let older = shift_with(&id, 1, None);
        let newer = shift_with(&id, 2, Some(240));

        let forward = Mutex::new(MemoryReceiver::new());
        reconcile(&forward, std::slice::from_ref(&older)).await.unwrap();
        reconcile(&forward, std::slice::from_ref(&newer)).await.unwrap();

        let backward = Mutex::new(MemoryReceiver::new());
        reconcile(&backward, std::slice::from_ref(&newer)).await.unwrap();
        reconcile(&backward, std::slice::from_ref(&older)).await.unwrap();

        assert_eq!(forward.lock().await.get(&id), Some(&newer));
        assert_eq!(backward.lock().await.get(&id), Some(&newer));
    }

    #[tokio::test]
    async fn duplicate_ids_in_one_batch_converge_to_newest() {
        let id = ShiftId::new();
        let receiver = Mutex::new(MemoryReceiver::new());
        let batch = vec![shift_with(&id, 7, Some(70)), shift_with(&id, 3, None)];

        let report = reconcile(&receiver, &batch).await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.discarded, 1);
        assert_eq!(receiver.lock().await.get(&id), Some(&batch[0]));
    }

    #[tokio::test]
    async fn newer_open_record_reopens_an_ended_shift() {
        let id = ShiftId::new();
        let receiver = Mutex::new(MemoryReceiver::new());
        reconcile(&receiver, &[shift_with(&id, 1, Some(60))]).await.unwrap();

        reconcile(&receiver, &[shift_with(&id, 2, None)]).await.unwrap();

        let stored = receiver.lock().await.get(&id).cloned().unwrap();
        assert!(stored.is_ongoing());
    }

    #[test]
    fn sync_apply_matches_async_reconcile() {
        let id = ShiftId::new();
        let mut receiver = MemoryReceiver::new();
        let first = receiver.apply(&[shift_with(&id, 1, None)]);
        let second = receiver.apply(&[shift_with(&id, 2, Some(5)), shift_with(&id, 1, None)]);

        assert_eq!(first.inserted, 1);
        assert_eq!(second.updated, 1);
        assert_eq!(second.discarded, 1);
        assert_eq!(receiver.get(&id).unwrap().updated_at, t(2));
    }
}
