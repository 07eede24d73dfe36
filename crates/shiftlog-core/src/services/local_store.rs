//! Local shift log shared by the CLI, the sync engine and watchers.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex};

use crate::db::{
    AccountRepository, Database, LibSqlAccountRepository, LibSqlShiftRepository, ShiftRepository,
};
use crate::models::{Account, Shift, ShiftId};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::{Error, Result};

const EVENT_CAPACITY: usize = 64;

/// Change notification published after every committed local write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// One shift was created or mutated by a local action
    ShiftChanged(ShiftId),
    /// A reconciled batch changed local records
    ShiftsMerged(ReconcileReport),
    /// The account email or sync bookkeeping changed
    AccountChanged,
    /// All local data was removed
    Wiped,
}

/// Thread-safe handle to the local replica.
///
/// All writes go through one connection guarded by an async mutex, so two
/// actions never interleave against the same record.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
    events: broadcast::Sender<StoreEvent>,
}

impl LocalStore {
    /// Open the local store at the given filesystem path.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::debug!("Opening local shift log at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self::from_database(db, Some(db_path)))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db, None))
    }

    fn from_database(db: Database, db_path: Option<PathBuf>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            db_path,
            events,
        }
    }

    /// Path of the backing file, `None` for in-memory stores.
    pub fn db_path(&self) -> Option<&PathBuf> {
        self.db_path.as_ref()
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: StoreEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    /// Start a new shift. Fails while another shift is still running.
    pub async fn start_shift(&self, now: DateTime<Utc>) -> Result<Shift> {
        let shift = {
            let db = self.db.lock().await;
            let repo = LibSqlShiftRepository::new(db.connection());
            if repo.current().await?.is_some() {
                return Err(Error::ShiftAlreadyOpen);
            }
            let shift = Shift::start(now);
            repo.insert(&shift).await?;
            shift
        };

        tracing::info!(shift = %shift.id, "Shift started");
        self.publish(StoreEvent::ShiftChanged(shift.id.clone()));
        Ok(shift)
    }

    /// End the running shift.
    pub async fn end_shift(&self, now: DateTime<Utc>) -> Result<Shift> {
        let shift = self.update_current(|shift| shift.end(now)).await?;
        tracing::info!(shift = %shift.id, "Shift ended");
        Ok(shift)
    }

    /// Start a break on the running shift.
    pub async fn start_break(&self, now: DateTime<Utc>) -> Result<Shift> {
        let shift = self.update_current(|shift| shift.start_break(now)).await?;
        tracing::info!(shift = %shift.id, "Break started");
        Ok(shift)
    }

    /// End the running break on the running shift.
    pub async fn end_break(&self, now: DateTime<Utc>) -> Result<Shift> {
        let shift = self.update_current(|shift| shift.end_break(now)).await?;
        tracing::info!(shift = %shift.id, "Break ended");
        Ok(shift)
    }

    async fn update_current(&self, mutate: impl FnOnce(&Shift) -> Result<Shift>) -> Result<Shift> {
        let updated = {
            let db = self.db.lock().await;
            let repo = LibSqlShiftRepository::new(db.connection());
            let current = repo.current().await?.ok_or(Error::NoOpenShift)?;
            let updated = mutate(&current)?;
            repo.save(&updated).await?;
            updated
        };

        self.publish(StoreEvent::ShiftChanged(updated.id.clone()));
        Ok(updated)
    }

    /// The running shift, if any.
    pub async fn current_shift(&self) -> Result<Option<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlShiftRepository::new(db.connection());
        repo.current().await
    }

    /// Fetch a shift by id.
    pub async fn get_shift(&self, id: &ShiftId) -> Result<Option<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlShiftRepository::new(db.connection());
        repo.get(id).await
    }

    /// List shifts newest-first.
    pub async fn list_shifts(&self, limit: usize, offset: usize) -> Result<Vec<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlShiftRepository::new(db.connection());
        repo.list(limit, offset).await
    }

    /// Every local shift, newest-first.
    pub async fn all_shifts(&self) -> Result<Vec<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlShiftRepository::new(db.connection());
        repo.all().await
    }

    /// Shifts started at or after `since`, oldest-first.
    pub async fn shifts_started_since(&self, since: DateTime<Utc>) -> Result<Vec<Shift>> {
        let db = self.db.lock().await;
        let repo = LibSqlShiftRepository::new(db.connection());
        repo.started_since(since).await
    }

    /// Merge records from another replica into the local log.
    pub async fn apply_incoming(&self, batch: &[Shift]) -> Result<ReconcileReport> {
        let report = {
            let db = self.db.lock().await;
            let repo = LibSqlShiftRepository::new(db.connection());
            reconcile(&repo, batch).await?
        };

        if report.changed() {
            self.publish(StoreEvent::ShiftsMerged(report));
        }
        Ok(report)
    }

    /// The configured account, if any.
    pub async fn account(&self) -> Result<Option<Account>> {
        let db = self.db.lock().await;
        let repo = LibSqlAccountRepository::new(db.connection());
        repo.load().await
    }

    /// Create or change the account email.
    ///
    /// Returns the account and whether the email differs from the previous one.
    pub async fn set_account_email(&self, email: &str) -> Result<(Account, bool)> {
        let (account, changed) = {
            let db = self.db.lock().await;
            let repo = LibSqlAccountRepository::new(db.connection());
            let previous = repo.load().await?;
            let account = repo.set_email(email).await?;
            let changed = previous.is_none_or(|previous| previous.email != account.email);
            (account, changed)
        };

        self.publish(StoreEvent::AccountChanged);
        Ok((account, changed))
    }

    /// Record a successful sync. Only the sync engine calls this.
    pub(crate) async fn mark_synced(&self, at: DateTime<Utc>) -> Result<()> {
        {
            let db = self.db.lock().await;
            let repo = LibSqlAccountRepository::new(db.connection());
            repo.mark_synced(at).await?;
        }
        self.publish(StoreEvent::AccountChanged);
        Ok(())
    }

    /// Remove every local shift and the account row.
    ///
    /// Returns the number of shifts removed.
    pub async fn wipe(&self) -> Result<u64> {
        let removed = {
            let db = self.db.lock().await;
            let conn = db.connection();
            conn.execute("BEGIN TRANSACTION", ()).await?;

            let result = async {
                let removed = LibSqlShiftRepository::new(conn).clear().await?;
                LibSqlAccountRepository::new(conn).clear().await?;
                Ok::<_, Error>(removed)
            }
            .await;

            match result {
                Ok(removed) => {
                    if let Err(e) = conn.execute("COMMIT", ()).await {
                        conn.execute("ROLLBACK", ()).await.ok();
                        return Err(e.into());
                    }
                    removed
                }
                Err(e) => {
                    conn.execute("ROLLBACK", ()).await.ok();
                    return Err(e);
                }
            }
        };

        tracing::warn!(removed, "Wiped local shift log");
        self.publish(StoreEvent::Wiped);
        Ok(removed)
    }
}
