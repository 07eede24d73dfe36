//! Shift repository implementation

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT/OFFSET

use chrono::{DateTime, Utc};
use libsql::{Connection, Value};

use crate::db::rows::{
    parse_shift_id, placeholders, shift_from_row, shift_values, SHIFT_COLUMNS,
};
use crate::error::{Error, Result};
use crate::models::{Shift, ShiftId};
use crate::reconcile::{ShiftReceiver, VersionSnapshot};
use crate::util::{from_storage_micros, to_storage_micros};

/// SQLite keeps at most 999 host parameters on older builds
const ID_CHUNK: usize = 500;

/// Trait for shift storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ShiftRepository {
    /// Insert a freshly created shift
    async fn insert(&self, shift: &Shift) -> Result<()>;

    /// Replace a stored shift with a locally mutated version
    async fn save(&self, shift: &Shift) -> Result<()>;

    /// Get a shift by ID
    async fn get(&self, id: &ShiftId) -> Result<Option<Shift>>;

    /// List shifts, most recently started first
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Shift>>;

    /// Every stored shift, most recently started first
    async fn all(&self) -> Result<Vec<Shift>>;

    /// The earliest-started shift that has not ended
    async fn current(&self) -> Result<Option<Shift>>;

    /// Shifts whose start is at or after `since`, oldest first
    async fn started_since(&self, since: DateTime<Utc>) -> Result<Vec<Shift>>;

    /// Remove every shift; returns the number removed
    async fn clear(&self) -> Result<u64>;
}

/// libSQL implementation of `ShiftRepository`
pub struct LibSqlShiftRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlShiftRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn query_shifts(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Shift>> {
        let mut rows = self.conn.query(sql, params).await?;
        let mut shifts = Vec::new();
        while let Some(row) = rows.next().await? {
            shifts.push(shift_from_row(&row, 0)?);
        }
        Ok(shifts)
    }
}

impl ShiftRepository for LibSqlShiftRepository<'_> {
    async fn insert(&self, shift: &Shift) -> Result<()> {
        self.conn
            .execute(
                &format!("INSERT INTO shifts ({SHIFT_COLUMNS}) VALUES (?, ?, ?, ?, ?)"),
                shift_values(shift)?,
            )
            .await?;
        Ok(())
    }

    async fn save(&self, shift: &Shift) -> Result<()> {
        let mut params = shift_values(shift)?;
        // move id to the WHERE position
        let id = params.remove(0);
        params.push(id);

        let rows = self
            .conn
            .execute(
                "UPDATE shifts SET started_at = ?, ended_at = ?, breaks = ?, updated_at = ?
                 WHERE id = ?",
                params,
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(shift.id.to_string()));
        }
        Ok(())
    }

    async fn get(&self, id: &ShiftId) -> Result<Option<Shift>> {
        let mut shifts = self
            .query_shifts(
                &format!("SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?"),
                vec![Value::Text(id.to_string())],
            )
            .await?;
        Ok(shifts.pop())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Shift>> {
        self.query_shifts(
            &format!(
                "SELECT {SHIFT_COLUMNS} FROM shifts
                 ORDER BY started_at DESC, id DESC
                 LIMIT ? OFFSET ?"
            ),
            vec![Value::Integer(limit as i64), Value::Integer(offset as i64)],
        )
        .await
    }

    async fn all(&self) -> Result<Vec<Shift>> {
        self.query_shifts(
            &format!("SELECT {SHIFT_COLUMNS} FROM shifts ORDER BY started_at DESC, id DESC"),
            Vec::new(),
        )
        .await
    }

    async fn current(&self) -> Result<Option<Shift>> {
        let mut shifts = self
            .query_shifts(
                &format!(
                    "SELECT {SHIFT_COLUMNS} FROM shifts
                     WHERE ended_at IS NULL
                     ORDER BY started_at ASC
                     LIMIT 1"
                ),
                Vec::new(),
            )
            .await?;
        Ok(shifts.pop())
    }

    async fn started_since(&self, since: DateTime<Utc>) -> Result<Vec<Shift>> {
        self.query_shifts(
            &format!(
                "SELECT {SHIFT_COLUMNS} FROM shifts
                 WHERE started_at >= ?
                 ORDER BY started_at ASC"
            ),
            vec![Value::Integer(to_storage_micros(since))],
        )
        .await
    }

    async fn clear(&self) -> Result<u64> {
        Ok(self.conn.execute("DELETE FROM shifts", ()).await?)
    }
}

impl ShiftReceiver for LibSqlShiftRepository<'_> {
    async fn versions(&self, ids: &[ShiftId]) -> Result<VersionSnapshot> {
        let mut snapshot = VersionSnapshot::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let params = chunk
                .iter()
                .map(|id| Value::Text(id.to_string()))
                .collect::<Vec<_>>();
            let mut rows = self
                .conn
                .query(
                    &format!(
                        "SELECT id, updated_at FROM shifts WHERE id IN ({})",
                        placeholders(chunk.len())
                    ),
                    params,
                )
                .await?;
            while let Some(row) = rows.next().await? {
                let id: String = row.get(0)?;
                let updated_at: i64 = row.get(1)?;
                snapshot.insert(parse_shift_id(&id)?, from_storage_micros(updated_at)?);
            }
        }
        Ok(snapshot)
    }

    async fn upsert_if_newer(&self, shift: &Shift) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                &format!(
                    "INSERT INTO shifts ({SHIFT_COLUMNS}) VALUES (?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                         started_at = excluded.started_at,
                         ended_at = excluded.ended_at,
                         breaks = excluded.breaks,
                         updated_at = excluded.updated_at
                     WHERE excluded.updated_at > shifts.updated_at"
                ),
                shift_values(shift)?,
            )
            .await?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::EndState;
    use crate::reconcile::reconcile;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insert_and_get_round_trips_breaks() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());

        let shift = Shift::start(t(0))
            .start_break(t(60))
            .and_then(|s| s.end_break(t(75)))
            .and_then(|s| s.start_break(t(200)))
            .unwrap();
        repo.insert(&shift).await.unwrap();

        let fetched = repo.get(&shift.id).await.unwrap().unwrap();
        assert_eq!(fetched, shift);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_requires_existing_row() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());

        let shift = Shift::start(t(0));
        assert!(matches!(repo.save(&shift).await, Err(Error::NotFound(_))));

        repo.insert(&shift).await.unwrap();
        let ended = shift.end(t(480)).unwrap();
        repo.save(&ended).await.unwrap();

        let fetched = repo.get(&shift.id).await.unwrap().unwrap();
        assert_eq!(fetched.ended_at, EndState::Ended(t(480)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_newest_first() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());

        for day in 0..3 {
            let shift = Shift::start(t(day * 24 * 60)).end(t(day * 24 * 60 + 60)).unwrap();
            repo.insert(&shift).await.unwrap();
        }

        let shifts = repo.list(2, 0).await.unwrap();
        assert_eq!(shifts.len(), 2);
        assert!(shifts[0].started_at > shifts[1].started_at);
        assert_eq!(repo.all().await.unwrap().len(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_current_returns_open_shift() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());

        repo.insert(&Shift::start(t(0)).end(t(60)).unwrap())
            .await
            .unwrap();
        assert!(repo.current().await.unwrap().is_none());

        let open = Shift::start(t(120));
        repo.insert(&open).await.unwrap();
        assert_eq!(repo.current().await.unwrap(), Some(open));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_started_since_includes_boundary() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());

        let before = Shift::start(t(0) - Duration::microseconds(1));
        let at_boundary = Shift::start(t(0));
        repo.insert(&before).await.unwrap();
        repo.insert(&at_boundary).await.unwrap();

        let shifts = repo.started_since(t(0)).await.unwrap();
        assert_eq!(shifts, vec![at_boundary]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_clear_removes_everything() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());
        repo.insert(&Shift::start(t(0))).await.unwrap();
        repo.insert(&Shift::start(t(10))).await.unwrap();

        assert_eq!(repo.clear().await.unwrap(), 2);
        assert!(repo.all().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reconcile_into_local_store() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());

        let kept = Shift::start(t(0)).end(t(100)).unwrap();
        let stale = Shift::start(t(0));
        let stale = Shift { id: kept.id.clone(), ..stale };
        let fresh = Shift::start(t(300));
        repo.insert(&kept).await.unwrap();

        let report = reconcile(&repo, &[stale, fresh.clone()]).await.unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.discarded, 1);
        assert_eq!(repo.get(&kept.id).await.unwrap(), Some(kept));
        assert_eq!(repo.get(&fresh.id).await.unwrap(), Some(fresh));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_if_newer_is_conditional() {
        let db = setup().await;
        let repo = LibSqlShiftRepository::new(db.connection());

        let shift = Shift::start(t(0));
        assert!(repo.upsert_if_newer(&shift).await.unwrap());
        assert!(!repo.upsert_if_newer(&shift).await.unwrap());

        let newer = shift.end(t(30)).unwrap();
        assert!(repo.upsert_if_newer(&newer).await.unwrap());
        assert!(!repo.upsert_if_newer(&shift).await.unwrap());

        let versions = repo.versions(&[shift.id.clone(), ShiftId::new()]).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[&shift.id], t(30));
    }
}
