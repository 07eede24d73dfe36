//! Server-of-record shift storage, partitioned by account email.

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use libsql::{Connection, Value};
use shiftlog_core::db::migrations::Migration;
use shiftlog_core::db::rows::{
    parse_shift_id, placeholders, shift_from_row, shift_values, SHIFT_COLUMNS,
};
use shiftlog_core::db::Database;
use shiftlog_core::models::{normalize_email, Shift, ShiftId};
use shiftlog_core::reconcile::{reconcile, ReconcileReport, ShiftReceiver, VersionSnapshot};
use shiftlog_core::sync::{ListMeta, ListRequest, ListResponse};
use shiftlog_core::util::{from_storage_micros, to_storage_micros};
use shiftlog_core::Result;
use tokio::sync::Mutex;

const ID_CHUNK: usize = 500;

/// Schema of the remote replica
pub const REMOTE: &[Migration] = &[Migration {
    version: 1,
    description: "accounts and account-scoped shifts",
    statements: &[
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            created_at INTEGER NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS shifts (
            account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            id TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            breaks TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (account_id, id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_shifts_account_started
            ON shifts(account_id, started_at, id)",
        "CREATE INDEX IF NOT EXISTS idx_shifts_account_updated
            ON shifts(account_id, updated_at, id)",
    ],
}];

/// Shared handle to the remote database
#[derive(Clone)]
pub struct RemoteStore {
    db: Arc<Mutex<Database>>,
}

impl RemoteStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open_with_schema(path, REMOTE).await?;
        Ok(Self::from_database(db))
    }

    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory_with_schema(REMOTE).await?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Reconcile a pushed batch into the account's shifts.
    pub async fn push(&self, email: &str, shifts: &[Shift]) -> Result<ReconcileReport> {
        let email = normalize_email(email)?;
        let db = self.db.lock().await;
        let conn = db.connection();
        let account_id = upsert_account(conn, &email).await?;

        reconcile(&AccountShifts { conn, account_id }, shifts).await
    }

    /// One page of the account's shifts.
    pub async fn list(&self, request: &ListRequest) -> Result<ListResponse> {
        let email = normalize_email(&request.email)?;
        let limit = request.effective_limit()?;
        let db = self.db.lock().await;
        let conn = db.connection();
        let account_id = upsert_account(conn, &email).await?;
        let shifts = AccountShifts { conn, account_id };

        let total_items = shifts.count().await?;
        let page = shifts.page(request, limit).await?;

        let mut items = page;
        let next_cursor = if items.len() > limit as usize {
            items.pop().map(|shift| shift.id.clone())
        } else {
            None
        };

        Ok(ListResponse {
            items,
            meta: ListMeta {
                next_cursor,
                limit,
                total_items,
            },
        })
    }

    /// Delete every shift of the account; returns how many were removed.
    pub async fn delete_all(&self, email: &str) -> Result<u64> {
        let email = normalize_email(email)?;
        let db = self.db.lock().await;
        let conn = db.connection();

        let Some(account_id) = find_account(conn, &email).await? else {
            return Ok(0);
        };
        let deleted = conn
            .execute(
                "DELETE FROM shifts WHERE account_id = ?",
                vec![Value::Integer(account_id)],
            )
            .await?;
        Ok(deleted)
    }
}

async fn find_account(conn: &Connection, email: &str) -> Result<Option<i64>> {
    let mut rows = conn
        .query("SELECT id FROM accounts WHERE email = ?", [email])
        .await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row.get(0)?)),
        None => Ok(None),
    }
}

async fn upsert_account(conn: &Connection, email: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO accounts (email, created_at) VALUES (?, ?)
         ON CONFLICT(email) DO NOTHING",
        vec![
            Value::Text(email.to_string()),
            Value::Integer(to_storage_micros(Utc::now())),
        ],
    )
    .await?;

    find_account(conn, email).await?.ok_or_else(|| {
        shiftlog_core::Error::Database(format!("account row missing after upsert: {email}"))
    })
}

/// The shifts of one account, seen as a reconciliation receiver
struct AccountShifts<'a> {
    conn: &'a Connection,
    account_id: i64,
}

impl AccountShifts<'_> {
    async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM shifts WHERE account_id = ?",
                vec![Value::Integer(self.account_id)],
            )
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Sort key of `id` in `column`, if the account has that shift
    async fn sort_key(&self, column: &str, id: &ShiftId) -> Result<Option<i64>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {column} FROM shifts WHERE account_id = ? AND id = ?"),
                vec![Value::Integer(self.account_id), Value::Text(id.to_string())],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Up to `limit + 1` shifts starting at the cursor (inclusive)
    async fn page(&self, request: &ListRequest, limit: u32) -> Result<Vec<Shift>> {
        let order = request.order_by;
        let column = order.column();
        let (direction, cmp, tie) = if order.is_descending() {
            ("DESC", "<", "<=")
        } else {
            ("ASC", ">", ">=")
        };

        let mut params = vec![Value::Integer(self.account_id)];
        let mut keyset = String::new();
        if let Some(cursor) = &request.cursor {
            let Some(key) = self.sort_key(column, cursor).await? else {
                return Ok(Vec::new());
            };
            keyset = format!(" AND ({column} {cmp} ? OR ({column} = ? AND id {tie} ?))");
            params.extend([
                Value::Integer(key),
                Value::Integer(key),
                Value::Text(cursor.to_string()),
            ]);
        }
        params.push(Value::Integer(i64::from(limit) + 1));

        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SHIFT_COLUMNS} FROM shifts
                     WHERE account_id = ?{keyset}
                     ORDER BY {column} {direction}, id {direction}
                     LIMIT ?"
                ),
                params,
            )
            .await?;

        let mut shifts = Vec::new();
        while let Some(row) = rows.next().await? {
            shifts.push(shift_from_row(&row, 0)?);
        }
        Ok(shifts)
    }
}

impl ShiftReceiver for AccountShifts<'_> {
    async fn versions(&self, ids: &[ShiftId]) -> Result<VersionSnapshot> {
        let mut snapshot = VersionSnapshot::new();
        for chunk in ids.chunks(ID_CHUNK) {
            let mut params = vec![Value::Integer(self.account_id)];
            params.extend(chunk.iter().map(|id| Value::Text(id.to_string())));

            let mut rows = self
                .conn
                .query(
                    &format!(
                        "SELECT id, updated_at FROM shifts
                         WHERE account_id = ? AND id IN ({})",
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
        let mut params = vec![Value::Integer(self.account_id)];
        params.extend(shift_values(shift)?);

        let rows = self
            .conn
            .execute(
                &format!(
                    "INSERT INTO shifts (account_id, {SHIFT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?)
                     ON CONFLICT(account_id, id) DO UPDATE SET
                         started_at = excluded.started_at,
                         ended_at = excluded.ended_at,
                         breaks = excluded.breaks,
                         updated_at = excluded.updated_at
                     WHERE excluded.updated_at > shifts.updated_at"
                ),
                params,
            )
            .await?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use shiftlog_core::sync::ShiftOrder;

    const EMAIL: &str = "worker@example.com";

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 7, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    async fn collect_pages(store: &RemoteStore, mut request: ListRequest) -> Vec<ShiftId> {
        let mut ids = Vec::new();
        loop {
            let response = store.list(&request).await.unwrap();
            ids.extend(response.items.iter().map(|shift| shift.id.clone()));
            match response.meta.next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => return ids,
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn push_applies_last_writer_wins() {
        let store = RemoteStore::open_in_memory().await.unwrap();
        let open = Shift::start(t(0));
        let ended = open.end(t(60)).unwrap();

        let report = store.push(EMAIL, std::slice::from_ref(&open)).await.unwrap();
        assert_eq!(report.inserted, 1);

        let report = store.push(EMAIL, &[ended.clone()]).await.unwrap();
        assert_eq!(report.updated, 1);

        let report = store.push(EMAIL, &[open]).await.unwrap();
        assert_eq!(report.discarded, 1);

        let page = store.list(&ListRequest::first_page(EMAIL)).await.unwrap();
        assert_eq!(page.items, vec![ended]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn same_id_is_scoped_per_account() {
        let store = RemoteStore::open_in_memory().await.unwrap();
        let shift = Shift::start(t(0));
        store.push(EMAIL, std::slice::from_ref(&shift)).await.unwrap();

        let report = store
            .push("other@example.com", std::slice::from_ref(&shift))
            .await
            .unwrap();
        assert_eq!(report.inserted, 1);

        assert_eq!(store.delete_all("other@example.com").await.unwrap(), 1);
        let page = store.list(&ListRequest::first_page(EMAIL)).await.unwrap();
        assert_eq!(page.meta.total_items, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn paging_visits_every_shift_once_in_each_order() {
        let store = RemoteStore::open_in_memory().await.unwrap();
        // two shifts share a start time to exercise the id tie-break
        let mut shifts = (0..6).map(|i| Shift::start(t(i * 30))).collect::<Vec<_>>();
        shifts.push(Shift::start(t(60)));
        store.push(EMAIL, &shifts).await.unwrap();

        for order in [
            ShiftOrder::StartedAtDesc,
            ShiftOrder::StartedAtAsc,
            ShiftOrder::UpdatedAtDesc,
            ShiftOrder::UpdatedAtAsc,
        ] {
            let mut request = ListRequest::first_page(EMAIL);
            request.order_by = order;
            request.limit = Some(2);

            let mut expected = shifts.clone();
            expected.sort_by(|a, b| order.compare(a, b));
            let expected = expected.iter().map(|shift| shift.id.clone()).collect::<Vec<_>>();

            assert_eq!(collect_pages(&store, request).await, expected, "{order:?}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_meta_reports_totals() {
        let store = RemoteStore::open_in_memory().await.unwrap();
        let shifts = (0..3).map(|i| Shift::start(t(i))).collect::<Vec<_>>();
        store.push(EMAIL, &shifts).await.unwrap();

        let mut request = ListRequest::first_page(EMAIL);
        request.limit = Some(2);
        let page = store.list(&request).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.meta.limit, 2);
        assert_eq!(page.meta.total_items, 3);
        assert_eq!(page.meta.next_cursor, Some(shifts[0].id.clone()));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn list_for_new_account_is_empty() {
        let store = RemoteStore::open_in_memory().await.unwrap();
        let page = store.list(&ListRequest::first_page(EMAIL)).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.meta.next_cursor, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_unknown_account_removes_nothing() {
        let store = RemoteStore::open_in_memory().await.unwrap();
        assert_eq!(store.delete_all(EMAIL).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_email_is_a_validation_error() {
        let store = RemoteStore::open_in_memory().await.unwrap();
        assert!(matches!(
            store.push("nope", &[]).await,
            Err(shiftlog_core::Error::Validation(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_database_persists_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("remote.db");
        let shift = Shift::start(t(0));

        {
            let store = RemoteStore::open(&path).await.unwrap();
            store.push(EMAIL, std::slice::from_ref(&shift)).await.unwrap();
        }

        let store = RemoteStore::open(&path).await.unwrap();
        let page = store.list(&ListRequest::first_page(EMAIL)).await.unwrap();
        assert_eq!(page.items, vec![shift]);
    }
}
