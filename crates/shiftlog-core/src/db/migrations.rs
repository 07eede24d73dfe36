//! Database migrations
//!
//! Both replicas use forward-only migrations tracked in `schema_version`.
//! The local store runs [`LOCAL`]; the remote server supplies its own list.

use crate::error::Result;
use libsql::Connection;

/// One forward-only schema step
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// Schema of the on-device replica
pub const LOCAL: &[Migration] = &[Migration {
    version: 1,
    description: "shifts and account",
    statements: &[
        "CREATE TABLE IF NOT EXISTS shifts (
            id TEXT PRIMARY KEY,
            started_at INTEGER NOT NULL,
            ended_at INTEGER,
            breaks TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_shifts_started ON shifts(started_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_shifts_updated ON shifts(updated_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_shifts_open ON shifts(ended_at) WHERE ended_at IS NULL",
        // Single-row table: the device syncs under at most one account
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            email TEXT NOT NULL,
            synced_at INTEGER
        )",
    ],
}];

/// Run all pending migrations from `migrations`
pub async fn run(conn: &Connection, migrations: &[Migration]) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        (),
    )
    .await?;

    let version = get_version(conn).await?;
    for migration in migrations.iter().filter(|m| m.version > version) {
        apply(conn, migration).await?;
    }

    Ok(())
}

/// Get the current schema version
pub async fn get_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

async fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    conn.execute("BEGIN TRANSACTION", ()).await?;

    for stmt in migration.statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn
        .execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            [i64::from(migration.version)],
        )
        .await
    {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!(
        "Migrated database to version {} ({})",
        migration.version,
        migration.description
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?
                )",
                [name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn, LOCAL).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, 1);
        assert!(table_exists(&conn, "shifts").await);
        assert!(table_exists(&conn, "account").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn, LOCAL).await.unwrap();
        run(&conn, LOCAL).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_migration_rolls_back() {
        const BROKEN: &[Migration] = &[Migration {
            version: 1,
            description: "broken",
            statements: &["CREATE TABLE half_done (id INTEGER)", "NOT VALID SQL"],
        }];

        let conn = setup().await;
        assert!(run(&conn, BROKEN).await.is_err());
        assert_eq!(get_version(&conn).await.unwrap(), 0);
        assert!(!table_exists(&conn, "half_done").await);
    }
}
