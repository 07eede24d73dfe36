//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations::{self, Migration};

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open the local shift log at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_schema(path, migrations::LOCAL).await
    }

    /// Open an in-memory local shift log (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_schema(migrations::LOCAL).await
    }

    /// Open a database at `path` and bring it up to `schema`
    pub async fn open_with_schema(path: impl AsRef<Path>, schema: &[Migration]) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        Self::initialize(db, schema).await
    }

    /// Open an in-memory database and bring it up to `schema`
    pub async fn open_in_memory_with_schema(schema: &[Migration]) -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::initialize(db, schema).await
    }

    async fn initialize(db: LibSqlDatabase, schema: &[Migration]) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self { _db: db, conn };
        database.configure().await?;
        migrations::run(&database.conn, schema).await?;
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases; ignore the refusal
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        self.conn.execute("PRAGMA foreign_keys = ON;", ()).await?;
        self.conn
            .execute("PRAGMA cache_size = 10000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        let version = migrations::get_version(db.connection()).await.unwrap();
        assert_eq!(version, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_on_disk_survives_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("shiftlog.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            db.connection()
                .execute(
                    "INSERT INTO account (id, email, synced_at) VALUES (1, 'a@b.co', NULL)",
                    (),
                )
                .await
                .unwrap();
        }

        let db = Database::open(&db_path).await.unwrap();
        let mut rows = db
            .connection()
            .query("SELECT email FROM account", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let email: String = row.get(0).unwrap();
        assert_eq!(email, "a@b.co");
    }
}
