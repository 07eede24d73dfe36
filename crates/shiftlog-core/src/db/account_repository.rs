//! Account repository implementation

use chrono::{DateTime, Utc};
use libsql::{Connection, Value};

use crate::db::rows::optional_micros;
use crate::error::{Error, Result};
use crate::models::Account;
use crate::util::{from_storage_micros, to_storage_micros};

/// Trait for the single local account row (async)
#[allow(async_fn_in_trait)]
pub trait AccountRepository {
    /// Load the account, if one is configured
    async fn load(&self) -> Result<Option<Account>>;

    /// Create the account or change its email.
    ///
    /// `synced_at` survives re-setting the same email and is cleared when the
    /// email changes.
    async fn set_email(&self, email: &str) -> Result<Account>;

    /// Record a successful sync
    async fn mark_synced(&self, at: DateTime<Utc>) -> Result<()>;

    /// Remove the account row
    async fn clear(&self) -> Result<()>;
}

/// libSQL implementation of `AccountRepository`
pub struct LibSqlAccountRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlAccountRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl AccountRepository for LibSqlAccountRepository<'_> {
    async fn load(&self) -> Result<Option<Account>> {
        let mut rows = self
            .conn
            .query("SELECT email, synced_at FROM account WHERE id = 1", ())
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let email: String = row.get(0)?;
        let synced_at = optional_micros(&row, 1)?
            .map(from_storage_micros)
            .transpose()?;
        Ok(Some(Account { email, synced_at }))
    }

    async fn set_email(&self, email: &str) -> Result<Account> {
        let account = Account::new(email)?;
        self.conn
            .execute(
                "INSERT INTO account (id, email, synced_at) VALUES (1, ?, NULL)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    synced_at = CASE WHEN account.email = excluded.email
                                     THEN account.synced_at ELSE NULL END",
                [account.email.as_str()],
            )
            .await?;

        self.load()
            .await?
            .ok_or_else(|| Error::Database("account row missing after write".to_string()))
    }

    async fn mark_synced(&self, at: DateTime<Utc>) -> Result<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE account SET synced_at = ? WHERE id = 1",
                vec![Value::Integer(to_storage_micros(at))],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NoAccount);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.conn.execute("DELETE FROM account", ()).await?;
        Ok(())
    }
}
