//! Account document operations for the repository.

use super::Repository;
use crate::db::document;
use crate::db::{AccountRecord, StoreError};
use crate::domain::{Account, UserId, Version};
use sqlx::Row;

impl Repository {
    /// Fetch the account document for `uid`.
    ///
    /// # Errors
    /// `Unavailable` if the query fails, `Corrupt` if the document cannot be decoded.
    pub async fn fetch_account(&self, uid: &UserId) -> Result<Option<AccountRecord>, StoreError> {
        let row = sqlx::query("SELECT document, version FROM accounts WHERE uid = ?")
            .bind(uid.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row.get("document");
        let version: i64 = row.get("version");
        let decoded = document::decode(&raw).map_err(|reason| StoreError::Corrupt {
            uid: uid.clone(),
            reason,
        })?;

        Ok(Some(AccountRecord {
            account: decoded.account,
            version: Version(version),
            needs_normalization: decoded.needs_normalization,
            needs_opening: decoded.needs_opening,
        }))
    }

    /// Insert a new document at the initial version.
    ///
    /// Returns false if a document already existed (nothing was written).
    pub async fn insert_account_if_absent(
        &self,
        uid: &UserId,
        account: &Account,
    ) -> Result<bool, StoreError> {
        let raw = encode(uid, account)?;
        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO accounts (uid, document, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(uid) DO NOTHING
            "#,
        )
        .bind(uid.as_str())
        .bind(raw)
        .bind(Version::initial().as_i64())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the document if its stored version equals `expected`.
    ///
    /// # Errors
    /// `Conflict` if the version moved on (or the row does not exist).
    pub async fn update_account_if_version(
        &self,
        uid: &UserId,
        account: &Account,
        expected: Version,
    ) -> Result<Version, StoreError> {
        let raw = encode(uid, account)?;

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET document = ?, version = version + 1, updated_at = ?
            WHERE uid = ? AND version = ?
            "#,
        )
        .bind(raw)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(uid.as_str())
        .bind(expected.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict { expected });
        }
        Ok(expected.next())
    }

    /// Number of stored accounts.
    pub async fn count_accounts(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("n"))
    }
}

fn encode(uid: &UserId, account: &Account) -> Result<String, StoreError> {
    document::encode(account).map_err(|reason| StoreError::Corrupt {
        uid: uid.clone(),
        reason,
    })
}
