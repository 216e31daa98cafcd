//! Database migrations and initialization.

use super::document;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info, warn};

/// Initialize the SQLite database with schema, pragmas and data migrations.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas_conn(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;
    normalize_legacy_documents(&pool).await?;

    info!("Database initialized successfully at {}", db_path);
    Ok(pool)
}

/// Run all schema migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");
    let schema_sql = include_str!("schema.sql");

    for statement in schema_sql.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }

    info!("Migrations completed successfully");
    Ok(())
}

/// Rewrite account documents stored in a legacy shape into canonical form.
///
/// Trades stamped with `time` become `timestamp`, and a missing watchlist is
/// materialized. Each rewrite is conditional on the version read, so a
/// concurrent writer wins and its (canonical) document is left alone.
/// Unreadable documents are logged and skipped. Documents with no balance are
/// left for the services to open at the configured starting balance.
pub async fn normalize_legacy_documents(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let rows = sqlx::query("SELECT uid, document, version FROM accounts")
        .fetch_all(pool)
        .await?;

    let mut rewritten = 0usize;
    for row in rows {
        let uid: String = row.get("uid");
        let raw: String = row.get("document");
        let version: i64 = row.get("version");

        let decoded = match document::decode(&raw) {
            Ok(d) => d,
            Err(e) => {
                warn!(uid = %uid, error = %e, "Skipping unreadable account document");
                continue;
            }
        };
        if decoded.needs_opening {
            debug!(uid = %uid, "Leaving unopened account for first access");
            continue;
        }
        if !decoded.needs_normalization {
            continue;
        }
        let canonical = match document::encode(&decoded.account) {
            Ok(s) => s,
            Err(e) => {
                warn!(uid = %uid, error = %e, "Failed to re-encode account document");
                continue;
            }
        };

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET document = ?, version = version + 1, updated_at = ?
            WHERE uid = ? AND version = ?
            "#,
        )
        .bind(canonical)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(&uid)
        .bind(version)
        .execute(pool)
        .await?;

        rewritten += result.rows_affected() as usize;
    }

    if rewritten > 0 {
        info!(rewritten, "Normalized legacy account documents");
    }
    Ok(rewritten)
}

/// Configure SQLite pragmas for durability under concurrent access.
async fn configure_pragmas_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode returns the actual mode set; must use fetch to get result
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    info!("SQLite journal_mode set to: {}", journal_mode);

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    Ok(())
}
