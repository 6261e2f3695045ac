//! Database initialization
//!
//! Schema creation is idempotent and runs on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// is capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes (safe to call repeatedly)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_users_table(pool).await?;
    create_prescriptions_table(pool).await?;
    create_schedules_table(pool).await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            full_name TEXT NOT NULL DEFAULT '',
            fcm_token TEXT,
            fcm_updated_at TEXT,
            created_at TEXT NOT NULL,
            last_login TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_prescriptions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prescriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            raw_text TEXT NOT NULL,
            structured_data TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_prescriptions_user ON prescriptions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schedules_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedules (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            prescription_id TEXT REFERENCES prescriptions(id) ON DELETE SET NULL,
            medicine_name TEXT NOT NULL,
            dosage TEXT NOT NULL DEFAULT 'N/A',
            frequency TEXT NOT NULL DEFAULT 'N/A',
            timings TEXT NOT NULL DEFAULT '[]',
            custom_times TEXT NOT NULL DEFAULT '{}',
            enabled INTEGER NOT NULL DEFAULT 1,
            reminders_sent_today TEXT NOT NULL DEFAULT '{}',
            last_reminder_sent TEXT,
            last_reminder_timing TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_schedules_user ON schedules(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_schedules_enabled ON schedules(enabled)")
        .execute(pool)
        .await?;

    Ok(())
}
