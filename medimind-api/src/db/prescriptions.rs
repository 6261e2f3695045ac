//! Prescription persistence

use chrono::{DateTime, Utc};
use medimind_common::db::PrescriptionRow;
use medimind_common::time::to_rfc3339;
use medimind_common::uuid_utils::new_id;
use medimind_common::Result;
use sqlx::SqlitePool;

use crate::models::Medicine;

/// Store OCR text with its parsed medicines; returns the new id
pub async fn insert_prescription(
    pool: &SqlitePool,
    user_id: &str,
    raw_text: &str,
    medicines: &[Medicine],
    now: DateTime<Utc>,
) -> Result<String> {
    let id = new_id();
    let structured = serde_json::to_string(medicines)?;

    sqlx::query(
        r#"
        INSERT INTO prescriptions (id, user_id, raw_text, structured_data, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(raw_text)
    .bind(&structured)
    .bind(to_rfc3339(now))
    .execute(pool)
    .await?;

    Ok(id)
}

/// All prescriptions of a user, oldest first
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<PrescriptionRow>> {
    let rows = sqlx::query("SELECT * FROM prescriptions WHERE user_id = ? ORDER BY created_at, id")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(PrescriptionRow::from_row).collect()
}
