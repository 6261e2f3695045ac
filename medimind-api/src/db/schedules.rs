//! Schedule persistence

use chrono::{DateTime, Utc};
use medimind_common::db::ScheduleRow;
use medimind_common::time::to_rfc3339;
use medimind_common::uuid_utils::new_id;
use medimind_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::{NewSchedule, ScheduleChanges};

/// Insert an enabled schedule; returns the new id
pub async fn insert_schedule(
    pool: &SqlitePool,
    schedule: &NewSchedule,
    now: DateTime<Utc>,
) -> Result<String> {
    let id = new_id();
    let timings = serde_json::to_string(&schedule.timings)?;

    sqlx::query(
        r#"
        INSERT INTO schedules (
            id, user_id, prescription_id, medicine_name, dosage, frequency,
            timings, custom_times, enabled, reminders_sent_today, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, '{}', 1, '{}', ?)
        "#,
    )
    .bind(&id)
    .bind(&schedule.user_id)
    .bind(&schedule.prescription_id)
    .bind(&schedule.medicine_name)
    .bind(&schedule.dosage)
    .bind(&schedule.frequency)
    .bind(&timings)
    .bind(to_rfc3339(now))
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn find_by_id(pool: &SqlitePool, schedule_id: &str) -> Result<Option<ScheduleRow>> {
    let row = sqlx::query("SELECT * FROM schedules WHERE id = ?")
        .bind(schedule_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(ScheduleRow::from_row).transpose()
}

/// All schedules of a user, oldest first
pub async fn list_for_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<ScheduleRow>> {
    let rows = sqlx::query("SELECT * FROM schedules WHERE user_id = ? ORDER BY created_at, id")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    rows.iter().map(ScheduleRow::from_row).collect()
}

/// Every enabled schedule (one scheduler tick)
pub async fn list_enabled(pool: &SqlitePool) -> Result<Vec<ScheduleRow>> {
    let rows = sqlx::query("SELECT * FROM schedules WHERE enabled = 1 ORDER BY created_at, id")
        .fetch_all(pool)
        .await?;

    rows.iter().map(ScheduleRow::from_row).collect()
}

/// Returns false when no schedule matched
pub async fn set_enabled(pool: &SqlitePool, schedule_id: &str, enabled: bool) -> Result<bool> {
    let result = sqlx::query("UPDATE schedules SET enabled = ? WHERE id = ?")
        .bind(enabled)
        .bind(schedule_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns false when no schedule matched
pub async fn delete_schedule(pool: &SqlitePool, schedule_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM schedules WHERE id = ?")
        .bind(schedule_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Apply a validated partial update and return the updated row
///
/// `updated_at` is always set. Returns None when no schedule matched.
pub async fn apply_changes(
    pool: &SqlitePool,
    schedule_id: &str,
    changes: &ScheduleChanges,
    now: DateTime<Utc>,
) -> Result<Option<ScheduleRow>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE schedules SET updated_at = ");
    builder.push_bind(to_rfc3339(now));

    if let Some(name) = &changes.medicine_name {
        builder.push(", medicine_name = ").push_bind(name.clone());
    }
    if let Some(dosage) = &changes.dosage {
        builder.push(", dosage = ").push_bind(dosage.clone());
    }
    if let Some(frequency) = &changes.frequency {
        builder.push(", frequency = ").push_bind(frequency.clone());
    }
    if let Some(timings) = &changes.timings {
        builder.push(", timings = ").push_bind(serde_json::to_string(timings)?);
    }
    if let Some(custom_times) = &changes.custom_times {
        builder
            .push(", custom_times = ")
            .push_bind(serde_json::to_string(custom_times)?);
    }

    builder.push(" WHERE id = ").push_bind(schedule_id.to_string());

    let result = builder.build().execute(pool).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }

    find_by_id(pool, schedule_id).await
}

/// Record a delivered reminder for one timing
pub async fn mark_reminder_sent(
    pool: &SqlitePool,
    schedule_id: &str,
    timing: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let ts = to_rfc3339(now);

    sqlx::query(
        r#"
        UPDATE schedules SET
            reminders_sent_today = json_set(
                CASE WHEN json_valid(reminders_sent_today) THEN reminders_sent_today ELSE '{}' END,
                '$."' || ? || '"',
                ?
            ),
            last_reminder_sent = ?,
            last_reminder_timing = ?
        WHERE id = ?
        "#,
    )
    .bind(timing)
    .bind(&ts)
    .bind(&ts)
    .bind(timing)
    .bind(schedule_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Clear per-timing tracking on every schedule; returns rows changed
pub async fn reset_daily_tracking(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE schedules SET reminders_sent_today = '{}' WHERE reminders_sent_today != '{}'",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
