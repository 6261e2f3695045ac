//! Database models
//!
//! Nested document fields are stored as JSON text and decoded on read.
//! A malformed JSON column decodes to its empty value with a warning rather
//! than failing the whole row.

use crate::time::parse_rfc3339;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub fcm_token: Option<String>,
    pub fcm_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            fcm_token: row.try_get("fcm_token")?,
            fcm_updated_at: optional_timestamp(row, "fcm_updated_at")?,
            created_at: required_timestamp(row, "created_at")?,
            last_login: optional_timestamp(row, "last_login")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescriptionRow {
    pub id: String,
    pub user_id: String,
    pub raw_text: String,
    /// Medicines extracted from the text (JSON array)
    pub structured_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PrescriptionRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        Ok(Self {
            structured_data: json_column(row, "structured_data", &id)?,
            user_id: row.try_get("user_id")?,
            raw_text: row.try_get("raw_text")?,
            created_at: required_timestamp(row, "created_at")?,
            id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub id: String,
    pub user_id: String,
    pub prescription_id: Option<String>,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub timings: Vec<String>,
    /// Per-timing `HH:MM` override
    pub custom_times: BTreeMap<String, String>,
    pub enabled: bool,
    /// Per-timing instant of the last reminder sent
    pub reminders_sent_today: BTreeMap<String, DateTime<Utc>>,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub last_reminder_timing: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScheduleRow {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        Ok(Self {
            user_id: row.try_get("user_id")?,
            prescription_id: row.try_get("prescription_id")?,
            medicine_name: row.try_get("medicine_name")?,
            dosage: row.try_get("dosage")?,
            frequency: row.try_get("frequency")?,
            timings: json_column(row, "timings", &id)?,
            custom_times: json_column(row, "custom_times", &id)?,
            enabled: row.try_get::<i64, _>("enabled")? != 0,
            reminders_sent_today: json_column(row, "reminders_sent_today", &id)?,
            last_reminder_sent: optional_timestamp(row, "last_reminder_sent")?,
            last_reminder_timing: row.try_get("last_reminder_timing")?,
            created_at: required_timestamp(row, "created_at")?,
            updated_at: optional_timestamp(row, "updated_at")?,
            id,
        })
    }
}

fn json_column<T>(row: &SqliteRow, column: &str, id: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let raw: Option<String> = row.try_get(column)?;
    let Some(raw) = raw else {
        return Ok(T::default());
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            warn!(row_id = %id, column, "Malformed JSON column ({}), using empty value", e);
            Ok(T::default())
        }
    }
}

fn required_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column)?;
    parse_rfc3339(&raw)
        .ok_or_else(|| Error::Internal(format!("Invalid timestamp in {}: {}", column, raw)))
}

fn optional_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.try_get(column)?;
    Ok(raw.as_deref().and_then(parse_rfc3339))
}
