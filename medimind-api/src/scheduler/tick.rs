//! One pass of the reminder check

use chrono::{DateTime, Utc};
use medimind_common::config::SchedulerConfig;
use medimind_common::db::ScheduleRow;
use medimind_common::time::{fixed_offset, minutes_of_day, start_of_local_day, to_local};
use medimind_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::due::{already_sent_today, is_due, scheduled_minutes};
use crate::db::{schedules, users};
use crate::services::notifier::Notifier;

const KEEPALIVE_TIMEOUT_SECS: u64 = 10;

/// Outcome counts of a tick
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Enabled schedules examined
    pub checked: usize,
    /// Due timings with at least one delivered channel
    pub sent: usize,
    /// Due timings where every channel failed
    pub failed: usize,
    /// Due timings skipped (already sent today, user missing or without email)
    pub skipped: usize,
}

enum Outcome {
    Sent,
    Failed,
    Skipped,
}

/// Check every enabled schedule against `now` and deliver due reminders
pub async fn run_tick(
    pool: &SqlitePool,
    notifier: &Notifier,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> Result<TickReport> {
    let local = to_local(now, fixed_offset(config.utc_offset_minutes));
    let now_minutes = minutes_of_day(&local);
    let day_start = start_of_local_day(&local);

    let enabled = schedules::list_enabled(pool).await?;
    debug!(
        local_time = %local.format("%H:%M"),
        schedules = enabled.len(),
        "Checking medication reminders"
    );

    let mut report = TickReport {
        checked: enabled.len(),
        ..TickReport::default()
    };

    for schedule in &enabled {
        for timing in &schedule.timings {
            let scheduled = scheduled_minutes(schedule, timing);
            if !is_due(now_minutes, scheduled, config.match_window_minutes) {
                continue;
            }

            if already_sent_today(schedule, timing, day_start) {
                debug!(schedule_id = %schedule.id, timing = %timing, "Reminder already sent today");
                report.skipped += 1;
                continue;
            }

            match deliver(pool, notifier, schedule, timing, now).await {
                Ok(Outcome::Sent) => report.sent += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    error!(schedule_id = %schedule.id, timing = %timing, "Reminder check failed: {}", e);
                    report.failed += 1;
                }
            }
        }
    }

    if report.sent + report.failed > 0 {
        info!(
            checked = report.checked,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            "Reminder check complete"
        );
    }

    Ok(report)
}

async fn deliver(
    pool: &SqlitePool,
    notifier: &Notifier,
    schedule: &ScheduleRow,
    timing: &str,
    now: DateTime<Utc>,
) -> Result<Outcome> {
    let Some(user) = users::find_by_id(pool, &schedule.user_id).await? else {
        warn!(schedule_id = %schedule.id, user_id = %schedule.user_id, "Schedule owner not found");
        return Ok(Outcome::Skipped);
    };

    if user.email.is_empty() {
        warn!(user_id = %user.id, "User has no email, skipping reminder");
        return Ok(Outcome::Skipped);
    }

    info!(
        schedule_id = %schedule.id,
        medicine = %schedule.medicine_name,
        timing,
        "Sending reminder"
    );

    let email_sent = notifier
        .send_reminder_email(&user.email, &schedule.medicine_name, &schedule.dosage, timing)
        .await;

    let push_sent = match user.fcm_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            notifier
                .send_reminder_push(&user.id, token, &schedule.medicine_name, &schedule.dosage, timing)
                .await
        }
        None => false,
    };

    if email_sent || push_sent {
        schedules::mark_reminder_sent(pool, &schedule.id, timing, now).await?;
        Ok(Outcome::Sent)
    } else {
        Ok(Outcome::Failed)
    }
}

/// Clear per-day tracking on every schedule
pub async fn run_daily_reset(pool: &SqlitePool) -> Result<u64> {
    let cleared = schedules::reset_daily_tracking(pool).await?;
    info!(schedules = cleared, "Daily reminder tracking reset");
    Ok(cleared)
}

/// GET `<base_url>/health` so hosting platforms keep the instance awake
pub async fn ping_keepalive(client: &reqwest::Client, base_url: &str) -> bool {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    match client
        .get(&url)
        .timeout(Duration::from_secs(KEEPALIVE_TIMEOUT_SECS))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            debug!(url = %url, "Keep-alive ping ok");
            true
        }
        Ok(response) => {
            warn!(url = %url, status = response.status().as_u16(), "Keep-alive ping returned error status");
            false
        }
        Err(e) => {
            warn!(url = %url, "Keep-alive ping failed: {}", e);
            false
        }
    }
}
