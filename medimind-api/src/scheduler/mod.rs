//! Background reminder scheduler
//!
//! Three periodic jobs share one cancellation token:
//! - `reminder_check`: scan schedules and send due reminders
//! - `daily_reset`: clear per-day tracking at local midnight
//! - `keepalive`: ping the public health URL (only when configured)

pub mod due;
pub mod tick;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use medimind_common::config::SchedulerConfig;
use medimind_common::time::{fixed_offset, next_local_midnight};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::services::notifier::Notifier;
pub use tick::{ping_keepalive, run_daily_reset, run_tick, TickReport};

pub const REMINDER_CHECK_JOB: &str = "reminder_check";
pub const DAILY_RESET_JOB: &str = "daily_reset";
pub const KEEPALIVE_JOB: &str = "keepalive";

fn job_name(id: &str) -> &'static str {
    match id {
        REMINDER_CHECK_JOB => "Medication Reminder Check (every 1 min)",
        DAILY_RESET_JOB => "Daily Reminder Tracking Reset",
        _ => "Keep-Alive Ping",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub name: String,
    pub next_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub jobs: Vec<JobStatus>,
}

type NextRuns = Arc<RwLock<BTreeMap<&'static str, DateTime<Utc>>>>;

/// Owns the periodic reminder jobs
#[derive(Clone)]
pub struct ReminderScheduler {
    db: SqlitePool,
    notifier: Notifier,
    config: SchedulerConfig,
    http_client: reqwest::Client,
    cancel: Arc<RwLock<Option<CancellationToken>>>,
    next_runs: NextRuns,
}

impl ReminderScheduler {
    pub fn new(db: SqlitePool, notifier: Notifier, config: SchedulerConfig) -> Self {
        Self {
            db,
            notifier,
            config,
            http_client: reqwest::Client::new(),
            cancel: Arc::new(RwLock::new(None)),
            next_runs: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Spawn the periodic jobs; a second call while running is a no-op
    pub async fn start(&self) {
        let mut cancel = self.cancel.write().await;
        if cancel.is_some() {
            info!("Reminder scheduler already running");
            return;
        }
        let token = CancellationToken::new();

        self.spawn_reminder_check(token.clone()).await;
        self.spawn_daily_reset(token.clone()).await;
        if let Some(url) = self.config.keepalive_url.clone() {
            self.spawn_keepalive(token.clone(), url).await;
        }

        info!(
            interval_secs = self.config.check_interval_secs,
            utc_offset_minutes = self.config.utc_offset_minutes,
            window_minutes = self.config.match_window_minutes,
            "Reminder scheduler started"
        );
        *cancel = Some(token);
    }

    /// Cancel every job
    pub async fn stop(&self) {
        if let Some(token) = self.cancel.write().await.take() {
            token.cancel();
            self.next_runs.write().await.clear();
            info!("Reminder scheduler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.cancel.read().await.is_some()
    }

    pub async fn status(&self) -> SchedulerStatus {
        let running = self.is_running().await;
        let jobs = self
            .next_runs
            .read()
            .await
            .iter()
            .map(|(id, next_run)| JobStatus {
                id: id.to_string(),
                name: job_name(id).to_string(),
                next_run: Some(*next_run),
            })
            .collect();

        SchedulerStatus { running, jobs }
    }

    /// Run one reminder check immediately
    pub async fn run_once(&self) -> medimind_common::Result<TickReport> {
        run_tick(&self.db, &self.notifier, &self.config, Utc::now()).await
    }

    async fn record_next_run(next_runs: &NextRuns, job: &'static str, period: Duration) {
        let next = Utc::now() + ChronoDuration::from_std(period).unwrap_or_else(|_| ChronoDuration::zero());
        next_runs.write().await.insert(job, next);
    }

    async fn spawn_reminder_check(&self, token: CancellationToken) {
        let period = Duration::from_secs(self.config.check_interval_secs.max(1));
        Self::record_next_run(&self.next_runs, REMINDER_CHECK_JOB, period).await;

        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {}
                }
                if let Err(e) = scheduler.run_once().await {
                    error!("Reminder check failed: {}", e);
                }

                // stop() may have cleared the job table while the check ran
                if token.is_cancelled() {
                    break;
                }
                Self::record_next_run(&scheduler.next_runs, REMINDER_CHECK_JOB, period).await;
            }
        });
    }

    async fn spawn_daily_reset(&self, token: CancellationToken) {
        let offset = fixed_offset(self.config.utc_offset_minutes);
        let db = self.db.clone();
        let next_runs = self.next_runs.clone();

        let mut next = next_local_midnight(Utc::now(), offset);
        next_runs.write().await.insert(DAILY_RESET_JOB, next);

        tokio::spawn(async move {
            loop {
                let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }

                if let Err(e) = run_daily_reset(&db).await {
                    error!("Daily reminder reset failed: {}", e);
                }

                next = next_local_midnight(Utc::now(), offset);
                if token.is_cancelled() {
                    break;
                }
                next_runs.write().await.insert(DAILY_RESET_JOB, next);
            }
        });
    }

    async fn spawn_keepalive(&self, token: CancellationToken, url: String) {
        let period = Duration::from_secs(self.config.keepalive_interval_secs.max(1));
        Self::record_next_run(&self.next_runs, KEEPALIVE_JOB, period).await;
        info!(url = %url, "Keep-alive ping enabled");

        let client = self.http_client.clone();
        let next_runs = self.next_runs.clone();
        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {}
                }
                ping_keepalive(&client, &url).await;

                if token.is_cancelled() {
                    break;
                }
                Self::record_next_run(&next_runs, KEEPALIVE_JOB, period).await;
            }
        });
    }
}
