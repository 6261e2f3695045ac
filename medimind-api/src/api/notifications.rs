//! Operational endpoints for the reminder pipeline

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use medimind_common::config::mask_secret;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::AppState;

/// POST /api/trigger-reminders
///
/// Runs one reminder check in the background and returns immediately.
pub async fn trigger_reminders(State(state): State<AppState>) -> Json<Value> {
    let scheduler = state.scheduler.clone();
    tokio::spawn(async move {
        match scheduler.run_once().await {
            Ok(report) => info!(
                checked = report.checked,
                sent = report.sent,
                failed = report.failed,
                skipped = report.skipped,
                "Manual reminder check finished"
            ),
            Err(e) => error!("Manual reminder check failed: {}", e),
        }
    });

    Json(json!({
        "success": true,
        "message": "Reminder check triggered. Check logs for results.",
    }))
}

/// GET /api/debug-email
pub async fn debug_email(State(state): State<AppState>) -> Json<Value> {
    let email = &state.config.email;
    Json(json!({
        "email_enabled": email.enabled,
        "transport": "Resend HTTP API",
        "resend_api_key_set": email.resend_api_key.is_some(),
        "resend_api_key_preview": mask_secret(email.resend_api_key.as_deref()),
        "email_from": email.from,
        "push_enabled": state.notifier.push_enabled(),
    }))
}

/// Mask a recipient down to its first three characters
fn recipient_preview(address: &str) -> String {
    let prefix: String = address.chars().take(3).collect();
    format!("{}***", prefix)
}

/// POST /api/test-email
pub async fn test_email(State(state): State<AppState>) -> Json<Value> {
    let email = &state.config.email;

    if !email.enabled {
        return Json(json!({ "success": false, "error": "EMAIL_ENABLED is false or not set" }));
    }
    if email.resend_api_key.is_none() {
        return Json(json!({ "success": false, "error": "RESEND_API_KEY is not set" }));
    }
    let Some(recipient) = email.test_recipient.as_deref() else {
        return Json(json!({ "success": false, "error": "TEST_EMAIL_TO is not set" }));
    };

    let sent = state
        .notifier
        .send_reminder_email(recipient, "Test Medicine", "Test Dosage", "morning")
        .await;

    Json(json!({
        "success": sent,
        "sent_to": recipient_preview(recipient),
    }))
}

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/trigger-reminders", post(trigger_reminders))
        .route("/debug-email", get(debug_email))
        .route("/test-email", post(test_email))
}
