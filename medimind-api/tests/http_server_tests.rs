//! Service-level endpoints: banner, health, CORS and email diagnostics

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use helpers::*;
use serde_json::json;

#[tokio::test]
async fn test_root_banner() {
    let app = test_app().await;
    let (status, _, body) = send(app.router(), get_request("/", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "MediMind Backend API is running");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["endpoints"]["auth"], "/auth");
    assert_eq!(body["endpoints"]["prescriptions"], "/api");
    assert_eq!(body["endpoints"]["health"], "/health");
}

#[tokio::test]
async fn test_health_reports_database_and_scheduler() {
    let app = test_app().await;
    let (status, _, body) = send(app.router(), get_request("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["scheduler"]["running"], false);
    assert_eq!(body["scheduler"]["jobs"], json!([]));
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn test_health_lists_jobs_while_running() {
    let app = test_app().await;
    app.state.scheduler.start().await;

    let (_, _, body) = send(app.router(), get_request("/health", None)).await;
    assert_eq!(body["scheduler"]["running"], true);

    let ids: Vec<&str> = body["scheduler"]["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"reminder_check"));
    assert!(ids.contains(&"daily_reset"));
    // No keep-alive URL configured
    assert!(!ids.contains(&"keepalive"));

    app.state.scheduler.stop().await;
}

#[tokio::test]
async fn test_cors_preflight_allows_any_origin() {
    let app = test_app().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/auth/login")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let (status, headers, _) = send(app.router(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn test_debug_email_hides_secrets() {
    let mut config = test_config();
    config.email.enabled = true;
    config.email.resend_api_key = Some("re_1234567890abcdef".into());
    let app = test_app_with(Fakes::default(), config).await;

    let (status, _, body) = send(app.router(), get_request("/api/debug-email", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email_enabled"], true);
    assert_eq!(body["transport"], "Resend HTTP API");
    assert_eq!(body["resend_api_key_set"], true);
    assert_eq!(body["resend_api_key_preview"], "re_12345***");
    assert_eq!(body["push_enabled"], true);
    assert!(!body.to_string().contains("abcdef"));
}

#[tokio::test]
async fn test_test_email_requires_enabled_and_key() {
    let app = test_app().await;
    let (_, _, body) = send(app.router(), json_request("POST", "/api/test-email", None, json!({}))).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "EMAIL_ENABLED is false or not set");

    let mut config = test_config();
    config.email.enabled = true;
    let app = test_app_with(Fakes::default(), config).await;
    let (_, _, body) = send(app.router(), json_request("POST", "/api/test-email", None, json!({}))).await;
    assert_eq!(body["error"], "RESEND_API_KEY is not set");
}

#[tokio::test]
async fn test_test_email_sends_sample_reminder() {
    let mut config = test_config();
    config.email.enabled = true;
    config.email.resend_api_key = Some("re_key".into());
    config.email.test_recipient = Some("qa@example.com".into());
    let app = test_app_with(Fakes::default(), config).await;

    let (status, _, body) = send(app.router(), json_request("POST", "/api/test-email", None, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["sent_to"], "qa@***");

    let sent = app.email.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "qa@example.com");
    assert_eq!(sent[0].subject, "MediMind — Morning Reminder: Test Medicine");
}

#[tokio::test]
async fn test_trigger_reminders_returns_immediately() {
    let app = test_app().await;
    let (status, _, body) =
        send(app.router(), json_request("POST", "/api/trigger-reminders", None, json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Reminder check triggered. Check logs for results.");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_app().await;
    let (status, _, _) = send(app.router(), get_request("/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
