//! Shared fixtures for medimind-api integration tests
//!
//! Vendor APIs are replaced with in-process fakes; the database is
//! in-memory SQLite.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use medimind_api::services::email::{EmailError, EmailMessage, EmailSender};
use medimind_api::services::enrichment::Enricher;
use medimind_api::services::fcm_client::{PushError, PushMessage, PushSender};
use medimind_api::services::llm_client::{ChatModel, ChatRequest, LlmError};
use medimind_api::services::ocr_client::{OcrEngine, OcrError};
use medimind_api::services::Services;
use medimind_api::AppState;
use medimind_common::config::{CliOverrides, ServiceConfig, TomlConfig};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// OCR returning fixed text, or failing
pub struct FakeOcr {
    pub text: Option<String>,
}

#[async_trait]
impl OcrEngine for FakeOcr {
    async fn extract_text(&self, _image: &[u8], _filename: &str) -> Result<String, OcrError> {
        match &self.text {
            Some(text) if !text.trim().is_empty() => Ok(text.clone()),
            Some(_) => Err(OcrError::EmptyText),
            None => Err(OcrError::Status(503)),
        }
    }
}

/// Chat model answering parse and fill-in prompts with canned JSON
pub struct FakeLlm {
    pub parse_reply: String,
    pub fill_reply: String,
}

#[async_trait]
impl ChatModel for FakeLlm {
    async fn complete_json(&self, request: ChatRequest<'_>) -> Result<String, LlmError> {
        // Parsing asks for 2000 tokens, fill-in for 500
        if request.max_tokens >= 1000 {
            Ok(self.parse_reply.clone())
        } else {
            Ok(self.fill_reply.clone())
        }
    }
}

#[derive(Default)]
pub struct RecordingEmail {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: bool,
}

#[async_trait]
impl EmailSender for RecordingEmail {
    async fn send(&self, message: &EmailMessage) -> Result<String, EmailError> {
        if self.fail {
            return Err(EmailError::Api(500, "boom".into()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(format!("email-{}", self.sent.lock().unwrap().len()))
    }
}

#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<PushMessage>>,
    pub reject_tokens: bool,
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, message: &PushMessage) -> Result<String, PushError> {
        if self.reject_tokens {
            return Err(PushError::InvalidToken);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok("projects/test/messages/1".into())
    }
}

/// Vendor behaviour for one test
pub struct Fakes {
    pub ocr_text: Option<String>,
    pub parse_reply: Option<String>,
    pub fill_reply: String,
    pub email: Arc<RecordingEmail>,
    pub push: Option<Arc<RecordingPush>>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            ocr_text: Some("Rx\nTab Paracetamol 500mg twice daily".into()),
            parse_reply: Some(
                json!({
                    "medicines": [{
                        "medicine_name": "Paracetamol",
                        "dosage": "500mg",
                        "frequency": "twice a day",
                        "timings": ["morning", "night"]
                    }]
                })
                .to_string(),
            ),
            fill_reply: "{}".into(),
            email: Arc::new(RecordingEmail::default()),
            push: Some(Arc::new(RecordingPush::default())),
        }
    }
}

/// Configuration with compiled defaults and cheap password hashing
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::resolve(&CliOverrides::default(), &TomlConfig::default(), |_| None);
    config.auth.password_rounds = 1_000;
    config
}

pub struct TestApp {
    pub state: AppState,
    pub email: Arc<RecordingEmail>,
    pub push: Option<Arc<RecordingPush>>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        medimind_api::build_router(self.state.clone())
    }

    pub fn db(&self) -> &sqlx::SqlitePool {
        &self.state.db
    }
}

pub async fn test_app_with(fakes: Fakes, config: ServiceConfig) -> TestApp {
    let pool = medimind_common::db::init_memory_database()
        .await
        .expect("in-memory database");

    let llm: Option<Arc<dyn ChatModel>> = fakes.parse_reply.map(|parse_reply| {
        Arc::new(FakeLlm {
            parse_reply,
            fill_reply: fakes.fill_reply,
        }) as Arc<dyn ChatModel>
    });

    let services = Services {
        ocr: Arc::new(FakeOcr {
            text: fakes.ocr_text,
        }),
        enricher: Enricher::new(llm.clone(), None),
        llm,
        email: fakes.email.clone(),
        push: fakes
            .push
            .clone()
            .map(|p| p as Arc<dyn PushSender>),
    };

    TestApp {
        state: AppState::new(pool, config, services),
        email: fakes.email,
        push: fakes.push,
    }
}

pub async fn test_app() -> TestApp {
    test_app_with(Fakes::default(), test_config()).await
}

/// Run one request; returns status, headers and the JSON body (Null if empty)
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

pub fn json_request(method: &str, uri: &str, session: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(session) = session {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", session));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, session: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(session) = session {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", session));
    }
    builder.body(Body::empty()).unwrap()
}

/// Sign up a user; returns (user_id, session_id)
pub async fn signup(app: &TestApp, email: &str) -> (String, String) {
    let (status, _, body) = send(
        app.router(),
        json_request(
            "POST",
            "/auth/signup",
            None,
            json!({ "email": email, "password": "s3cret!", "fullName": "Test User" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "signup failed: {}", body);
    (
        body["user_id"].as_str().unwrap().to_string(),
        body["session_id"].as_str().unwrap().to_string(),
    )
}

pub const MULTIPART_BOUNDARY: &str = "medimind-test-boundary";

/// Multipart upload body with a file part and optional user_id field
pub fn upload_request(session: &str, image: &[u8], user_id: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(user_id) = user_id {
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"user_id\"\r\n\r\n{id}\r\n",
                b = MULTIPART_BOUNDARY,
                id = user_id
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"rx.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
            b = MULTIPART_BOUNDARY
        )
        .as_bytes(),
    );
    body.extend_from_slice(image);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload-prescription")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .header(header::AUTHORIZATION, format!("Bearer {}", session))
        .body(Body::from(body))
        .unwrap()
}
