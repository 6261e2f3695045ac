//! Account endpoints: signup, login, logout, device token, profile

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{session_id_from_headers, CurrentUser, PasswordHasher, SESSION_COOKIE};
use crate::db::users;
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default, rename = "fullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct FcmTokenRequest {
    pub fcm_token: String,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub email: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user_id: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Trim and lower-case an address; None unless it looks like `local@domain.tld`
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return None;
    }
    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.is_empty() {
        return None;
    }
    Some(email)
}

fn session_cookie(session_id: &str, max_age: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Max-Age={}; Path=/",
        SESSION_COOKIE, session_id, max_age
    )
}

fn display_name(full_name: &str) -> Option<String> {
    (!full_name.is_empty()).then(|| full_name.to_string())
}

async fn hash_blocking(hasher: PasswordHasher, password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hasher.hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

async fn verify_blocking(hasher: PasswordHasher, password: String, stored: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::Internal(format!("Password verification task failed: {}", e)))
}

/// POST /auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email)
        .ok_or_else(|| ApiError::BadRequest("Invalid email address".to_string()))?;
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password is required".to_string()));
    }

    if users::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash_blocking(state.passwords, payload.password).await?;
    let full_name = payload.full_name.unwrap_or_default();
    let user = users::insert_user(&state.db, &email, &password_hash, full_name.trim(), Utc::now())
        .await
        .map_err(|e| match e {
            medimind_common::Error::Database(sqlx::Error::Database(ref db)) if db.is_unique_violation() => {
                ApiError::BadRequest("User already exists".to_string())
            }
            other => other.into(),
        })?;

    let session_id = state.sessions.create(&user.id).await;
    info!(user_id = %user.id, "User signed up");

    let cookie = session_cookie(&session_id, state.sessions.ttl_seconds());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SignupResponse {
            success: true,
            message: "Signup successful".to_string(),
            user_id: user.id,
            email: user.email,
            session_id,
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let email = normalize_email(&payload.email).ok_or_else(invalid)?;
    let user = users::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_blocking(state.passwords, payload.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "Login rejected: bad password");
        return Err(invalid());
    }

    users::touch_last_login(&state.db, &user.id, Utc::now()).await?;
    let session_id = state.sessions.create(&user.id).await;
    info!(user_id = %user.id, "User logged in");

    let cookie = session_cookie(&session_id, state.sessions.ttl_seconds());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            success: true,
            message: "Login successful".to_string(),
            full_name: display_name(&user.full_name),
            user_id: user.id,
            email: user.email,
            session_id,
        }),
    ))
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(session_id) = session_id_from_headers(&headers) {
        state.sessions.delete(&session_id).await;
    }

    (
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(serde_json::json!({ "message": "Logged out", "success": true })),
    )
}

/// POST /auth/fcm-token
pub async fn update_fcm_token(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<FcmTokenRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let token = payload.fcm_token.trim();
    if token.is_empty() {
        return Err(ApiError::BadRequest("fcm_token is required".to_string()));
    }

    if !users::set_fcm_token(&state.db, &user.user_id, token, Utc::now()).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    info!(user_id = %user.user_id, "FCM token updated");

    Ok(Json(serde_json::json!({ "success": true, "message": "FCM token updated" })))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<ProfileResponse>> {
    let row = users::find_by_id(&state.db, &user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        full_name: display_name(&row.full_name),
        user_id: row.id,
        email: row.email,
        created_at: row.created_at,
    }))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/fcm-token", post(update_fcm_token))
        .route("/me", get(me))
}
