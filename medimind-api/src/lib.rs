//! medimind-api library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::Router;
use chrono::{DateTime, Utc};
use medimind_common::config::ServiceConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{PasswordHasher, SessionStore};
use crate::scheduler::ReminderScheduler;
use crate::services::notifier::Notifier;
use crate::services::Services;

/// Largest accepted request body (prescription photos)
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<ServiceConfig>,
    pub sessions: SessionStore,
    pub passwords: PasswordHasher,
    pub services: Services,
    pub notifier: Notifier,
    pub scheduler: ReminderScheduler,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServiceConfig, services: Services) -> Self {
        let notifier = Notifier::new(db.clone(), services.email.clone(), services.push.clone());
        let scheduler =
            ReminderScheduler::new(db.clone(), notifier.clone(), config.scheduler.clone());

        Self {
            sessions: SessionStore::new(config.auth.session_ttl_seconds),
            passwords: PasswordHasher::new(config.auth.password_rounds),
            config: Arc::new(config),
            db,
            services,
            notifier,
            scheduler,
            startup_time: Utc::now(),
        }
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::root_routes())
        .merge(api::health_routes())
        .nest("/auth", api::auth_routes())
        .nest(
            "/api",
            api::prescription_routes()
                .merge(api::schedule_routes())
                .merge(api::notification_routes()),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
