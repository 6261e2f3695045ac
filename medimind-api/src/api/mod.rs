//! HTTP API handlers

pub mod auth;
pub mod health;
pub mod notifications;
pub mod prescriptions;
pub mod root;
pub mod schedules;

pub use auth::auth_routes;
pub use health::health_routes;
pub use notifications::notification_routes;
pub use prescriptions::prescription_routes;
pub use root::root_routes;
pub use schedules::schedule_routes;
