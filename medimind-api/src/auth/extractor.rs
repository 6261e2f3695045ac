//! Authenticated-user extractor
//!
//! The session id comes from the `session_id` cookie, falling back to an
//! `Authorization: Bearer <id>` header.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};

use super::sessions::SessionStore;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session_id";

/// User id behind a live session
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub session_id: String,
}

impl CurrentUser {
    /// 403 unless `user_id` is the authenticated user
    pub fn ensure_owner(&self, user_id: &str) -> Result<(), ApiError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Access denied".to_string()))
        }
    }
}

/// Session id from cookie or bearer header
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
        });

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    })
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    SessionStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session_id = session_id_from_headers(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

        let sessions = SessionStore::from_ref(state);
        let user_id = sessions
            .user_for(&session_id)
            .await
            .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))?;

        Ok(CurrentUser {
            user_id,
            session_id,
        })
    }
}
