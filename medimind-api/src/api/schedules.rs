//! Schedule listing and editing
//!
//! Every mutation loads the schedule first: unknown ids are 404 and
//! schedules of other users are 403.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use medimind_common::time::parse_hh_mm;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::auth::CurrentUser;
use crate::db::{schedules, ScheduleRow};
use crate::models::{filter_valid_timings, ScheduleChanges, Timing};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub schedule_id: String,
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateScheduleRequest {
    pub medicine_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub timings: Option<Vec<String>>,
    pub custom_times: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateScheduleResponse {
    pub success: bool,
    pub message: String,
    pub schedule: ScheduleRow,
}

/// Trim and validate an update request
pub fn validate_update(request: UpdateScheduleRequest) -> ApiResult<ScheduleChanges> {
    let trim = |s: Option<String>| s.map(|v| v.trim().to_string());

    let timings = match request.timings {
        Some(raw) => {
            let cleaned = filter_valid_timings(raw.iter().map(|t| t.trim()));
            if cleaned.is_empty() {
                return Err(ApiError::BadRequest(
                    "At least one valid timing is required (morning, afternoon, evening, night)"
                        .to_string(),
                ));
            }
            Some(cleaned)
        }
        None => None,
    };

    let custom_times = match request.custom_times {
        Some(raw) => {
            let mut cleaned = BTreeMap::new();
            for (timing, time) in raw {
                let timing = timing.trim();
                if Timing::parse(timing).is_none() {
                    return Err(ApiError::BadRequest(format!(
                        "Invalid timing '{}' in custom_times (morning, afternoon, evening, night)",
                        timing
                    )));
                }
                let time = time.trim();
                if parse_hh_mm(time).is_none() {
                    return Err(ApiError::BadRequest(format!(
                        "Invalid time '{}' for {}: expected HH:MM (00:00-23:59)",
                        time, timing
                    )));
                }
                cleaned.insert(timing.to_string(), time.to_string());
            }
            Some(cleaned)
        }
        None => None,
    };

    let changes = ScheduleChanges {
        medicine_name: trim(request.medicine_name),
        dosage: trim(request.dosage),
        frequency: trim(request.frequency),
        timings,
        custom_times,
    };

    if changes.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    Ok(changes)
}

/// Load a schedule the current user owns
async fn owned_schedule(state: &AppState, user: &CurrentUser, schedule_id: &str) -> ApiResult<ScheduleRow> {
    let schedule = schedules::find_by_id(&state.db, schedule_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule not found".to_string()))?;
    user.ensure_owner(&schedule.user_id)?;
    Ok(schedule)
}

/// GET /api/user/:user_id/schedules
pub async fn list_schedules(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<ScheduleRow>>> {
    user.ensure_owner(&user_id)?;
    Ok(Json(schedules::list_for_user(&state.db, &user_id).await?))
}

/// POST /api/toggle-schedule
pub async fn toggle_schedule(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ToggleRequest>,
) -> ApiResult<Json<StatusResponse>> {
    owned_schedule(&state, &user, &payload.schedule_id).await?;

    if !schedules::set_enabled(&state.db, &payload.schedule_id, payload.enabled).await? {
        return Err(ApiError::NotFound("Schedule not found".to_string()));
    }

    let status = if payload.enabled { "enabled" } else { "disabled" };
    info!(schedule_id = %payload.schedule_id, status, "Schedule toggled");

    Ok(Json(StatusResponse {
        success: true,
        message: format!("Schedule {} successfully", status),
    }))
}

/// DELETE /api/schedule/:schedule_id
pub async fn delete_schedule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(schedule_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    owned_schedule(&state, &user, &schedule_id).await?;

    if !schedules::delete_schedule(&state.db, &schedule_id).await? {
        return Err(ApiError::NotFound("Schedule not found".to_string()));
    }
    info!(schedule_id = %schedule_id, "Schedule deleted");

    Ok(Json(StatusResponse {
        success: true,
        message: "Schedule deleted successfully".to_string(),
    }))
}

/// PUT /api/schedule/:schedule_id
pub async fn update_schedule(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(schedule_id): Path<String>,
    Json(payload): Json<UpdateScheduleRequest>,
) -> ApiResult<Json<UpdateScheduleResponse>> {
    let changes = validate_update(payload)?;
    owned_schedule(&state, &user, &schedule_id).await?;

    let schedule = schedules::apply_changes(&state.db, &schedule_id, &changes, Utc::now())
        .await?
        .ok_or_else(|| ApiError::NotFound("Schedule not found".to_string()))?;
    info!(schedule_id = %schedule_id, "Schedule updated");

    Ok(Json(UpdateScheduleResponse {
        success: true,
        message: "Schedule updated successfully".to_string(),
        schedule,
    }))
}

pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/user/:user_id/schedules", get(list_schedules))
        .route("/toggle-schedule", post(toggle_schedule))
        .route(
            "/schedule/:schedule_id",
            axum::routing::put(update_schedule).delete(delete_schedule),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_rejected() {
        let err = validate_update(UpdateScheduleRequest::default()).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "No fields to update"));
    }

    #[test]
    fn test_timings_filtered() {
        let changes = validate_update(UpdateScheduleRequest {
            timings: Some(vec!["night".into(), "noon".into(), " morning ".into()]),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.timings, Some(vec!["night".to_string(), "morning".to_string()]));

        let err = validate_update(UpdateScheduleRequest {
            timings: Some(vec!["noon".into()]),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m.starts_with("At least one valid timing")));
    }

    #[test]
    fn test_strings_trimmed() {
        let changes = validate_update(UpdateScheduleRequest {
            dosage: Some("  250 mg ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.dosage.as_deref(), Some("250 mg"));
        assert!(changes.medicine_name.is_none());
    }

    #[test]
    fn test_custom_times_validation() {
        let mut times = BTreeMap::new();
        times.insert("morning".to_string(), "07:15".to_string());
        let changes = validate_update(UpdateScheduleRequest {
            custom_times: Some(times),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.custom_times.unwrap()["morning"], "07:15");

        for (timing, time) in [("morning", "7:15"), ("morning", "24:00"), ("lunch", "12:00")] {
            let mut times = BTreeMap::new();
            times.insert(timing.to_string(), time.to_string());
            let result = validate_update(UpdateScheduleRequest {
                custom_times: Some(times),
                ..Default::default()
            });
            assert!(matches!(result, Err(ApiError::BadRequest(_))), "{} {}", timing, time);
        }
    }
}
