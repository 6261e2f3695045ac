//! Prescription upload pipeline and listing
//!
//! Upload flow: quality check, OCR, LLM parse, enrichment, then one
//! prescription row plus a schedule per usable medicine.

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::CurrentUser;
use crate::db::{prescriptions, schedules, users, PrescriptionRow};
use crate::models::{filter_valid_timings, Medicine, NewSchedule, Timing};
use crate::services::enrichment::EnrichmentStats;
use crate::services::image_quality::{check_image_quality, QualityMetrics, QualityReport};
use crate::services::ocr_client::OcrError;
use crate::services::parser::parse_prescription;
use crate::{ApiError, ApiResult, AppState};

const PLACEHOLDER_NAMES: [&str; 3] = ["N/A", "Unknown", "Unknown Medicine"];
const RAW_TEXT_PREVIEW_CHARS: usize = 300;

const NO_MEDICINES_MESSAGE: &str = "No medicines detected. This may be due to poor image quality, \
unclear text, or non-standard prescription format. Please try uploading a clearer image or contact support.";

const UPLOAD_SUGGESTIONS: [&str; 4] = [
    "Ensure the image is clear and well-lit",
    "Make sure the prescription text is readable",
    "Try taking the photo straight-on (not at an angle)",
    "Check that medicine names and dosages are visible",
];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub prescription_id: String,
    pub schedule_ids: Vec<String>,
    pub medicines: Vec<Medicine>,
    pub message: String,
    pub schedules_created: usize,
    pub medicines_detected: usize,
    pub enrichment_stats: EnrichmentStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<QualityMetrics>,
}

#[derive(Debug, Serialize)]
pub struct NoMedicinesResponse {
    pub success: bool,
    pub prescription_id: String,
    pub schedule_ids: Vec<String>,
    pub medicines: Vec<Medicine>,
    pub message: String,
    pub raw_text_preview: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_metrics: Option<QualityMetrics>,
}

struct UploadForm {
    filename: String,
    image: Bytes,
    user_id: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut image = None;
    let mut filename = String::from("prescription.jpg");
    let mut user_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                if let Some(name) = field.file_name().filter(|n| !n.is_empty()) {
                    filename = name.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
                image = Some(bytes);
            }
            Some("user_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid user_id field: {}", e)))?;
                user_id = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    let image = image
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    Ok(UploadForm {
        filename,
        image,
        user_id,
    })
}

/// Schedule fields for a parsed medicine; None for placeholder names
pub fn schedule_for_medicine(
    user_id: &str,
    prescription_id: &str,
    medicine: &Medicine,
) -> Option<NewSchedule> {
    let name = medicine.medicine_name.trim();
    if name.is_empty() || PLACEHOLDER_NAMES.contains(&name) {
        return None;
    }

    let mut timings = filter_valid_timings(&medicine.timings);
    if timings.is_empty() {
        timings.push(Timing::Morning.as_str().to_string());
    }

    let or_na = |s: &str| {
        let s = s.trim();
        if s.is_empty() { "N/A".to_string() } else { s.to_string() }
    };

    Some(NewSchedule {
        user_id: user_id.to_string(),
        prescription_id: Some(prescription_id.to_string()),
        medicine_name: name.to_string(),
        dosage: or_na(&medicine.dosage),
        frequency: or_na(&medicine.frequency),
        timings,
    })
}

/// Summary line for a successful upload
pub fn upload_message(medicines: usize, schedules: usize, enriched: usize) -> String {
    let mut message = format!(
        "Prescription uploaded successfully. {} medicine(s) extracted and {} schedule(s) created.",
        medicines, schedules
    );
    if medicines != schedules {
        message.push_str(" Note: Some medicines were skipped (e.g., 'as needed' medications).");
    }
    if enriched > 0 {
        message.push_str(&format!(
            " {} medicine(s) enhanced with AI-powered information.",
            enriched
        ));
    }
    message
}

fn raw_text_preview(text: &str) -> String {
    if text.is_empty() {
        "No text extracted".to_string()
    } else {
        text.chars().take(RAW_TEXT_PREVIEW_CHARS).collect()
    }
}

fn quality_fields(report: &QualityReport) -> (Option<Vec<String>>, Option<QualityMetrics>) {
    let warnings = report.warnings();
    if warnings.is_empty() {
        (None, None)
    } else {
        (Some(warnings), report.metrics.clone())
    }
}

/// POST /api/upload-prescription
pub async fn upload_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> ApiResult<Response> {
    let form = read_upload_form(multipart).await?;
    let user_id = match form.user_id {
        Some(id) => {
            user.ensure_owner(&id)?;
            id
        }
        None => user.user_id.clone(),
    };

    info!(user_id = %user_id, filename = %form.filename, bytes = form.image.len(), "Prescription upload");

    users::find_by_id(&state.db, &user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let image = form.image.clone();
    let quality = tokio::task::spawn_blocking(move || check_image_quality(&image))
        .await
        .map_err(|e| ApiError::Internal(format!("Quality check task failed: {}", e)))?;
    if !quality.passed {
        warn!(user_id = %user_id, "Image quality warning: {}", quality.message);
    }

    let text = state
        .services
        .ocr
        .extract_text(&form.image, &form.filename)
        .await
        .map_err(|e| match e {
            OcrError::NotConfigured => ApiError::Internal(format!("OCR failed: {}", e)),
            other => ApiError::Upstream(format!("OCR failed: {}", other)),
        })?;
    info!(chars = text.chars().count(), "OCR text extracted");

    let parsed = parse_prescription(state.services.llm.as_deref(), &text).await;
    let (medicines, enrichment_stats) = state.services.enricher.enrich(parsed).await;

    let now = Utc::now();
    let prescription_id =
        prescriptions::insert_prescription(&state.db, &user_id, &text, &medicines, now).await?;

    let mut schedule_ids = Vec::new();
    for medicine in &medicines {
        if let Some(new_schedule) = schedule_for_medicine(&user_id, &prescription_id, medicine) {
            schedule_ids.push(schedules::insert_schedule(&state.db, &new_schedule, now).await?);
        }
    }

    let (quality_warnings, quality_metrics) = quality_fields(&quality);

    if schedule_ids.is_empty() {
        warn!(prescription_id = %prescription_id, "No medicines detected in upload");
        let body = NoMedicinesResponse {
            success: false,
            prescription_id,
            schedule_ids: Vec::new(),
            medicines: Vec::new(),
            message: NO_MEDICINES_MESSAGE.to_string(),
            raw_text_preview: raw_text_preview(&text),
            suggestions: UPLOAD_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            quality_warnings,
            quality_metrics,
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    info!(
        prescription_id = %prescription_id,
        medicines = medicines.len(),
        schedules = schedule_ids.len(),
        "Prescription stored"
    );

    let body = UploadResponse {
        success: true,
        message: upload_message(
            medicines.len(),
            schedule_ids.len(),
            enrichment_stats.enriched_count,
        ),
        prescription_id,
        schedules_created: schedule_ids.len(),
        medicines_detected: medicines.len(),
        schedule_ids,
        medicines,
        enrichment_stats,
        quality_warnings,
        quality_metrics,
    };
    Ok(Json(body).into_response())
}

/// GET /api/user/:user_id/prescriptions
pub async fn list_prescriptions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<PrescriptionRow>>> {
    user.ensure_owner(&user_id)?;
    Ok(Json(prescriptions::list_for_user(&state.db, &user_id).await?))
}

pub fn prescription_routes() -> Router<AppState> {
    Router::new()
        .route("/upload-prescription", post(upload_prescription))
        .route("/user/:user_id/prescriptions", get(list_prescriptions))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(name: &str, timings: &[&str]) -> Medicine {
        Medicine {
            medicine_name: name.into(),
            dosage: "".into(),
            frequency: "twice daily".into(),
            timings: timings.iter().map(|t| t.to_string()).collect(),
            ..Medicine::default()
        }
    }

    #[test]
    fn test_placeholder_names_are_skipped() {
        for name in ["", "  ", "N/A", "Unknown", "Unknown Medicine"] {
            assert!(schedule_for_medicine("u", "p", &medicine(name, &["morning"])).is_none());
        }
    }

    #[test]
    fn test_schedule_defaults() {
        let s = schedule_for_medicine("u", "p", &medicine("Amoxicillin", &["noon", "night"])).unwrap();
        assert_eq!(s.timings, vec!["night"]);
        assert_eq!(s.dosage, "N/A");
        assert_eq!(s.frequency, "twice daily");
        assert_eq!(s.prescription_id.as_deref(), Some("p"));

        let s = schedule_for_medicine("u", "p", &medicine("Amoxicillin", &["whenever"])).unwrap();
        assert_eq!(s.timings, vec!["morning"]);
    }

    #[test]
    fn test_upload_message() {
        assert_eq!(
            upload_message(2, 2, 0),
            "Prescription uploaded successfully. 2 medicine(s) extracted and 2 schedule(s) created."
        );
        let message = upload_message(3, 2, 1);
        assert!(message.contains("Note: Some medicines were skipped"));
        assert!(message.ends_with(" 1 medicine(s) enhanced with AI-powered information."));
    }

    #[test]
    fn test_raw_text_preview() {
        assert_eq!(raw_text_preview(""), "No text extracted");
        let long = "é".repeat(400);
        assert_eq!(raw_text_preview(&long).chars().count(), 300);
    }
}
