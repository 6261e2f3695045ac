//! Upload quality check
//!
//! Runs before OCR and only ever produces warnings. An image that cannot be
//! decoded passes with an explanatory message so OCR still gets a chance.

use image::GenericImageView;
use serde::Serialize;
use tracing::warn;

const MIN_DIMENSION_PX: u32 = 600;
const MIN_FILE_SIZE_BYTES: usize = 50 * 1024;
const MAX_ASPECT_RATIO: f64 = 3.0;
const MIN_ASPECT_RATIO: f64 = 0.3;
const MIN_BRIGHTNESS: f64 = 50.0;
const MAX_BRIGHTNESS: f64 = 220.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub width: u32,
    pub height: u32,
    pub file_size_kb: f64,
    pub aspect_ratio: f64,
    pub brightness: f64,
}

#[derive(Debug, Clone)]
pub struct QualityReport {
    /// False when any warning was raised
    pub passed: bool,
    pub message: String,
    pub metrics: Option<QualityMetrics>,
}

impl QualityReport {
    /// Warnings to surface in the upload response
    pub fn warnings(&self) -> Vec<String> {
        if self.passed {
            Vec::new()
        } else {
            vec![self.message.clone()]
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Inspect an uploaded image
pub fn check_image_quality(bytes: &[u8]) -> QualityReport {
    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            warn!("Quality check could not decode upload: {}", e);
            return QualityReport {
                passed: true,
                message: format!("Quality check failed: {}", e),
                metrics: None,
            };
        }
    };

    let (width, height) = img.dimensions();
    let rgb = img.to_rgb8();
    let raw = rgb.as_raw();
    let brightness = if raw.is_empty() {
        0.0
    } else {
        raw.iter().map(|&b| b as u64).sum::<u64>() as f64 / raw.len() as f64
    };

    let aspect_ratio = if height > 0 {
        width as f64 / height as f64
    } else {
        0.0
    };

    let metrics = QualityMetrics {
        width,
        height,
        file_size_kb: round2(bytes.len() as f64 / 1024.0),
        aspect_ratio: round2(aspect_ratio),
        brightness: round2(brightness),
    };

    let mut warnings = Vec::new();

    if width.min(height) < MIN_DIMENSION_PX {
        warnings.push(format!(
            "Low resolution ({}x{}). Recommended minimum: {}px. OCR accuracy may be affected.",
            width, height, MIN_DIMENSION_PX
        ));
    }

    if bytes.len() < MIN_FILE_SIZE_BYTES {
        warnings.push(format!(
            "Small file size ({}KB). Image may be heavily compressed.",
            metrics.file_size_kb
        ));
    }

    if aspect_ratio > MAX_ASPECT_RATIO || aspect_ratio < MIN_ASPECT_RATIO {
        warnings.push(format!(
            "Unusual aspect ratio ({}). Image may be cropped or distorted.",
            metrics.aspect_ratio
        ));
    }

    if brightness < MIN_BRIGHTNESS {
        warnings.push(format!(
            "Image appears very dark (brightness: {}). Better lighting recommended.",
            metrics.brightness
        ));
    } else if brightness > MAX_BRIGHTNESS {
        warnings.push(format!(
            "Image appears overexposed (brightness: {}). Reduce brightness.",
            metrics.brightness
        ));
    }

    if warnings.is_empty() {
        QualityReport {
            passed: true,
            message: "Image quality acceptable".to_string(),
            metrics: Some(metrics),
        }
    } else {
        QualityReport {
            passed: false,
            message: warnings.join(" "),
            metrics: Some(metrics),
        }
    }
}
