//! Schedule write models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields for a schedule created from an uploaded prescription
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub user_id: String,
    pub prescription_id: Option<String>,
    pub medicine_name: String,
    pub dosage: String,
    pub frequency: String,
    pub timings: Vec<String>,
}

/// Validated partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleChanges {
    pub medicine_name: Option<String>,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub timings: Option<Vec<String>>,
    pub custom_times: Option<BTreeMap<String, String>>,
}

impl ScheduleChanges {
    pub fn is_empty(&self) -> bool {
        self.medicine_name.is_none()
            && self.dosage.is_none()
            && self.frequency.is_none()
            && self.timings.is_none()
            && self.custom_times.is_none()
    }
}
