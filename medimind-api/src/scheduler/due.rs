//! Due-time matching for reminder timings

use chrono::{DateTime, Utc};
use medimind_common::db::ScheduleRow;
use medimind_common::time::parse_hh_mm;
use tracing::warn;

use crate::models::Timing;

/// Minutes since local midnight at which `timing` is due for this schedule
///
/// A custom `HH:MM` wins over the timing's default; unknown timings fall
/// back to the morning slot.
pub fn scheduled_minutes(schedule: &ScheduleRow, timing: &str) -> u32 {
    let default = Timing::parse(timing)
        .unwrap_or(Timing::Morning)
        .default_minutes();

    match schedule.custom_times.get(timing) {
        Some(custom) => parse_hh_mm(custom).unwrap_or_else(|| {
            warn!(
                schedule_id = %schedule.id,
                timing,
                custom_time = %custom,
                "Malformed custom time, using default"
            );
            default
        }),
        None => default,
    }
}

/// Whether `now_minutes` lies within `window` minutes of `scheduled` on the same day
pub fn is_due(now_minutes: u32, scheduled: u32, window: u32) -> bool {
    now_minutes.abs_diff(scheduled) <= window
}

/// Whether a reminder for `timing` was already recorded since `day_start`
pub fn already_sent_today(schedule: &ScheduleRow, timing: &str, day_start: DateTime<Utc>) -> bool {
    schedule
        .reminders_sent_today
        .get(timing)
        .is_some_and(|sent| *sent >= day_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn schedule(custom: &[(&str, &str)]) -> ScheduleRow {
        ScheduleRow {
            id: "s1".into(),
            user_id: "u1".into(),
            prescription_id: None,
            medicine_name: "Aspirin".into(),
            dosage: "75mg".into(),
            frequency: "once daily".into(),
            timings: vec!["morning".into()],
            custom_times: custom
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            enabled: true,
            reminders_sent_today: BTreeMap::new(),
            last_reminder_sent: None,
            last_reminder_timing: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_default_times() {
        let s = schedule(&[]);
        assert_eq!(scheduled_minutes(&s, "morning"), 8 * 60);
        assert_eq!(scheduled_minutes(&s, "afternoon"), 13 * 60);
        assert_eq!(scheduled_minutes(&s, "evening"), 18 * 60);
        assert_eq!(scheduled_minutes(&s, "night"), 21 * 60);
        assert_eq!(scheduled_minutes(&s, "bedtime"), 8 * 60);
    }

    #[test]
    fn test_custom_time_overrides_default() {
        let s = schedule(&[("morning", "07:30"), ("night", "25:99")]);
        assert_eq!(scheduled_minutes(&s, "morning"), 7 * 60 + 30);
        assert_eq!(scheduled_minutes(&s, "night"), 21 * 60);
    }

    #[test]
    fn test_due_window() {
        assert!(is_due(480, 480, 2));
        assert!(is_due(478, 480, 2));
        assert!(is_due(482, 480, 2));
        assert!(!is_due(483, 480, 2));
        assert!(!is_due(477, 480, 2));
        // No wrap across midnight
        assert!(!is_due(1439, 0, 2));
    }

    #[test]
    fn test_already_sent_today() {
        let day_start = Utc::now() - Duration::hours(3);
        let mut s = schedule(&[]);
        assert!(!already_sent_today(&s, "morning", day_start));

        s.reminders_sent_today
            .insert("morning".into(), day_start - Duration::minutes(5));
        assert!(!already_sent_today(&s, "morning", day_start));

        s.reminders_sent_today.insert("morning".into(), day_start);
        assert!(already_sent_today(&s, "morning", day_start));
        assert!(!already_sent_today(&s, "night", day_start));
    }
}
