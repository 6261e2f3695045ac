//! Dose timings
//!
//! Schedules store timings as plain strings so that unknown values read from
//! the database survive a round trip. Writes are always filtered to the four
//! known timings.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl Timing {
    pub const ALL: [Timing; 4] = [
        Timing::Morning,
        Timing::Afternoon,
        Timing::Evening,
        Timing::Night,
    ];

    /// Exact, case-sensitive match on the stored name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(Timing::Morning),
            "afternoon" => Some(Timing::Afternoon),
            "evening" => Some(Timing::Evening),
            "night" => Some(Timing::Night),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Timing::Morning => "morning",
            Timing::Afternoon => "afternoon",
            Timing::Evening => "evening",
            Timing::Night => "night",
        }
    }

    /// Default reminder time as minutes since local midnight
    pub fn default_minutes(self) -> u32 {
        match self {
            Timing::Morning => 8 * 60,
            Timing::Afternoon => 13 * 60,
            Timing::Evening => 18 * 60,
            Timing::Night => 21 * 60,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Timing::Morning => "Morning",
            Timing::Afternoon => "Afternoon",
            Timing::Evening => "Evening",
            Timing::Night => "Night",
        }
    }

    /// Accent colour used by reminder emails
    pub fn accent_color(self) -> &'static str {
        match self {
            Timing::Morning => "#E8590C",
            Timing::Afternoon => "#D97706",
            Timing::Evening => "#C2410C",
            Timing::Night => "#9A3412",
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keep only known timings, preserving order
pub fn filter_valid_timings<I, S>(timings: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    timings
        .into_iter()
        .filter_map(|t| Timing::parse(t.as_ref()))
        .map(|t| t.as_str().to_string())
        .collect()
}

/// Upper-case the first character and lower-case the rest
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
