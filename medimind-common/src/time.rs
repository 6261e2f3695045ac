//! Timestamp utilities
//!
//! Reminders run on the users' wall clock, a fixed offset from UTC.
//! Stored timestamps are always UTC RFC 3339.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveTime, Offset, SecondsFormat, TimeZone, Timelike, Utc,
};

/// Format a timestamp for storage
pub fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp; malformed text yields None
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fixed offset for `minutes` east of UTC; out-of-range values fall back to UTC
pub fn fixed_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
}

/// Wall-clock time at `offset` for a UTC instant
pub fn to_local(ts: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    ts.with_timezone(&offset)
}

/// Minutes since local midnight
pub fn minutes_of_day(local: &DateTime<FixedOffset>) -> u32 {
    local.hour() * 60 + local.minute()
}

/// UTC instant at which the local day containing `local` began
pub fn start_of_local_day(local: &DateTime<FixedOffset>) -> DateTime<Utc> {
    let midnight = local.date_naive().and_time(NaiveTime::MIN);
    let offset = *local.offset();
    // A fixed offset maps every local time to exactly one instant
    offset
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| local.with_timezone(&Utc))
}

/// UTC instant of the next local midnight strictly after `ts`
pub fn next_local_midnight(ts: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = to_local(ts, offset);
    start_of_local_day(&local) + Duration::days(1)
}

/// Parse `HH:MM` (00-23, 00-59) into minutes since midnight
pub fn parse_hh_mm(s: &str) -> Option<u32> {
    let (h, m) = s.trim().split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    (h < 24 && m < 60).then_some(h * 60 + m)
}
