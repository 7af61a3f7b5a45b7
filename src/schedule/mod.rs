//! Pure calendar math for recurring schedules.
//!
//! Schedules carry a "HH:MM" time and a comma-separated weekday set; these
//! functions turn them into absolute instants in the system's local
//! timezone. Parsing is strict and every failure surfaces as
//! [`MedMinderError::InvalidTimeSpec`] so callers can apply their
//! documented fallback instead of propagating.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Local, LocalResult, NaiveDate, TimeZone, Utc};

use crate::error::{MedMinderError, Result};

/// Reminders fire this many seconds ahead of the scheduled instant.
pub const REMINDER_LEAD_SECS: i64 = 300;

/// A dose only counts as not-taken once it is overdue by this margin.
pub const GRACE_PERIOD_SECS: i64 = 600;

/// Reminders older than this drop out of query views (but are kept on disk).
pub const REMINDER_RETENTION_SECS: i64 = 24 * 60 * 60;

/// Sorts after every real "HH:MM" time; used for medications without a
/// schedule.
pub const NO_SCHEDULE_SORT_KEY: &str = "99:99";

/// Strictly parses a 24-hour "HH:MM" string.
pub fn parse_time(time: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = time.split(':').collect();
    if parts.len() != 2 {
        return Err(MedMinderError::InvalidTimeSpec(format!(
            "invalid time format: {time}"
        )));
    }
    let hour: u32 = parts[0]
        .parse()
        .map_err(|_| MedMinderError::InvalidTimeSpec(format!("invalid time format: {time}")))?;
    let minute: u32 = parts[1]
        .parse()
        .map_err(|_| MedMinderError::InvalidTimeSpec(format!("invalid time format: {time}")))?;
    if hour > 23 || minute > 59 {
        return Err(MedMinderError::InvalidTimeSpec(format!(
            "time out of range: {time}"
        )));
    }
    Ok((hour, minute))
}

/// Strictly parses a "YYYY-MM-DD" string.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = date.split('-').collect();
    if parts.len() != 3 {
        return Err(MedMinderError::InvalidTimeSpec(format!(
            "invalid date format: {date}"
        )));
    }
    let year: i32 = parts[0]
        .parse()
        .map_err(|_| MedMinderError::InvalidTimeSpec(format!("invalid date format: {date}")))?;
    let month: u32 = parts[1]
        .parse()
        .map_err(|_| MedMinderError::InvalidTimeSpec(format!("invalid date format: {date}")))?;
    let day: u32 = parts[2]
        .parse()
        .map_err(|_| MedMinderError::InvalidTimeSpec(format!("invalid date format: {date}")))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| MedMinderError::InvalidTimeSpec(format!("date out of range: {date}")))
}

/// Parses a comma-separated weekday set (1..=7, 1 = Monday). The set must
/// be non-empty and every entry in range.
pub fn parse_days_of_week(days_of_week: &str) -> Result<Vec<u8>> {
    let mut days = Vec::new();
    for part in days_of_week.split(',') {
        let day: u8 = part.trim().parse().map_err(|_| {
            MedMinderError::InvalidTimeSpec(format!("invalid days of week: {days_of_week}"))
        })?;
        if !(1..=7).contains(&day) {
            return Err(MedMinderError::InvalidTimeSpec(format!(
                "day of week out of range: {day}"
            )));
        }
        days.push(day);
    }
    if days.is_empty() {
        return Err(MedMinderError::InvalidTimeSpec(
            "empty days of week".to_string(),
        ));
    }
    Ok(days)
}

/// Resolves one occurrence of a schedule to an absolute instant: combines
/// "HH:MM" and "YYYY-MM-DD" in the local timezone and returns epoch
/// seconds.
pub fn occurrence_epoch(time: &str, date: &str) -> Result<i64> {
    let (hour, minute) = parse_time(time)?;
    let day = parse_date(date)?;
    let naive = day.and_hms_opt(hour, minute, 0).ok_or_else(|| {
        MedMinderError::InvalidTimeSpec(format!("invalid local time: {date} {time}"))
    })?;
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.timestamp()),
        // DST fold: take the earlier wall-clock mapping.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.timestamp()),
        LocalResult::None => Err(MedMinderError::InvalidTimeSpec(format!(
            "nonexistent local time: {date} {time}"
        ))),
    }
}

/// ISO weekday index for a date: 1 = Monday .. 7 = Sunday.
pub fn day_of_week_index(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// The local calendar date containing the given instant.
pub fn local_date_of(epoch_secs: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0)
        .map(|dt| dt.with_timezone(&Local).date_naive())
        .unwrap_or_else(|| Local::now().date_naive())
}

/// Formats a date as "YYYY-MM-DD".
pub fn date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Instant at which a reminder for `scheduled_epoch` should fire: the lead
/// time before the dose, clamped to `now` so a reminder is never created
/// already expired.
pub fn reminder_instant(scheduled_epoch: i64, now: i64) -> i64 {
    let at = scheduled_epoch - REMINDER_LEAD_SECS;
    if at < now {
        now
    } else {
        at
    }
}

pub fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
