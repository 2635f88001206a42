use chrono::{Datelike, Days, Months, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shift a date by a signed number of calendar days.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

pub fn add_weeks(date: NaiveDate, weeks: i64) -> NaiveDate {
    add_days(date, weeks.saturating_mul(7))
}

/// Shift a date by whole months, clamping into the target month: the 31st
/// plus one month lands on the last day of a shorter month, never in the
/// month after it.
pub fn add_months(date: NaiveDate, months: i32) -> NaiveDate {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
            .unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
            .unwrap_or(NaiveDate::MIN)
    }
}

/// Shift a date by whole years. Feb 29 clamps to Feb 28 in non-leap years.
pub fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    add_months(date, years.saturating_mul(12))
}

/// Whole-day difference, positive when `later` is after `earlier`.
pub fn days_between(earlier: NaiveDate, later: NaiveDate) -> i64 {
    later.signed_duration_since(earlier).num_days()
}

/// The Sunday that starts the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    add_days(date, -i64::from(date.weekday().num_days_from_sunday()))
}

/// Weekday index with the persisted convention: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Day,
    Week,
    Month,
}

/// Inclusive day-window a calendar consumer wants occurrences for.
pub fn view_range(anchor: NaiveDate, mode: ViewMode) -> (NaiveDate, NaiveDate) {
    match mode {
        ViewMode::Day => (anchor, anchor),
        ViewMode::Week => {
            let start = week_start(anchor);
            (start, add_days(start, 6))
        }
        ViewMode::Month => {
            let start = anchor.with_day(1).unwrap_or(anchor);
            (start, add_days(add_months(start, 1), -1))
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid clock time `{value}`, expected HH:MM")]
pub struct ClockParseError {
    pub value: String,
}

/// Parse an `HH:MM` clock string. All stored times go through here so a
/// malformed record surfaces as a typed error instead of a panic.
pub fn parse_clock(value: &str) -> Result<NaiveTime, ClockParseError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ClockParseError {
        value: value.to_string(),
    })
}

/// Compact `HHMM` form used inside deterministic instance and dedup ids.
pub fn clock_slot(value: &str) -> String {
    value.trim().replace(':', "")
}
