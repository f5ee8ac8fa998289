//! Relative posted-time resolution.
//!
//! Result pages label listings with how long ago they were posted
//! (`"3 hours ago"`, `"2 days ago"`). This module turns such a label into an
//! absolute instant relative to a caller-supplied reference.

use chrono::{DateTime, Months, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s+(minute|hour|day|week|month|year)s?(?:\s+ago)?\s*$").unwrap()
});

/// Resolve `"<amount> <unit>[s] [ago]"` against `reference`.
///
/// Minutes, hours, days and weeks subtract fixed durations. Months and years
/// subtract calendar months, clamping to the last day of a shorter target
/// month (Mar 31 minus one month is Feb 29 in a leap year).
///
/// Returns `None` for anything else: unknown units, a zero or non-numeric
/// amount, or an instant outside chrono's range.
///
/// # Examples
///
/// ```ignore
/// let reference = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
/// assert_eq!(
///     resolve_relative("1 month", reference),
///     Some(Utc.with_ymd_and_hms(2024, 2, 15, 12, 0, 0).unwrap())
/// );
/// assert_eq!(resolve_relative("3 fortnights", reference), None);
/// ```
pub fn resolve_relative(text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_TIME.captures(text)?;
    let amount: u32 = caps[1].parse().ok()?;
    if amount == 0 {
        return None;
    }

    match caps[2].to_ascii_lowercase().as_str() {
        "minute" => reference.checked_sub_signed(TimeDelta::try_minutes(amount.into())?),
        "hour" => reference.checked_sub_signed(TimeDelta::try_hours(amount.into())?),
        "day" => reference.checked_sub_signed(TimeDelta::try_days(amount.into())?),
        "week" => reference.checked_sub_signed(TimeDelta::try_weeks(amount.into())?),
        "month" => reference.checked_sub_months(Months::new(amount)),
        "year" => reference.checked_sub_months(Months::new(amount.checked_mul(12)?)),
        _ => None,
    }
}
