//! Raw fragment to [`Article`] conversion, with the time window applied inline.
//!
//! Resolution and window filtering share one reference instant. Computing
//! the cutoff separately from the posted time would let them drift apart
//! between calls.

use crate::models::{Article, RawFragment};
use crate::time::resolve_relative;
use chrono::{DateTime, Utc};

const ELLIPSIS: &str = "...";
const TIME_SEPARATOR: char = '·';

/// Why a fragment did not become an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The posted-time label was missing or unreadable.
    Unresolvable,
    /// Posted at or before the cutoff.
    OutsideWindow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Accepted(Article),
    Rejected(Rejection),
}

/// Convert `fragment` into an [`Article`] posted strictly after `cutoff`.
pub fn normalize(
    fragment: RawFragment,
    reference: DateTime<Utc>,
    cutoff: DateTime<Utc>,
) -> Normalized {
    let posted = fragment
        .posted
        .as_deref()
        .map(|label| label.replace(TIME_SEPARATOR, ""))
        .unwrap_or_default();

    let Some(posted_at) = resolve_relative(posted.trim(), reference) else {
        return Normalized::Rejected(Rejection::Unresolvable);
    };
    if posted_at <= cutoff {
        return Normalized::Rejected(Rejection::OutsideWindow);
    }

    Normalized::Accepted(Article {
        headline: fragment.headline.unwrap_or_default(),
        posted_at,
        snippet: strip_ellipsis(fragment.snippet.unwrap_or_default()),
        link: fragment.link,
        sentiment: None,
    })
}

/// Remove one trailing `"..."`, leaving any other dots alone.
fn strip_ellipsis(snippet: String) -> String {
    let trimmed = snippet.trim();
    trimmed
        .strip_suffix(ELLIPSIS)
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
    }

    fn week_cutoff() -> DateTime<Utc> {
        reference() - TimeDelta::days(7)
    }

    fn fragment(posted: &str) -> RawFragment {
        RawFragment {
            headline: Some("Tesla shares climb".to_string()),
            posted: Some(posted.to_string()),
            snippet: Some("Shares rose in early trading...".to_string()),
            link: Some("https://example.com/one".to_string()),
        }
    }

    fn accepted(result: Normalized) -> Article {
        match result {
            Normalized::Accepted(article) => article,
            Normalized::Rejected(reason) => panic!("expected article, got {reason:?}"),
        }
    }

    #[test]
    fn test_accepts_recent_fragment() {
        let article = accepted(normalize(fragment("· 3 hours ago"), reference(), week_cutoff()));
        assert_eq!(article.headline, "Tesla shares climb");
        assert_eq!(article.posted_at, Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap());
        assert_eq!(article.snippet, "Shares rose in early trading");
        assert_eq!(article.link.as_deref(), Some("https://example.com/one"));
        assert_eq!(article.sentiment, None);
    }

    #[test]
    fn test_unresolvable_time_is_rejected() {
        assert_eq!(
            normalize(fragment("Mar 14, 2024"), reference(), week_cutoff()),
            Normalized::Rejected(Rejection::Unresolvable)
        );
        let mut missing = fragment("");
        missing.posted = None;
        assert_eq!(
            normalize(missing, reference(), week_cutoff()),
            Normalized::Rejected(Rejection::Unresolvable)
        );
    }

    #[test]
    fn test_older_than_window_is_rejected() {
        assert_eq!(
            normalize(fragment("8 days ago"), reference(), week_cutoff()),
            Normalized::Rejected(Rejection::OutsideWindow)
        );
        assert_eq!(
            normalize(fragment("1 month ago"), reference(), week_cutoff()),
            Normalized::Rejected(Rejection::OutsideWindow)
        );
    }

    #[test]
    fn test_exactly_at_cutoff_is_excluded() {
        assert_eq!(
            normalize(fragment("7 days ago"), reference(), week_cutoff()),
            Normalized::Rejected(Rejection::OutsideWindow)
        );
    }

    #[test]
    fn test_one_microsecond_after_cutoff_is_included() {
        let cutoff = week_cutoff() - TimeDelta::microseconds(1);
        let article = accepted(normalize(fragment("7 days ago"), reference(), cutoff));
        assert_eq!(article.posted_at, week_cutoff());
    }

    #[test]
    fn test_missing_fields_degrade_to_empty() {
        let raw = RawFragment {
            headline: None,
            posted: Some("2 hours ago".to_string()),
            snippet: None,
            link: None,
        };
        let article = accepted(normalize(raw, reference(), week_cutoff()));
        assert_eq!(article.headline, "");
        assert_eq!(article.snippet, "");
        assert_eq!(article.link, None);
    }

    #[test]
    fn test_strip_ellipsis_once() {
        assert_eq!(strip_ellipsis("Shares rose...".to_string()), "Shares rose");
        assert_eq!(strip_ellipsis("Wait for it......".to_string()), "Wait for it...");
        assert_eq!(strip_ellipsis("Mid... sentence".to_string()), "Mid... sentence");
        assert_eq!(strip_ellipsis("No marker".to_string()), "No marker");
        assert_eq!(strip_ellipsis("  padded ...  ".to_string()), "padded");
    }
}
