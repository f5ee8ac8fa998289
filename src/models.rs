//! Data models for harvested articles and their sentiment summaries.
//!
//! This module defines the records that flow through the pipeline:
//! - [`RawFragment`]: Fields pulled out of one article listing on a result page
//! - [`Article`]: A normalized, windowed, deduplicated news item
//! - [`Sentiment`]: The label attached by the classification stage
//! - [`DaySentimentBucket`]: One point of the daily net-sentiment series
//! - [`SearchReport`]: Everything a single search produces, as written by the CLI
//!
//! Records that leave the process use camelCase field names so the dashboard
//! can consume them without remapping.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One article listing as extracted from a result page, before normalization.
///
/// Every field is optional: a listing without a title node, a time label or a
/// link is still a listing, and the normalizer decides what absence means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFragment {
    /// Text of the headline node.
    pub headline: Option<String>,
    /// Relative posted time as displayed, e.g. `"· 3 hours ago"`.
    pub posted: Option<String>,
    /// Teaser text shown under the headline.
    pub snippet: Option<String>,
    /// Target of the "read more" link.
    pub link: Option<String>,
}

/// Sentiment label produced by the classification stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    /// Contribution of one article to its day's net score.
    pub fn weight(self) -> i64 {
        match self {
            Sentiment::Positive => 1,
            Sentiment::Negative => -1,
            Sentiment::Neutral => 0,
        }
    }

    /// Parse a classifier label, ignoring case and surrounding whitespace.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            _ => None,
        }
    }
}

/// A harvested news item.
///
/// `sentiment` stays `None` until the classification stage labels it; a
/// failed classification leaves it unset rather than guessing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Headline text; empty when the listing had no title.
    pub headline: String,
    /// Absolute posted time resolved from the listing's relative label.
    pub posted_at: DateTime<Utc>,
    /// Teaser text with the trailing ellipsis removed.
    pub snippet: String,
    /// Link to the full story, when the listing had one.
    pub link: Option<String>,
    /// Label attached by the classifier.
    pub sentiment: Option<Sentiment>,
}

impl Article {
    /// Text handed to the classifier: headline and snippet joined as a sentence.
    pub fn classification_text(&self) -> String {
        let headline = self.headline.trim();
        let snippet = self.snippet.trim();
        if headline.is_empty() {
            return snippet.to_string();
        }
        if snippet.is_empty() {
            return headline.to_string();
        }
        let separator = if headline.ends_with(['.', '?', '!']) {
            " "
        } else {
            ". "
        };
        format!("{headline}{separator}{snippet}")
    }
}

/// Net sentiment for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySentimentBucket {
    /// UTC calendar date.
    pub date: NaiveDate,
    /// Sum of article weights posted on `date`.
    pub net_score: i64,
}

/// Counts of each label among a set of articles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub unlabeled: usize,
}

/// The complete output of one CLI search.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub search_key: String,
    pub generated_at: DateTime<Utc>,
    pub pages_fetched: usize,
    /// Why pagination ended, or `"failed"` when a page fetch broke the run.
    pub stop_reason: String,
    pub result: Vec<Article>,
    pub days: Vec<DaySentimentBucket>,
    pub today: Vec<Article>,
    pub breakdown: SentimentBreakdown,
}
