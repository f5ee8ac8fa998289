//! Session-scoped duplicate detection.
//!
//! Link URLs are not a usable identity: some listings carry relative or empty
//! hrefs. Headline plus resolved posted time is stable across re-crawls of the
//! same day's results.

use crate::models::Article;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Identity of an article within one harvest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleKey {
    pub headline: String,
    pub posted_at: DateTime<Utc>,
}

impl ArticleKey {
    pub fn of(article: &Article) -> Self {
        Self {
            headline: article.headline.clone(),
            posted_at: article.posted_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Duplicate,
}

/// Keys seen so far in one harvest.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<ArticleKey>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key`, reporting whether it was new.
    pub fn admit(&mut self, key: ArticleKey) -> Admission {
        if self.seen.insert(key) {
            Admission::Accepted
        } else {
            Admission::Duplicate
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
