//! Paginated harvesting of search results.
//!
//! One [`Harvester::harvest`] call is one session:
//!
//! ```text
//! Start -> FetchPage -> ExtractAndFilter -> next link? -> FollowNext -> FetchPage
//!                                              \-> Done
//! ```
//!
//! Pages are processed strictly one after another because the next-page link
//! is only known once the current page is parsed. Every fetch after the first
//! is preceded by the politeness delay. The session (cursor, articles, seen
//! keys) lives on the call's stack, so concurrent harvests share nothing but
//! the immutable [`Harvester`].
//!
//! # Cap policy
//!
//! `max_results` bounds admitted articles, not network effort. Under
//! [`CapPolicy::ContinuePaging`] pagination runs until the source stops
//! offering a next link even after the cap is reached; [`CapPolicy::StopAtCap`]
//! short-circuits instead.

use crate::config::{CapPolicy, HarvestConfig, SourceConfig};
use crate::dedup::{Admission, ArticleKey, Deduplicator};
use crate::error::{ConfigError, HarvestError, InputError};
use crate::models::{Article, RawFragment};
use crate::normalize::{Normalized, Rejection, normalize};
use crate::scrapers::fetch::{Fetcher, browser_headers};
use crate::scrapers::yahoo::PageSelectors;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No further next-page link (or the link led back to a visited page).
    Exhausted,
    /// The cap was reached under [`CapPolicy::StopAtCap`].
    CapReached,
    /// `max_pages` pages were fetched.
    PageLimit,
    /// The caller cancelled; results so far are kept.
    Cancelled,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::Exhausted => "exhausted",
            StopReason::CapReached => "cap_reached",
            StopReason::PageLimit => "page_limit",
            StopReason::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-session fragment accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    pub fragments: usize,
    pub unresolvable: usize,
    pub outside_window: usize,
    pub duplicates: usize,
    /// Fragments seen after the cap was reached and therefore not considered.
    pub over_cap: usize,
}

/// Result of a completed harvest.
#[derive(Debug, Clone)]
pub struct Harvest {
    /// Admitted articles in encounter order.
    pub articles: Vec<Article>,
    pub pages_fetched: usize,
    pub stop: StopReason,
    pub stats: HarvestStats,
    /// Instant relative times were resolved against.
    pub reference: DateTime<Utc>,
}

/// A validated harvest request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub term: String,
    pub max_results: usize,
    pub window_days: u32,
}

impl HarvestRequest {
    /// Check caller input before any network traffic.
    pub fn new(
        term: &str,
        max_results: usize,
        window_days: u32,
        max_results_limit: usize,
    ) -> Result<Self, InputError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(InputError::EmptySearchTerm);
        }
        if max_results == 0 || max_results > max_results_limit {
            return Err(InputError::MaxResultsOutOfRange {
                value: i64::try_from(max_results).unwrap_or(i64::MAX),
                limit: max_results_limit,
            });
        }
        if window_days == 0 {
            return Err(InputError::EmptyWindow);
        }
        Ok(Self {
            term: term.to_string(),
            max_results,
            window_days,
        })
    }
}

/// Mutable state owned by one harvest call.
struct Session {
    url: String,
    articles: Vec<Article>,
    dedup: Deduplicator,
    visited: HashSet<String>,
    max_results: usize,
    pages_fetched: usize,
    stats: HarvestStats,
}

impl Session {
    fn new(url: String, max_results: usize) -> Self {
        let mut visited = HashSet::new();
        visited.insert(url.clone());
        Self {
            url,
            articles: Vec::new(),
            dedup: Deduplicator::new(),
            visited,
            max_results,
            pages_fetched: 0,
            stats: HarvestStats::default(),
        }
    }

    fn cap_reached(&self) -> bool {
        self.articles.len() >= self.max_results
    }

    /// Normalize, window and deduplicate one page's fragments.
    fn absorb(
        &mut self,
        fragments: Vec<RawFragment>,
        reference: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) {
        for fragment in fragments {
            self.stats.fragments += 1;
            if self.cap_reached() {
                self.stats.over_cap += 1;
                continue;
            }
            match normalize(fragment, reference, cutoff) {
                Normalized::Rejected(Rejection::Unresolvable) => self.stats.unresolvable += 1,
                Normalized::Rejected(Rejection::OutsideWindow) => self.stats.outside_window += 1,
                Normalized::Accepted(article) => match self.dedup.admit(ArticleKey::of(&article)) {
                    Admission::Accepted => self.articles.push(article),
                    Admission::Duplicate => self.stats.duplicates += 1,
                },
            }
        }
    }

    fn finish(self, stop: StopReason, reference: DateTime<Utc>) -> Harvest {
        Harvest {
            articles: self.articles,
            pages_fetched: self.pages_fetched,
            stop,
            stats: self.stats,
            reference,
        }
    }
}

/// Drives paginated retrieval for a search term.
pub struct Harvester {
    fetcher: Arc<dyn Fetcher>,
    selectors: PageSelectors,
    search_url: Url,
    query_param: String,
    headers: HeaderMap,
    config: HarvestConfig,
}

impl Harvester {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        source: &SourceConfig,
        config: HarvestConfig,
    ) -> Result<Self, ConfigError> {
        let search_url = Url::parse(&source.search_url).map_err(|source_err| ConfigError::Url {
            url: source.search_url.clone(),
            source: source_err,
        })?;
        Ok(Self {
            fetcher,
            selectors: PageSelectors::compile(&source.selectors)?,
            search_url,
            query_param: source.query_param.clone(),
            headers: browser_headers(),
            config,
        })
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Validate input against this harvester's limits.
    pub fn request(
        &self,
        term: &str,
        max_results: usize,
        window_days: u32,
    ) -> Result<HarvestRequest, InputError> {
        HarvestRequest::new(term, max_results, window_days, self.config.max_results_limit)
    }

    /// First result page URL for `term`, percent-encoded into the query.
    pub fn initial_url(&self, term: &str) -> String {
        let pair = format!("{}={}", self.query_param, urlencoding::encode(term));
        let mut url = self.search_url.clone();
        match self.search_url.query().filter(|q| !q.is_empty()) {
            Some(existing) => url.set_query(Some(&format!("{existing}&{pair}"))),
            None => url.set_query(Some(&pair)),
        }
        url.to_string()
    }

    /// Harvest up to `max_results` articles posted within the last `window_days` days.
    ///
    /// Cancelling `cancel` ends the harvest at the next fetch boundary (or
    /// during the politeness delay) and returns what was admitted so far.
    pub async fn harvest(
        &self,
        term: &str,
        max_results: usize,
        window_days: u32,
        cancel: &CancellationToken,
    ) -> Result<Harvest, HarvestError> {
        let request = self.request(term, max_results, window_days)?;
        self.harvest_at(&request, Utc::now(), cancel).await
    }

    /// Harvest with an explicit reference instant for time resolution.
    #[instrument(level = "info", skip_all, fields(term = %request.term, max_results = request.max_results))]
    pub async fn harvest_at(
        &self,
        request: &HarvestRequest,
        reference: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Harvest, HarvestError> {
        let cutoff = reference
            .checked_sub_signed(TimeDelta::days(request.window_days.into()))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut session = Session::new(self.initial_url(&request.term), request.max_results);
        info!(term = %request.term, %cutoff, "Collecting articles");

        let stop = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.fetcher.fetch(&session.url, &self.headers) => Some(result),
            };
            let body = match fetched {
                None => break StopReason::Cancelled,
                Some(Ok(body)) => body,
                Some(Err(source)) => {
                    warn!(
                        url = %session.url,
                        page = session.pages_fetched + 1,
                        collected = session.articles.len(),
                        error = %source,
                        "Page fetch failed; ending harvest"
                    );
                    return Err(HarvestError::Retrieval {
                        url: session.url,
                        partial: session.articles,
                        pages_fetched: session.pages_fetched,
                        source,
                    });
                }
            };
            session.pages_fetched += 1;

            let page = self.selectors.parse_page(&body);
            let had_room = !session.cap_reached();
            session.absorb(page.fragments, reference, cutoff);
            debug!(
                page = session.pages_fetched,
                collected = session.articles.len(),
                seen_keys = session.dedup.len(),
                "Processed page"
            );
            if had_room && session.cap_reached() {
                info!(cap = request.max_results, policy = ?self.config.cap_policy, "Result cap reached");
            }

            let Some(next) = page.next.and_then(|href| resolve_next(&session.url, &href)) else {
                break StopReason::Exhausted;
            };
            if session.cap_reached() && self.config.cap_policy == CapPolicy::StopAtCap {
                break StopReason::CapReached;
            }
            if self
                .config
                .max_pages
                .is_some_and(|limit| session.pages_fetched >= limit)
            {
                break StopReason::PageLimit;
            }
            if !session.visited.insert(next.clone()) {
                warn!(url = %next, "Next page already visited; ending pagination");
                break StopReason::Exhausted;
            }

            let interrupted = tokio::select! {
                biased;
                _ = cancel.cancelled() => true,
                _ = tokio::time::sleep(self.config.politeness_delay()) => false,
            };
            if interrupted {
                break StopReason::Cancelled;
            }
            session.url = next;
        };

        info!(
            term = %request.term,
            count = session.articles.len(),
            pages = session.pages_fetched,
            %stop,
            "Total articles for term"
        );
        Ok(session.finish(stop, reference))
    }
}

/// Resolve a next-page href against the page it appeared on.
fn resolve_next(current: &str, href: &str) -> Option<String> {
    match Url::parse(current).and_then(|base| base.join(href)) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            warn!(%href, error = %e, "Unusable next-page link");
            None
        }
    }
}
