//! Harvest, classify, summarize: the steps shared by the CLI and the server.

use crate::aggregate::summarize;
use crate::classifier::{Classifier, label_articles};
use crate::error::HarvestError;
use crate::harvest::{Harvester, HarvestRequest};
use crate::models::{Article, SearchReport, SentimentBreakdown};
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Labeling stage configuration.
#[derive(Clone, Copy)]
pub struct Labeling<'a> {
    pub classifier: Option<&'a dyn Classifier>,
    pub concurrency: usize,
}

impl Labeling<'_> {
    pub async fn apply(&self, articles: Vec<Article>) -> Vec<Article> {
        match self.classifier {
            Some(classifier) => {
                let report = label_articles(classifier, articles, self.concurrency).await;
                if report.failed > 0 {
                    warn!(
                        labeled = report.labeled,
                        failed = report.failed,
                        "Some articles left unlabeled"
                    );
                }
                report.articles
            }
            None => articles,
        }
    }
}

/// Assemble the report for already-labeled articles.
pub fn build_report(
    search_key: &str,
    articles: Vec<Article>,
    pages_fetched: usize,
    stop_reason: &str,
    reference: DateTime<Utc>,
) -> SearchReport {
    let summary = summarize(&articles, reference);
    let breakdown = SentimentBreakdown::from_articles(&summary.today);
    SearchReport {
        search_key: search_key.to_string(),
        generated_at: reference,
        pages_fetched,
        stop_reason: stop_reason.to_string(),
        result: articles,
        days: summary.days,
        today: summary.today,
        breakdown,
    }
}

/// Run one full search. A retrieval failure is returned as-is; callers that
/// want the partial articles take them from the error.
#[instrument(level = "info", skip_all, fields(term = %request.term))]
pub async fn analyze(
    harvester: &Harvester,
    labeling: Labeling<'_>,
    request: &HarvestRequest,
    cancel: &CancellationToken,
) -> Result<SearchReport, HarvestError> {
    let harvest = harvester
        .harvest(&request.term, request.max_results, request.window_days, cancel)
        .await?;
    info!(
        articles = harvest.articles.len(),
        fragments = harvest.stats.fragments,
        unresolvable = harvest.stats.unresolvable,
        outside_window = harvest.stats.outside_window,
        duplicates = harvest.stats.duplicates,
        over_cap = harvest.stats.over_cap,
        "Harvest finished"
    );
    let articles = labeling.apply(harvest.articles).await;
    Ok(build_report(
        &request.term,
        articles,
        harvest.pages_fetched,
        harvest.stop.as_str(),
        harvest.reference,
    ))
}
