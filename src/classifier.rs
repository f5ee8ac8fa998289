//! Sentiment classification through an external model service.
//!
//! The pipeline only needs `classify(text) -> Sentiment`. This module provides:
//! - [`Classifier`]: The injected capability
//! - [`HttpClassifier`]: Calls a text-classification inference endpoint
//! - [`RetryClassifier`]: Decorator that retries transient failures with backoff
//! - [`label_articles`]: Labels a harvested batch without ever failing it
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! Only errors reporting [`ClassifyError::is_transient`] are retried.

use crate::config::ClassifierConfig;
use crate::error::{ClassifyError, ConfigError};
use crate::models::{Article, Sentiment};
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use rand::{Rng, rng};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Maps text to a sentiment label.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError>;
}

/// One candidate label with its score.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Inference endpoints answer with either a flat or a per-input nested list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// Pick the highest-scoring label from a distribution.
pub fn best_label(scores: &[LabelScore]) -> Result<Sentiment, ClassifyError> {
    let best = scores
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| ClassifyError::UnexpectedResponse("empty label list".to_string()))?;
    Sentiment::from_label(&best.label).ok_or_else(|| ClassifyError::UnknownLabel(best.label.clone()))
}

/// [`Classifier`] backed by an HTTP text-classification endpoint.
///
/// Sends `{"inputs": text}` and reads back `[{label, score}, ...]` (or the
/// same list wrapped in an outer array).
pub struct HttpClassifier {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl fmt::Debug for HttpClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClassifier")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpClassifier {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    #[instrument(level = "debug", skip_all)]
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "inputs": text }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let parsed: InferenceResponse = serde_json::from_str(&body)
            .map_err(|e| ClassifyError::UnexpectedResponse(format!("{e}: {}", truncate_for_log(&body, 300))))?;
        let scores = match parsed {
            InferenceResponse::Nested(mut outer) if !outer.is_empty() => outer.swap_remove(0),
            InferenceResponse::Nested(_) => Vec::new(),
            InferenceResponse::Flat(scores) => scores,
        };
        best_label(&scores)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Classifier`].
pub struct RetryClassifier<C> {
    inner: C,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<C: Classifier> RetryClassifier<C> {
    pub fn new(inner: C, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<C> fmt::Debug for RetryClassifier<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClassifier")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<C: Classifier> Classifier for RetryClassifier<C> {
    #[instrument(level = "debug", skip_all)]
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.classify(text).await {
                Ok(sentiment) => return Ok(sentiment),
                Err(e) => {
                    attempt += 1;
                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "classify() giving up"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(attempt, max = self.max_retries, ?delay, error = %e, "classify() attempt failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Build the configured classifier, if an endpoint is set.
pub fn from_config(config: &ClassifierConfig) -> Result<Option<Arc<dyn Classifier>>, ConfigError> {
    let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.trim().is_empty()) else {
        return Ok(None);
    };
    let http = HttpClassifier::new(
        endpoint,
        config.api_key.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;
    info!(%endpoint, "Sentiment classifier configured");
    Ok(Some(Arc::new(RetryClassifier::new(
        http,
        config.max_retries,
        Duration::from_millis(config.base_delay_ms),
    ))))
}

/// Outcome of labeling a batch.
#[derive(Debug, Clone)]
pub struct LabelReport {
    /// The input articles in their original order.
    pub articles: Vec<Article>,
    pub labeled: usize,
    pub failed: usize,
}

/// Classify every article, `concurrency` at a time.
///
/// A failed classification leaves that article's `sentiment` unset; the batch
/// itself always comes back intact.
#[instrument(level = "info", skip_all, fields(count = articles.len()))]
pub async fn label_articles(
    classifier: &dyn Classifier,
    articles: Vec<Article>,
    concurrency: usize,
) -> LabelReport {
    let t0 = Instant::now();
    let labeled_articles: Vec<Article> = stream::iter(articles)
        .map(|mut article| async move {
            match classifier.classify(&article.classification_text()).await {
                Ok(sentiment) => {
                    debug!(headline = %truncate_for_log(&article.headline, 80), ?sentiment, "Classified article");
                    article.sentiment = Some(sentiment);
                }
                Err(e) => {
                    warn!(headline = %truncate_for_log(&article.headline, 80), error = %e, "Classification failed; leaving article unlabeled");
                }
            }
            article
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let labeled = labeled_articles.iter().filter(|a| a.sentiment.is_some()).count();
    let failed = labeled_articles.len() - labeled;
    info!(
        labeled,
        failed,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Completed sentiment labeling"
    );
    LabelReport {
        articles: labeled_articles,
        labeled,
        failed,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Labels text by keyword; fails on anything containing "boom".
    pub(crate) struct KeywordClassifier;

    #[async_trait]
    impl Classifier for KeywordClassifier {
        async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
            let lower = text.to_lowercase();
            if lower.contains("boom") {
                Err(ClassifyError::Status { status: 400, body: "bad input".into() })
            } else if lower.contains("rall") || lower.contains("beat") {
                Ok(Sentiment::Positive)
            } else if lower.contains("recall") || lower.contains("miss") {
                Ok(Sentiment::Negative)
            } else {
                Ok(Sentiment::Neutral)
            }
        }
    }

    /// Replays a script of results and counts calls.
    struct Scripted {
        script: Mutex<VecDeque<Result<Sentiment, ClassifyError>>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(script: Vec<Result<Sentiment, ClassifyError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Classifier for Scripted {
        async fn classify(&self, _text: &str) -> Result<Sentiment, ClassifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Sentiment::Neutral))
        }
    }

    fn unavailable() -> ClassifyError {
        ClassifyError::Status { status: 503, body: String::new() }
    }

    fn article(headline: &str) -> Article {
        Article {
            headline: headline.to_string(),
            posted_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            snippet: String::new(),
            link: None,
            sentiment: None,
        }
    }

    fn scores(pairs: &[(&str, f64)]) -> Vec<LabelScore> {
        pairs
            .iter()
            .map(|(label, score)| LabelScore { label: label.to_string(), score: *score })
            .collect()
    }

    #[test]
    fn test_best_label_picks_max_score() {
        let dist = scores(&[("neutral", 0.2), ("positive", 0.7), ("negative", 0.1)]);
        assert_eq!(best_label(&dist).unwrap(), Sentiment::Positive);
    }

    #[test]
    fn test_best_label_rejects_empty_and_unknown() {
        assert!(matches!(best_label(&[]), Err(ClassifyError::UnexpectedResponse(_))));
        let dist = scores(&[("LABEL_1", 0.9), ("positive", 0.1)]);
        assert!(matches!(best_label(&dist), Err(ClassifyError::UnknownLabel(l)) if l == "LABEL_1"));
    }

    #[test]
    fn test_inference_response_shapes() {
        let nested: InferenceResponse =
            serde_json::from_str(r#"[[{"label":"negative","score":0.8},{"label":"neutral","score":0.2}]]"#).unwrap();
        assert!(matches!(nested, InferenceResponse::Nested(ref v) if v[0].len() == 2));
        let flat: InferenceResponse =
            serde_json::from_str(r#"[{"label":"neutral","score":0.9}]"#).unwrap();
        assert!(matches!(flat, InferenceResponse::Flat(ref v) if v.len() == 1));
    }

    #[test]
    fn test_from_config_without_endpoint_is_none() {
        assert!(from_config(&ClassifierConfig::default()).unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_failures() {
        let inner = Scripted::new(vec![Err(unavailable()), Err(unavailable()), Ok(Sentiment::Negative)]);
        let retry = RetryClassifier::new(inner, 3, Duration::from_millis(100));
        assert_eq!(retry.classify("text").await.unwrap(), Sentiment::Negative);
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up_after_max_retries() {
        let inner = Scripted::new(vec![Err(unavailable()), Err(unavailable()), Err(unavailable())]);
        let retry = RetryClassifier::new(inner, 2, Duration::from_millis(100));
        assert!(retry.classify("text").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_permanent_failures() {
        let inner = Scripted::new(vec![Err(ClassifyError::UnknownLabel("LABEL_0".into()))]);
        let retry = RetryClassifier::new(inner, 5, Duration::from_millis(100));
        assert!(matches!(retry.classify("text").await, Err(ClassifyError::UnknownLabel(_))));
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_label_articles_keeps_order_and_tolerates_failures() {
        let articles = vec![
            article("Tesla rallies"),
            article("Boom goes the classifier"),
            article("Ford recall widens"),
            article("Markets open"),
        ];
        let report = label_articles(&KeywordClassifier, articles, 2).await;

        let labels: Vec<_> = report.articles.iter().map(|a| a.sentiment).collect();
        assert_eq!(
            labels,
            [Some(Sentiment::Positive), None, Some(Sentiment::Negative), Some(Sentiment::Neutral)]
        );
        assert_eq!(report.articles[1].headline, "Boom goes the classifier");
        assert_eq!(report.labeled, 3);
        assert_eq!(report.failed, 1);
    }
}
