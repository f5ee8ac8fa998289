//! Runtime configuration.
//!
//! Everything has a working default, so the binary runs without a config
//! file. A YAML file passed with `--config` overrides any subset of fields:
//!
//! ```yaml
//! harvest:
//!   window_days: 3
//!   cap_policy: stop_at_cap
//! classifier:
//!   endpoint: https://api-inference.huggingface.co/models/mrm8488/distilroberta-finetuned-financial-news-sentiment-analysis
//! server:
//!   bind: 0.0.0.0:3001
//!   allowed_origin: https://news-sentiment-analyzer.web.app
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub harvest: HarvestConfig,
    pub classifier: ClassifierConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load from `path`, or return the defaults when no path is given.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let shown = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: shown.clone(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Yaml {
            path: shown.clone(),
            source,
        })?;
        info!(path = %shown, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}

/// Where and how result pages are read.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Search endpoint; the term is appended as `query_param`.
    pub search_url: String,
    pub query_param: String,
    /// Per-request timeout for page fetches.
    pub request_timeout_secs: u64,
    pub selectors: SelectorConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            search_url: "https://news.search.yahoo.com/search".to_string(),
            query_param: "p".to_string(),
            request_timeout_secs: 20,
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors locating each field of a listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub article: String,
    pub headline: String,
    pub posted: String,
    pub snippet: String,
    /// Anchor whose `href` is the story link and whose `title` backs up the headline.
    pub link: String,
    pub next_page: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            article: "div.NewsArticle".to_string(),
            headline: "h4.s-title".to_string(),
            posted: "span.s-time".to_string(),
            snippet: "p.s-desc".to_string(),
            link: "a.thmb".to_string(),
            next_page: "a.next".to_string(),
        }
    }
}

/// Whether reaching the result cap also stops pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapPolicy {
    /// Keep following next-page links after the cap; only admission stops.
    #[default]
    ContinuePaging,
    /// Stop as soon as the cap is reached.
    StopAtCap,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Trailing window, in days, an article must fall inside.
    pub window_days: u32,
    /// Result count used when a request does not name one.
    pub default_max_results: usize,
    /// Upper bound a request may ask for.
    pub max_results_limit: usize,
    /// Pause between consecutive page fetches.
    pub politeness_delay_ms: u64,
    pub cap_policy: CapPolicy,
    /// Hard stop on pages per harvest; unlimited when unset.
    pub max_pages: Option<usize>,
}

impl HarvestConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            default_max_results: 10,
            max_results_limit: 100,
            politeness_delay_ms: 1000,
            cap_policy: CapPolicy::ContinuePaging,
            max_pages: None,
        }
    }
}

/// The external sentiment model. Classification is skipped without an endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub base_delay_ms: u64,
    /// Articles classified at once.
    pub concurrency: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Single origin allowed by CORS; any origin when unset.
    pub allowed_origin: Option<String>,
    /// Harvests running longer than this are cancelled and return what they have.
    pub harvest_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3001".to_string(),
            allowed_origin: None,
            harvest_timeout_secs: 60,
        }
    }
}
