//! JSON HTTP surface.
//!
//! | Route | Method | Response |
//! |-------|--------|----------|
//! | `/analyze-sentiment` | GET, POST | `{result: Article[]}` |
//! | `/sentiment-summary` | GET | `{result, days, today, breakdown}` |
//! | `/health` | GET | `{status: "ok"}` |
//!
//! Both search routes take `searchKey` and an optional `maxArticlesPerSearch`
//! (query string for GET, JSON body for POST). Every failure is a single
//! `{error}` object: 400 for bad input, 500 for a failed harvest.

use crate::classifier::Classifier;
use crate::config::ServerConfig;
use crate::error::{ConfigError, HarvestError, InputError};
use crate::harvest::{HarvestRequest, Harvester};
use crate::models::{Article, SearchReport};
use crate::pipeline::{Labeling, analyze};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Shared, immutable handler state.
#[derive(Clone)]
pub struct AppState {
    pub harvester: Arc<Harvester>,
    pub classifier: Option<Arc<dyn Classifier>>,
    pub label_concurrency: usize,
    pub harvest_timeout: Duration,
}

/// `maxArticlesPerSearch` arrives as a JSON number or as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Count {
    Number(i64),
    Text(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub search_key: Option<String>,
    pub max_articles_per_search: Option<Count>,
}

impl SearchParams {
    fn max_results(&self, default: usize, limit: usize) -> Result<usize, InputError> {
        let value = match &self.max_articles_per_search {
            None => return Ok(default),
            Some(Count::Number(n)) => *n,
            Some(Count::Text(raw)) => raw
                .trim()
                .parse::<i64>()
                .map_err(|_| InputError::MaxResultsNotNumeric { raw: raw.clone() })?,
        };
        usize::try_from(value)
            .ok()
            .filter(|n| (1..=limit).contains(n))
            .ok_or(InputError::MaxResultsOutOfRange { value, limit })
    }

    fn into_request(self, harvester: &Harvester) -> Result<HarvestRequest, InputError> {
        let config = harvester.config();
        let max_results = self.max_results(config.default_max_results, config.max_results_limit)?;
        let term = self.search_key.unwrap_or_default();
        harvester.request(&term, max_results, config.window_days)
    }
}

/// Handler failure mapped to a status code and `{error}` body.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<HarvestError> for ApiError {
    fn from(e: HarvestError) -> Self {
        match e {
            HarvestError::Input(input) => input.into(),
            HarvestError::Retrieval { .. } => {
                error!(error = %e, "Harvest failed");
                ApiError::Internal("failed to retrieve news articles".to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: Vec<Article>,
}

impl AppState {
    async fn run(&self, params: SearchParams) -> Result<SearchReport, ApiError> {
        let request = params.into_request(&self.harvester)?;

        let cancel = CancellationToken::new();
        let timer = tokio::spawn({
            let cancel = cancel.clone();
            let timeout = self.harvest_timeout;
            async move {
                tokio::time::sleep(timeout).await;
                warn!(?timeout, "Harvest deadline reached; returning partial results");
                cancel.cancel();
            }
        });
        let labeling = Labeling {
            classifier: self.classifier.as_deref(),
            concurrency: self.label_concurrency,
        };
        let outcome = analyze(&self.harvester, labeling, &request, &cancel).await;
        timer.abort();

        let report = outcome?;
        info!(
            term = %report.search_key,
            count = report.result.len(),
            stop = %report.stop_reason,
            "Search served"
        );
        Ok(report)
    }
}

async fn analyze_get(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Query(params) = params?;
    let report = state.run(params).await?;
    Ok(Json(AnalyzeResponse { result: report.result }))
}

async fn analyze_post(
    State(state): State<AppState>,
    params: Result<Json<SearchParams>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(params) = params?;
    let report = state.run(params).await?;
    Ok(Json(AnalyzeResponse { result: report.result }))
}

async fn sentiment_summary(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchReport>, ApiError> {
    let Query(params) = params?;
    Ok(Json(state.run(params).await?))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer, ConfigError> {
    match allowed_origin.map(str::trim).filter(|o| !o.is_empty()) {
        None => Ok(CorsLayer::permissive()),
        Some(origin) => {
            let value = HeaderValue::from_str(origin).map_err(|_| ConfigError::Origin {
                origin: origin.to_string(),
            })?;
            Ok(CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any))
        }
    }
}

/// Build the router with tracing and CORS layers applied.
pub fn router(state: AppState, config: &ServerConfig) -> Result<Router, ConfigError> {
    let cors = cors_layer(config.allowed_origin.as_deref())?;
    Ok(Router::new()
        .route("/analyze-sentiment", get(analyze_get).post(analyze_post))
        .route("/sentiment-summary", get(sentiment_summary))
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
