//! # News Sentiment
//!
//! Harvests recent news results for a search term from a paginated search
//! page, normalizes them into dated articles, labels each with a sentiment
//! from an external classifier, and aggregates the labels into a per-day
//! net sentiment series.
//!
//! ## Usage
//!
//! ```sh
//! news_sentiment search tesla -n 20 --output ./reports
//! news_sentiment serve --bind 0.0.0.0:3001
//! ```
//!
//! ## Architecture
//!
//! 1. **Harvesting**: Follow next-page links politely, one page at a time
//! 2. **Normalizing**: Resolve "3 hours ago" labels, apply the time window, drop duplicates
//! 3. **Classifying**: Label articles through the configured model endpoint (bounded concurrency)
//! 4. **Aggregating**: Net sentiment per UTC day plus today's articles
//! 5. **Output**: Print/write a JSON report, or serve the same data over HTTP

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod classifier;
mod cli;
mod config;
mod dedup;
mod error;
mod harvest;
mod models;
mod normalize;
mod outputs;
mod pipeline;
mod scrapers;
mod server;
mod time;
mod utils;

use cli::{Cli, Command, SearchArgs};
use config::AppConfig;
use error::{ConfigError, HarvestError};
use harvest::Harvester;
use models::Sentiment;
use pipeline::{Labeling, analyze, build_report};
use scrapers::fetch::HttpFetcher;
use server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_sentiment starting up");

    let args = Cli::parse();
    debug!(?args.config, "Parsed CLI arguments");

    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    let fetcher = Arc::new(HttpFetcher::new(&config.source)?);
    let harvester = Harvester::new(fetcher, &config.source, config.harvest.clone())?;
    let classifier = classifier::from_config(&config.classifier)?;
    if classifier.is_none() {
        warn!("No classifier endpoint configured; articles will be left unlabeled");
    }

    match &args.command {
        Command::Search(search) => run_search(search, &config, &harvester, classifier.as_deref()).await?,
        Command::Serve(_) => {
            let state = AppState {
                harvester: Arc::new(harvester),
                classifier,
                label_concurrency: config.classifier.concurrency,
                harvest_timeout: Duration::from_secs(config.server.harvest_timeout_secs),
            };
            serve(state, &config).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// One search from the command line. Ctrl-c stops the harvest early and
/// still reports what was collected.
#[instrument(level = "info", skip_all, fields(term = %search.term))]
async fn run_search(
    search: &SearchArgs,
    config: &AppConfig,
    harvester: &Harvester,
    classifier: Option<&dyn classifier::Classifier>,
) -> Result<(), Box<dyn Error>> {
    // Early check: ensure output dir is writable
    if let Some(dir) = &search.output {
        if let Err(e) = utils::ensure_writable_dir(dir).await {
            error!(
                path = %dir.display(),
                error = %e,
                "Output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
    }

    let max_results = search.max_results.unwrap_or(config.harvest.default_max_results);
    let request = harvester.request(&search.term, max_results, config.harvest.window_days)?;
    let labeling = Labeling {
        classifier,
        concurrency: config.classifier.concurrency,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; finishing with the articles collected so far");
                cancel.cancel();
            }
        }
    });

    let report = match analyze(harvester, labeling, &request, &cancel).await {
        Ok(report) => report,
        Err(HarvestError::Retrieval { url, partial, pages_fetched, source }) => {
            warn!(
                %url,
                error = %source,
                collected = partial.len(),
                "Harvest ended early; reporting partial results"
            );
            let articles = labeling.apply(partial).await;
            build_report(&request.term, articles, pages_fetched, "retrieval_failed", Utc::now())
        }
        Err(e) => return Err(e.into()),
    };
    ctrl_c.abort();

    info!(
        count = report.result.len(),
        days = report.days.len(),
        today = report.today.len(),
        positive_share = report.breakdown.share(Sentiment::Positive),
        negative_share = report.breakdown.share(Sentiment::Negative),
        stop = %report.stop_reason,
        "Search complete"
    );

    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(dir) = &search.output {
        if let Err(e) = outputs::json::write_report(&report, dir).await {
            error!(error = %e, "Failed to write JSON report");
            return Err(e);
        }
    }
    Ok(())
}

#[instrument(level = "info", skip_all, fields(bind = %config.server.bind))]
async fn serve(state: AppState, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let app = server::router(state, &config.server)?;
    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .map_err(|source| ConfigError::Bind {
            addr: config.server.bind.clone(),
            source,
        })?;
    info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;
    Ok(())
}
