//! Command-line interface definitions for News Sentiment.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Classifier settings can also be provided via environment variables.

use crate::config::{AppConfig, CapPolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the News Sentiment application.
///
/// # Examples
///
/// ```sh
/// # One-off search, printing the report
/// news_sentiment search tesla -n 20
///
/// # Also write the report under ./reports/<date>/
/// news_sentiment search "electric vehicles" --output ./reports
///
/// # Serve the HTTP API
/// news_sentiment --config config.yaml serve --bind 0.0.0.0:3001
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Sentiment classification endpoint
    #[arg(long, env = "CLASSIFIER_URL", global = true)]
    pub classifier_url: Option<String>,

    /// Bearer token for the classification endpoint
    #[arg(long, env = "CLASSIFIER_API_KEY", global = true, hide_env_values = true)]
    pub classifier_api_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Harvest, classify and summarize one search term
    Search(SearchArgs),
    /// Run the HTTP API
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search term
    pub term: String,

    /// Maximum number of articles to keep
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    /// Only keep articles posted within this many days
    #[arg(long)]
    pub window_days: Option<u32>,

    /// Stop paging as soon as the article cap is reached
    #[arg(long)]
    pub stop_at_cap: bool,

    /// Directory to write the JSON report into
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long)]
    pub bind: Option<String>,
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.classifier_url {
            config.classifier.endpoint = Some(url.clone());
        }
        if let Some(key) = &self.classifier_api_key {
            config.classifier.api_key = Some(key.clone());
        }
        match &self.command {
            Command::Search(args) => {
                if let Some(days) = args.window_days {
                    config.harvest.window_days = days;
                }
                if args.stop_at_cap {
                    config.harvest.cap_policy = CapPolicy::StopAtCap;
                }
            }
            Command::Serve(args) => {
                if let Some(bind) = &args.bind {
                    config.server.bind = bind.clone();
                }
            }
        }
    }
}
