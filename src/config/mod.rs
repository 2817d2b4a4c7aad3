pub mod cli;
pub mod slurm;
pub mod toml_config;

use crate::core::calendar::sundays_between;
use crate::core::{AcquisitionWindow, ConfigProvider};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Parser;
use std::time::Duration;
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

pub const DEFAULT_CATEGORIES: [&str; 7] = [
    "Combined Print and E-Book Fiction",
    "Combined Print and E-Book Nonfiction",
    "Hardcover Fiction",
    "Hardcover Nonfiction",
    "Trade Fiction Paperback",
    "Paperback Nonfiction",
    "Advice How-To and Miscellaneous",
];

pub const DEFAULT_SCHEDULE_PATH: &str = "tools/acquisition_dates.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "data/raw";
pub const DEFAULT_DAILY_REQUEST_LIMIT: usize = 500;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "obtain-historical-data")]
#[command(about = "Fetch one half-year of NYT bestseller history, following the acquisition schedule")]
pub struct CliConfig {
    /// NYT API key
    #[arg(long, env = "NYT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Books API base URL, e.g. https://api.nytimes.com/svc/books/v3
    #[arg(long, env = "BOOKS_BASE_URL")]
    pub books_base_url: Option<String>,

    /// Article Search API base URL, e.g. https://api.nytimes.com/svc/search/v2
    #[arg(long, env = "ARTICLES_BASE_URL")]
    pub articles_base_url: Option<String>,

    /// Optional TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Acquisition schedule CSV written by `create-schedule`
    #[arg(long)]
    pub schedule: Option<String>,

    /// Directory for the output CSV
    #[arg(long)]
    pub output_path: Option<String>,

    /// Pretend today is this date (YYYY-MM-DD) when looking up the schedule
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Fetch this start date directly instead of using the schedule (requires --end)
    #[arg(long, requires = "end")]
    pub start: Option<NaiveDate>,

    /// End date for --start
    #[arg(long, requires = "start")]
    pub end: Option<NaiveDate>,

    /// Bestseller list names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,

    /// Maximum list requests per run
    #[arg(long)]
    pub daily_limit: Option<usize>,

    /// Seconds to wait after every API request
    #[arg(long)]
    pub request_delay: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub request_timeout: Option<u64>,

    /// Do not look up reviews for aggregated books
    #[arg(long)]
    pub skip_reviews: bool,

    /// Also write a zip archive of the output CSV
    #[arg(long)]
    pub compress: bool,

    /// Show the plan without calling the API
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU and memory per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit JSON log lines (for batch job logs)")]
    pub log_json: bool,
}

/// 合併命令列、環境變數與 TOML 之後的最終設定
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub api_key: String,
    pub books_base_url: String,
    pub articles_base_url: String,
    pub schedule_path: String,
    pub output_path: String,
    pub categories: Vec<String>,
    pub daily_request_limit: usize,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub fetch_reviews: bool,
    pub compress_output: bool,
    pub monitor: bool,
}

/// `${VAR}` 沒被替換代表環境變數不存在，當作未設定
#[cfg(feature = "cli")]
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && !v.starts_with("${"))
}

impl AcquisitionConfig {
    #[cfg(feature = "cli")]
    pub fn resolve(cli: &CliConfig, file: Option<&TomlConfig>) -> Result<Self> {
        let default_file = TomlConfig::default();
        let file = file.unwrap_or(&default_file);

        let api_key = present(cli.api_key.clone().or_else(|| file.api.key.clone()));
        let books_base_url =
            present(cli.books_base_url.clone().or_else(|| file.api.books_base_url.clone()));
        let articles_base_url = present(
            cli.articles_base_url
                .clone()
                .or_else(|| file.api.articles_base_url.clone()),
        );

        let categories = if !cli.categories.is_empty() {
            cli.categories.clone()
        } else {
            file.acquisition
                .categories
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORIES.iter().map(|c| c.to_string()).collect())
        };

        let config = Self {
            api_key: validation::validate_required_field("NYT_API_KEY", &api_key)?.clone(),
            books_base_url: validation::validate_required_field("BOOKS_BASE_URL", &books_base_url)?
                .clone(),
            articles_base_url: validation::validate_required_field(
                "ARTICLES_BASE_URL",
                &articles_base_url,
            )?
            .clone(),
            schedule_path: cli
                .schedule
                .clone()
                .or_else(|| file.acquisition.schedule_path.clone())
                .unwrap_or_else(|| DEFAULT_SCHEDULE_PATH.to_string()),
            output_path: cli
                .output_path
                .clone()
                .or_else(|| file.load.output_path.clone())
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string()),
            categories,
            daily_request_limit: cli
                .daily_limit
                .or(file.api.daily_request_limit)
                .unwrap_or(DEFAULT_DAILY_REQUEST_LIMIT),
            request_delay: cli
                .request_delay
                .or(file.api.request_delay_seconds)
                .map(Duration::from_secs)
                .unwrap_or(crate::core::nyt_client::DEFAULT_REQUEST_DELAY),
            request_timeout: cli
                .request_timeout
                .or(file.api.timeout_seconds)
                .map(Duration::from_secs)
                .unwrap_or(crate::core::nyt_client::DEFAULT_REQUEST_TIMEOUT),
            fetch_reviews: !cli.skip_reviews && file.acquisition.fetch_reviews.unwrap_or(true),
            compress_output: cli.compress || file.load.compress.unwrap_or(false),
            monitor: cli.monitor || file.monitoring_enabled(),
        };

        config.validate()?;
        Ok(config)
    }

    /// 受每日上限約束後的榜單請求數
    pub fn planned_list_requests(&self, window: &AcquisitionWindow) -> usize {
        sundays_between(window.start_date, window.end_date)
            .len()
            .saturating_mul(self.categories.len())
            .min(self.daily_request_limit)
    }

    /// 只計算請求之間的固定暫停；溢位時回傳 `Duration::MAX`
    pub fn minimum_list_duration(&self, window: &AcquisitionWindow) -> Duration {
        u32::try_from(self.planned_list_requests(window))
            .ok()
            .and_then(|requests| self.request_delay.checked_mul(requests))
            .unwrap_or(Duration::MAX)
    }
}

impl Validate for AcquisitionConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("NYT_API_KEY", &self.api_key)?;
        validation::validate_url("BOOKS_BASE_URL", &self.books_base_url)?;
        validation::validate_url("ARTICLES_BASE_URL", &self.articles_base_url)?;
        validation::validate_path("schedule", &self.schedule_path)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_non_empty_list("categories", &self.categories)?;
        validation::validate_positive_number("daily_limit", self.daily_request_limit, 1)?;

        if self.request_timeout.is_zero() {
            return Err(EtlError::InvalidConfigValueError {
                field: "request_timeout".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be at least one second".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigProvider for AcquisitionConfig {
    fn api_key(&self) -> &str {
        &self.api_key
    }

    fn books_base_url(&self) -> &str {
        &self.books_base_url
    }

    fn articles_base_url(&self) -> &str {
        &self.articles_base_url
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn categories(&self) -> &[String] {
        &self.categories
    }

    fn daily_request_limit(&self) -> usize {
        self.daily_request_limit
    }

    fn request_delay(&self) -> Duration {
        self.request_delay
    }

    fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn fetch_reviews(&self) -> bool {
        self.fetch_reviews
    }

    fn compress_output(&self) -> bool {
        self.compress_output
    }
}
