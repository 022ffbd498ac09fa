//! Layered CLI settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults;
//! 2. `benchwatch.toml` in the working directory, or the file given with
//!    `--config`;
//! 3. `BENCHWATCH__*` environment variables (also read from `.env`), e.g.
//!    `BENCHWATCH__DETECTOR__THRESHOLD=0.3` or `BENCHWATCH__ALERTS__SINK=github`.

use benchwatch_detector::DetectorConfig;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default settings file, looked up in the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "benchwatch.toml";

/// Default ledger file name, placed next to the data file.
pub const DEFAULT_LEDGER_FILE: &str = "benchwatch-alerts.json";

/// Where alerts are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Structured log event only
    #[default]
    Log,
    /// GitHub commit comment
    Github,
    /// JSON webhook
    Webhook,
    /// Alerts disabled
    None,
}

/// Alert delivery settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Sink to deliver through
    pub sink: SinkKind,
    /// Idempotency ledger; defaults to a file next to the data file
    pub ledger_path: Option<PathBuf>,
    /// `owner/name` of the repository to comment on
    pub github_repository: Option<String>,
    /// GitHub token; falls back to `GITHUB_TOKEN`
    pub github_token: Option<String>,
    /// GitHub REST endpoint
    pub github_api_url: String,
    /// Webhook endpoint
    pub webhook_url: Option<String>,
    /// Timeout for sink HTTP requests, in seconds
    pub http_timeout_secs: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sink: SinkKind::default(),
            ledger_path: None,
            github_repository: None,
            github_token: None,
            github_api_url: benchwatch_adapters::sinks::github::DEFAULT_API_URL.to_string(),
            webhook_url: None,
            http_timeout_secs: 30,
        }
    }
}

impl AlertSettings {
    /// HTTP request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Ledger location for a given data file.
    pub fn ledger_path_for(&self, data: &Path) -> PathBuf {
        self.ledger_path
            .clone()
            .unwrap_or_else(|| data.with_file_name(DEFAULT_LEDGER_FILE))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter used when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// All CLI settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Regression detection
    pub detector: DetectorConfig,
    /// Alert delivery
    pub alerts: AlertSettings,
    /// Logging
    pub log: LogSettings,
    /// Exit non-zero when a regression is detected
    pub fail_on_regression: bool,
    /// Without `--date`, a run repeating the latest run of its tool within
    /// this many seconds is treated as a retry of that publish
    pub retry_window_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            alerts: AlertSettings::default(),
            log: LogSettings::default(),
            fail_on_regression: false,
            retry_window_secs: 3600,
        }
    }
}

impl Settings {
    /// Retry window in milliseconds.
    pub fn retry_window_ms(&self) -> i64 {
        i64::try_from(self.retry_window_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

impl Settings {
    /// Load settings from `path` (required) or the optional default file,
    /// then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("BENCHWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
