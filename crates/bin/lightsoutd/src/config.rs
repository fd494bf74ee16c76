//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `lightsout.toml` in the working directory (or the path in
//! `LIGHTSOUT_CONFIG`). Every field has a sensible default so the file is
//! optional. Environment variables take precedence over file values, and the
//! result is validated before anything starts.

use std::time::Duration;

use serde::Deserialize;

use lightsout_adapter_virtual::VirtualBridgeConfig;
use lightsout_app::automation_coordinator::AutomationPolicy;
use lightsout_app::detector::DetectorConfig;
use lightsout_app::predictor::PredictorConfig;
use lightsout_app::services::ingestion_service::IngestionConfig;
use lightsout_domain::time::Calendar;

const DEFAULT_PATH: &str = "lightsout.toml";

/// Largest accepted distance from UTC, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Upper bound for day counts (event window, retention).
const MAX_DAYS: u32 = 3_650;

/// Upper bound for every other configured duration.
const MAX_DURATION_SECS: u64 = 365 * 86_400;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub calendar: CalendarConfig,
    pub ingestion: IngestionConfig,
    pub detection: DetectionConfig,
    pub prediction: PredictionConfig,
    pub automation: AutomationPolicy,
    /// Devices simulated by the virtual bridge.
    #[serde(rename = "virtual")]
    pub virtual_bridge: VirtualBridgeConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Where "local time" is, for time-of-day patterns.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Minutes east of UTC.
    pub utc_offset_minutes: i32,
}

/// Detection schedule plus the detector thresholds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub interval_secs: u64,
    #[serde(flatten)]
    pub detector: DetectorConfig,
}

/// Predictor schedule plus the predictor thresholds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub interval_secs: u64,
    #[serde(flatten)]
    pub predictor: PredictorConfig,
}

impl Config {
    /// Load configuration from `lightsout.toml` (if present), apply
    /// environment-variable overrides and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("LIGHTSOUT_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LIGHTSOUT_HOST") {
            self.server.host = val;
        }
        if let Ok(val) = std::env::var("LIGHTSOUT_PORT")
            && let Ok(port) = val.parse()
        {
            self.server.port = port;
        }
        if let Ok(val) = std::env::var("LIGHTSOUT_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("LIGHTSOUT_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("LIGHTSOUT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(dry_run) = env_flag("LIGHTSOUT_DRY_RUN") {
            self.automation.dry_run = dry_run;
        }
        if let Some(enabled) = env_flag("LIGHTSOUT_AUTOMATION_ENABLED") {
            self.automation.enabled = enabled;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("port must be non-zero"));
        }
        if self.ingestion.poll_interval_secs == 0
            || self.ingestion.purge_interval_secs == 0
            || self.detection.interval_secs == 0
            || self.prediction.interval_secs == 0
        {
            return Err(invalid("job intervals must be non-zero"));
        }
        if self.ingestion.retention_days == 0 {
            return Err(invalid("ingestion.retention_days must be at least 1"));
        }
        if self.detection.detector.window_days == 0 {
            return Err(invalid("detection.window_days must be at least 1"));
        }
        if self.detection.detector.min_support == 0 {
            return Err(invalid("detection.min_support must be at least 1"));
        }
        if !is_probability(self.detection.detector.min_confidence)
            || !is_probability(self.detection.detector.min_sequence_probability)
            || !is_probability(self.prediction.predictor.min_confidence)
        {
            return Err(invalid("confidence and probability thresholds must be within [0, 1]"));
        }
        if self.detection.detector.sequence_lookahead_secs == 0
            || self.detection.detector.correlation_window_secs == 0
        {
            return Err(invalid("detection windows must be non-zero"));
        }
        if self.automation.cooldown_secs == 0 {
            return Err(invalid("automation.cooldown_secs must be positive"));
        }
        if self.automation.retry.max_attempts == 0 {
            return Err(invalid("automation.retry.max_attempts must be at least 1"));
        }
        if self.automation.log_capacity == 0 {
            return Err(invalid("automation.log_capacity must be at least 1"));
        }
        if self.ingestion.retention_days > MAX_DAYS
            || self.detection.detector.window_days > MAX_DAYS
        {
            return Err(invalid("day counts must not exceed ten years"));
        }
        let seconds = [
            self.ingestion.poll_interval_secs,
            self.ingestion.purge_interval_secs,
            self.detection.interval_secs,
            self.prediction.interval_secs,
            self.detection.detector.sequence_lookahead_secs,
            self.detection.detector.correlation_window_secs,
            self.prediction.predictor.advisory_horizon_secs,
            self.automation.cooldown_secs,
        ];
        let millis = [
            self.automation.command_timeout_ms,
            self.automation.retry.initial_backoff_ms,
            self.automation.retry.max_backoff_ms,
        ];
        if seconds.iter().any(|&secs| secs > MAX_DURATION_SECS)
            || millis.iter().any(|&ms| ms / 1_000 > MAX_DURATION_SECS)
        {
            return Err(invalid("durations must not exceed one year"));
        }
        if self.calendar.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(invalid("calendar.utc_offset_minutes must be within ±14h"));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn calendar(&self) -> Calendar {
        Calendar::with_offset_minutes(self.calendar.utc_offset_minutes)
    }
}

impl DetectionConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl PredictionConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:lightsout.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "lightsoutd=info,lightsout=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
            detector: DetectorConfig::default(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            predictor: PredictorConfig::default(),
        }
    }
}

fn is_probability(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

/// `true`/`false`/`1`/`0` from the environment; anything else is ignored.
fn env_flag(name: &str) -> Option<bool> {
    parse_flag(&std::env::var(name).ok()?)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
