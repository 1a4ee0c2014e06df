use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::assessments::{DayBoundary, EngineSettings};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assessments: AssessmentConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessments: AssessmentConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Assessment engine policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentConfig {
    pub day_boundary: DayBoundary,
    pub history_limit: usize,
    pub stats_period_days: i64,
    pub enforce_question_count: bool,
    /// CSV export replayed into the store at startup.
    pub seed_csv: Option<PathBuf>,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            day_boundary: engine.day_boundary,
            history_limit: engine.history_limit,
            stats_period_days: engine.stats_period_days,
            enforce_question_count: engine.enforce_question_count,
            seed_csv: None,
        }
    }
}

impl AssessmentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let offset_minutes: i32 = parse_var(
            "ASSESSMENT_UTC_OFFSET_MINUTES",
            0,
            "a whole number of minutes",
        )?;
        let day_boundary = DayBoundary::with_offset_minutes(offset_minutes).ok_or_else(|| {
            ConfigError::InvalidValue {
                key: "ASSESSMENT_UTC_OFFSET_MINUTES",
                expected: "an offset strictly within +/-24 hours",
                value: offset_minutes.to_string(),
            }
        })?;

        let history_limit: usize = parse_var(
            "ASSESSMENT_HISTORY_LIMIT",
            defaults.history_limit,
            "a positive integer",
        )?;
        if history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ASSESSMENT_HISTORY_LIMIT",
                expected: "a positive integer",
                value: history_limit.to_string(),
            });
        }

        let stats_period_days: i64 = parse_var(
            "ASSESSMENT_STATS_PERIOD_DAYS",
            defaults.stats_period_days,
            "a positive number of days",
        )?;
        if stats_period_days <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "ASSESSMENT_STATS_PERIOD_DAYS",
                expected: "a positive number of days",
                value: stats_period_days.to_string(),
            });
        }

        let enforce_question_count = match env::var("ASSESSMENT_ENFORCE_QUESTION_COUNT") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                key: "ASSESSMENT_ENFORCE_QUESTION_COUNT",
                expected: "true or false",
                value: raw,
            })?,
            Err(_) => defaults.enforce_question_count,
        };

        let seed_csv = env::var("ASSESSMENT_SEED_CSV")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            day_boundary,
            history_limit,
            stats_period_days,
            enforce_question_count,
            seed_csv,
        })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            day_boundary: self.day_boundary,
            history_limit: self.history_limit,
            stats_period_days: self.stats_period_days,
            enforce_question_count: self.enforce_question_count,
        }
    }
}

fn parse_var<T: FromStr>(
    key: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue {
                key,
                expected,
                value: raw,
            }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("{key} must be {expected}, got '{value}'")]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}
