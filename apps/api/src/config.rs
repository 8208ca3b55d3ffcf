use anyhow::{bail, Context, Result};

use crate::fairness::alerts::AlertThresholds;

/// Which bias metric backend to install in `AppState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiasProviderKind {
    RateDisparity,
    Disabled,
}

impl BiasProviderKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "rate_disparity" => Ok(BiasProviderKind::RateDisparity),
            "none" | "disabled" => Ok(BiasProviderKind::Disabled),
            other => bail!("BIAS_METRICS_PROVIDER must be 'rate_disparity' or 'none', got '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    pub bias_provider: BiasProviderKind,
    pub alert_thresholds: AlertThresholds,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let alert_thresholds = AlertThresholds {
            warning: parse_env_or("ALERT_WARNING_THRESHOLD", 0.1)?,
            critical: parse_env_or("ALERT_CRITICAL_THRESHOLD", 0.2)?,
        };
        if alert_thresholds.warning > alert_thresholds.critical {
            bail!("ALERT_WARNING_THRESHOLD must not exceed ALERT_CRITICAL_THRESHOLD");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_max_connections: parse_env_or("DB_MAX_CONNECTIONS", 10)?,
            port: parse_env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            bias_provider: match std::env::var("BIAS_METRICS_PROVIDER") {
                Ok(raw) => BiasProviderKind::parse(&raw)?,
                Err(_) => BiasProviderKind::RateDisparity,
            },
            alert_thresholds,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
