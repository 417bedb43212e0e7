//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use attendance_core::domain::{AttendanceAction, GeoPoint, ReferenceSite};
use attendance_core::schedule::{AttendancePolicy, Cutoff, CutoffDirection};
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

const DEFAULT_CHECK_IN_SITE: &str = "-6.245358520910364,106.87237966608049";
const DEFAULT_CHECK_OUT_SITE: &str = "-6.244867901200337,106.87230989592847";

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub log_level: Level,
    pub request_timeout: Duration,
    pub location_timeout: Duration,
    pub gate_radius_meters: f64,
    pub check_in_site: GeoPoint,
    pub check_out_site: GeoPoint,
    pub policy: AttendancePolicy,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Backend ---
        let api_base_url = lookup("API_BASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("API_BASE_URL".to_string()))?
            .trim_end_matches('/')
            .to_string();
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "API_BASE_URL".to_string(),
                format!("'{}' is not an http(s) URL", api_base_url),
            ));
        }

        let log_level_str = var("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let request_timeout =
            parse_seconds("REQUEST_TIMEOUT_SECS", &var("REQUEST_TIMEOUT_SECS", "30"))?;
        let location_timeout =
            parse_seconds("LOCATION_TIMEOUT_SECS", &var("LOCATION_TIMEOUT_SECS", "30"))?;

        // --- Geofence ---
        let radius_str = var("GATE_RADIUS_METERS", "100");
        let gate_radius_meters = radius_str
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "GATE_RADIUS_METERS".to_string(),
                    format!("'{}' is not a positive number of meters", radius_str),
                )
            })?;

        let check_in_site =
            parse_point("CHECK_IN_SITE", &var("CHECK_IN_SITE", DEFAULT_CHECK_IN_SITE))?;
        let check_out_site =
            parse_point("CHECK_OUT_SITE", &var("CHECK_OUT_SITE", DEFAULT_CHECK_OUT_SITE))?;

        // --- Office hours ---
        let check_in = Cutoff::parse(&var("CHECK_IN_CUTOFF", "07:30"), CutoffDirection::After)
            .map_err(|e| ConfigError::InvalidValue("CHECK_IN_CUTOFF".to_string(), e.to_string()))?;
        let check_out = Cutoff::parse(&var("CHECK_OUT_CUTOFF", "16:30"), CutoffDirection::Before)
            .map_err(|e| ConfigError::InvalidValue("CHECK_OUT_CUTOFF".to_string(), e.to_string()))?;

        Ok(Self {
            api_base_url,
            log_level,
            request_timeout,
            location_timeout,
            gate_radius_meters,
            check_in_site,
            check_out_site,
            policy: AttendancePolicy {
                check_in,
                check_out,
            },
        })
    }

    /// The configured site for an action, used when the backend names no branch.
    pub fn default_site(&self, action: AttendanceAction) -> ReferenceSite {
        let point = match action {
            AttendanceAction::CheckIn => self.check_in_site,
            AttendanceAction::CheckOut => self.check_out_site,
        };
        ReferenceSite::new("Head office", point, self.gate_radius_meters)
    }
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .ok()
        .filter(|s| *s > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| {
            ConfigError::InvalidValue(
                key.to_string(),
                format!("'{}' is not a positive number of seconds", value),
            )
        })
}

fn parse_point(key: &str, value: &str) -> Result<GeoPoint, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue(key.to_string(), reason);
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| invalid(format!("'{}' is not in 'lat,lng' form", value)))?;
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(e.to_string()))?;
    let lon = lon
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid(e.to_string()))?;
    GeoPoint::new(lat, lon).map_err(|e| invalid(e.to_string()))
}
