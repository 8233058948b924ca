use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub maps_api_key: String,
    pub directions_base_url: String,
    pub geocoding_base_url: String,
    pub fleet_api_base_url: String,
    pub fleet_api_token: Option<String>,
    pub http_timeout_secs: u64,
    pub engine: EngineSettings,
}

/// Tunables consumed by the navigation and sequencing engines. Copy so each
/// session task can hold its own.
#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Per-axis displacement (degrees) that triggers a directions recalc.
    pub recalc_threshold_deg: f64,
    /// Fixes closer than this (meters) to the last accepted one are dropped.
    pub fix_distance_filter_m: f64,
    /// A session with no commands for this long shuts itself down.
    pub session_idle_timeout: Duration,
    /// A draft untouched for this long is discarded by the reaper.
    pub draft_idle_timeout: Duration,
    pub command_queue_size: usize,
    pub event_buffer_size: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            recalc_threshold_deg: 0.0005,
            fix_distance_filter_m: 5.0,
            session_idle_timeout: Duration::from_secs(900),
            draft_idle_timeout: Duration::from_secs(1800),
            command_queue_size: 256,
            event_buffer_size: 256,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let defaults = EngineSettings::default();
        let engine = EngineSettings {
            recalc_threshold_deg: parse_or_default(
                "RECALC_THRESHOLD_DEG",
                defaults.recalc_threshold_deg,
            )?,
            fix_distance_filter_m: parse_or_default(
                "FIX_DISTANCE_FILTER_M",
                defaults.fix_distance_filter_m,
            )?,
            session_idle_timeout: Duration::from_secs(parse_or_default(
                "SESSION_IDLE_TIMEOUT_SECS",
                defaults.session_idle_timeout.as_secs(),
            )?),
            draft_idle_timeout: Duration::from_secs(parse_or_default(
                "DRAFT_IDLE_TIMEOUT_SECS",
                defaults.draft_idle_timeout.as_secs(),
            )?),
            command_queue_size: parse_or_default(
                "COMMAND_QUEUE_SIZE",
                defaults.command_queue_size,
            )?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            maps_api_key: required("MAPS_API_KEY")?,
            directions_base_url: env::var("DIRECTIONS_BASE_URL").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/directions/json".to_string()
            }),
            geocoding_base_url: env::var("GEOCODING_BASE_URL").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/geocode/json".to_string()
            }),
            fleet_api_base_url: required("FLEET_API_BASE_URL")?,
            fleet_api_token: env::var("FLEET_API_TOKEN").ok(),
            http_timeout_secs: parse_or_default("HTTP_TIMEOUT_SECS", 10)?,
            engine,
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::Internal(format!("{key} is required")))
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
