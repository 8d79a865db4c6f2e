// Engine configuration loaded from environment variables

use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_GEOCODER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_GEO_RADIUS_KM: u32 = 20;
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_GEOCODER_USER_AGENT: &str = "hotel-aggregation-engine/0.1";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Tunables for the search and booking paths.
///
/// Reads from environment variables:
/// - `PROVIDER_TIMEOUT_MS` (default: `10000`)
/// - `GEOCODER_TIMEOUT_MS` (default: `5000`)
/// - `GEO_RADIUS_KM` (default: `20`)
/// - `GEOCODER_URL` (default: the public Nominatim search endpoint)
/// - `GEOCODER_USER_AGENT` (default: `"hotel-aggregation-engine/0.1"`)
/// - `RUST_LOG` (default: `"info"`)
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub provider_timeout: Duration,
    pub geocoder_timeout: Duration,
    pub geo_radius_km: u32,
    pub geocoder_url: String,
    pub geocoder_user_agent: String,
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_millis(DEFAULT_PROVIDER_TIMEOUT_MS),
            geocoder_timeout: Duration::from_millis(DEFAULT_GEOCODER_TIMEOUT_MS),
            geo_radius_km: DEFAULT_GEO_RADIUS_KM,
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            geocoder_user_agent: DEFAULT_GEOCODER_USER_AGENT.to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EngineConfig::from_env`] but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let provider_timeout =
            parse_or(&lookup, "PROVIDER_TIMEOUT_MS", DEFAULT_PROVIDER_TIMEOUT_MS)?;
        let geocoder_timeout =
            parse_or(&lookup, "GEOCODER_TIMEOUT_MS", DEFAULT_GEOCODER_TIMEOUT_MS)?;
        let geo_radius_km = parse_or(&lookup, "GEO_RADIUS_KM", DEFAULT_GEO_RADIUS_KM)?;

        Ok(Self {
            provider_timeout: Duration::from_millis(provider_timeout),
            geocoder_timeout: Duration::from_millis(geocoder_timeout),
            geo_radius_km,
            geocoder_url: lookup("GEOCODER_URL").unwrap_or(defaults.geocoder_url),
            geocoder_user_agent: lookup("GEOCODER_USER_AGENT")
                .unwrap_or(defaults.geocoder_user_agent),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.log_level`. Returns `false` if a subscriber
/// was already installed.
pub fn init_tracing(config: &EngineConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
