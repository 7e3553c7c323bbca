//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section has defaults, so a missing or partial file still yields
//! a working configuration. The API key is referenced by env-var name and
//! resolved at runtime via `std::env::var`; the resolved value is wrapped
//! in `SecretString` so it never leaks through Debug output.
//!
//! The whole config is consumed at construction time — no component
//! reads global mutable state at call time.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

use crate::types::RoverName;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub spans: SpanConfig,
    #[serde(default)]
    pub rovers: RoverScaleConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.nasa.gov".to_string(),
            api_key_env: "NASA_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Ceiling per rolling hour, kept below NASA's published 1000/hour.
    pub max_requests_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests_per_hour: 950,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Upper bound of the uniform jitter added to every backoff delay.
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            multiplier: 2.0,
            max_delay_ms: 10_000,
            jitter_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpanConfig {
    /// Upstream caps the imagery range endpoint at 100 days.
    pub imagery_max_days: i64,
    /// Upstream caps the object feed at 7 days.
    pub neo_max_days: i64,
    pub correlation_max_days: i64,
}

impl Default for SpanConfig {
    fn default() -> Self {
        Self {
            imagery_max_days: 100,
            neo_max_days: 7,
            correlation_max_days: 7,
        }
    }
}

/// Physical dimensions of one rover, meters.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RoverDimensions {
    pub length_m: f64,
    pub width_m: f64,
    pub height_m: f64,
}

/// Fixed physical-scale reference table. The photo archive API carries
/// no physical dimensions, so these come from mission fact sheets and
/// are overridable in config.
#[derive(Debug, Deserialize, Clone)]
pub struct RoverScaleConfig {
    pub curiosity: RoverDimensions,
    pub opportunity: RoverDimensions,
    pub spirit: RoverDimensions,
}

impl RoverScaleConfig {
    pub fn dimensions_for(&self, rover: RoverName) -> RoverDimensions {
        match rover {
            RoverName::Curiosity => self.curiosity,
            RoverName::Opportunity => self.opportunity,
            RoverName::Spirit => self.spirit,
        }
    }
}

impl Default for RoverScaleConfig {
    fn default() -> Self {
        // MER twins share a chassis; Curiosity is the car-sized one.
        let mer = RoverDimensions {
            length_m: 1.6,
            width_m: 2.3,
            height_m: 1.5,
        };
        Self {
            curiosity: RoverDimensions {
                length_m: 3.0,
                width_m: 2.8,
                height_m: 2.1,
            },
            opportunity: mer,
            spirit: mer,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from a TOML file if present, defaults otherwise.
    pub fn load_or_default(path: &str) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Resolve the API key from the configured env var.
    /// Falls back to the upstream demo key when unset.
    pub fn resolve_api_key(&self) -> SecretString {
        std::env::var(&self.api.api_key_env)
            .unwrap_or_else(|_| "DEMO_KEY".to_string())
            .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.api.base_url, "https://api.nasa.gov");
        assert_eq!(cfg.rate_limit.max_requests_per_hour, 950);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.spans.neo_max_days, 7);
        assert_eq!(cfg.spans.imagery_max_days, 100);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [rate_limit]
            max_requests_per_hour = 100
            "#,
        )
        .unwrap();
        assert_eq!(cfg.rate_limit.max_requests_per_hour, 100);
        assert_eq!(cfg.retry.max_attempts, 3); // default preserved
    }

    #[test]
    fn test_rover_dimensions_table() {
        let cfg = AppConfig::default();
        let curiosity = cfg.rovers.dimensions_for(RoverName::Curiosity);
        assert!((curiosity.width_m - 2.8).abs() < 1e-10);
        // The MER twins share a chassis.
        let opp = cfg.rovers.dimensions_for(RoverName::Opportunity);
        let spirit = cfg.rovers.dimensions_for(RoverName::Spirit);
        assert!((opp.width_m - spirit.width_m).abs() < 1e-10);
    }

    #[test]
    fn test_resolve_api_key_falls_back_to_demo() {
        let mut cfg = AppConfig::default();
        cfg.api.api_key_env = "ASTROLABE_TEST_UNSET_KEY".to_string();
        assert_eq!(cfg.resolve_api_key().expose_secret(), "DEMO_KEY");
    }
}
