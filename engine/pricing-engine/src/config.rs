//! Configuration for the pricing engine

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CURRENCY_DP, DEFAULT_MIN_PARALLEL_LEN, DEFAULT_PERCENT_DP,
};

/// Largest number of decimal places accepted for rounding
pub const MAX_DECIMAL_PLACES: u32 = 10;

/// Configuration for the pricing engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PricingConfig {
    /// Output rounding
    pub rounding: RoundingConfig,

    /// Batch and comparative execution
    pub batch: BatchConfig,

    /// Result memoization
    pub cache: CacheConfig,

    /// Defaults applied by callers that do not supply a value
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundingConfig {
    /// Decimal places for currency outputs
    pub currency_dp: u32,

    /// Decimal places for percentage outputs
    pub percent_dp: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Solve independent requests on the rayon pool
    pub parallel: bool,

    /// Below this many items the batch runs sequentially
    pub min_parallel_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Entries kept before the cache is cleared
    pub max_entries: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Target margin as a fraction (0.30 = 30%)
    pub target_margin: Decimal,
}

impl Default for RoundingConfig {
    fn default() -> Self {
        Self { currency_dp: DEFAULT_CURRENCY_DP, percent_dp: DEFAULT_PERCENT_DP }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { parallel: true, min_parallel_len: DEFAULT_MIN_PARALLEL_LEN }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, max_entries: DEFAULT_CACHE_MAX_ENTRIES }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self { target_margin: Decimal::new(30, 2) }
    }
}

impl PricingConfig {
    /// Load configuration from a TOML file, then validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: PricingConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `PRICING_*` environment variables on top of this configuration
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("PRICING_CURRENCY_DP") {
            self.rounding.currency_dp = parse_env("PRICING_CURRENCY_DP", value)?;
        }
        if let Some(value) = lookup("PRICING_PERCENT_DP") {
            self.rounding.percent_dp = parse_env("PRICING_PERCENT_DP", value)?;
        }
        if let Some(value) = lookup("PRICING_DEFAULT_MARGIN") {
            self.defaults.target_margin = parse_env("PRICING_DEFAULT_MARGIN", value)?;
        }
        if let Some(value) = lookup("PRICING_CACHE_ENABLED") {
            self.cache.enabled = parse_env("PRICING_CACHE_ENABLED", value)?;
        }
        if let Some(value) = lookup("PRICING_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = parse_env("PRICING_CACHE_MAX_ENTRIES", value)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rounding.currency_dp > MAX_DECIMAL_PLACES {
            return Err(ConfigError::Invalid(format!(
                "rounding.currency_dp must be at most {MAX_DECIMAL_PLACES}"
            )));
        }
        if self.rounding.percent_dp > MAX_DECIMAL_PLACES {
            return Err(ConfigError::Invalid(format!(
                "rounding.percent_dp must be at most {MAX_DECIMAL_PLACES}"
            )));
        }
        let margin = self.defaults.target_margin;
        if margin < Decimal::ZERO || margin >= Decimal::ONE {
            return Err(ConfigError::Invalid("defaults.target_margin must be within [0, 1)".into()));
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid("cache.max_entries must be positive".into()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv { key, value })
}
