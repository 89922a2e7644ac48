//! Engine configuration.
//!
//! An [`EngineConfig`] lists the collateral assets with their price feeds and
//! identifies the engine's custody account and the synthetic asset. It is
//! stored as JSON and can be overridden from `DSC_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::registry::AssetRegistry;
use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetId, FeedId};
use crate::utils::constants::*;

/// Environment variable overriding the engine custody address
pub const ENV_ENGINE_ADDRESS: &str = "DSC_ENGINE_ADDRESS";
/// Environment variable overriding the synthetic asset address
pub const ENV_SYNTHETIC_ASSET: &str = "DSC_SYNTHETIC_ASSET";
/// Environment variable overriding the oracle timeout
pub const ENV_ORACLE_TIMEOUT: &str = "DSC_ORACLE_TIMEOUT_SECS";

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// A collateral asset and the feed pricing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralConfig {
    /// Display symbol
    pub symbol: String,
    /// Token contract of the asset
    pub asset: AssetId,
    /// USD price feed
    pub price_feed: FeedId,
    /// Decimals of the feed's answers
    #[serde(default = "default_feed_decimals")]
    pub feed_decimals: u8,
    /// Starting USD price for simulations, e.g. "2000"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_price: Option<String>,
}

fn default_feed_decimals() -> u8 {
    FEED_DECIMALS
}

impl CollateralConfig {
    /// Collateral with label-derived identifiers
    pub fn from_symbol(symbol: &str, initial_price: &str) -> Self {
        let lower = symbol.to_lowercase();
        Self {
            symbol: symbol.to_string(),
            asset: AssetId::from_label(&lower),
            price_feed: FeedId::from_label(&format!("{}-usd", lower)),
            feed_decimals: FEED_DECIMALS,
            initial_price: Some(initial_price.to_string()),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything needed to construct a [`crate::protocol::DscEngine`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Custody account of the engine (also the synthetic asset's owner)
    pub engine: Address,
    /// Contract identifier of the synthetic asset
    pub synthetic_asset: Address,
    /// Maximum price age in seconds
    #[serde(default = "default_oracle_timeout")]
    pub oracle_timeout_secs: u64,
    /// Registered collateral, in registration order
    pub collateral: Vec<CollateralConfig>,
}

fn default_oracle_timeout() -> u64 {
    ORACLE_TIMEOUT_SECS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine: Address::from_label("dsc-engine"),
            synthetic_asset: Address::from_label("dsc-token"),
            oracle_timeout_secs: ORACLE_TIMEOUT_SECS,
            collateral: vec![
                CollateralConfig::from_symbol("WETH", "2000"),
                CollateralConfig::from_symbol("WBTC", "1000"),
            ],
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigurationError(format!("cannot read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::ConfigurationError(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }

        std::fs::write(path, content).map_err(|e| {
            Error::ConfigurationError(format!("cannot write {}: {}", path.display(), e))
        })
    }

    /// Default configuration with environment overrides applied
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Apply `DSC_*` environment overrides
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(engine) = lookup(ENV_ENGINE_ADDRESS) {
            self.engine = engine.parse()?;
        }

        if let Some(synthetic) = lookup(ENV_SYNTHETIC_ASSET) {
            self.synthetic_asset = synthetic.parse()?;
        }

        if let Some(timeout) = lookup(ENV_ORACLE_TIMEOUT) {
            self.oracle_timeout_secs = timeout.parse().map_err(|_| {
                Error::ConfigurationError(format!("{} is not a number: {}", ENV_ORACLE_TIMEOUT, timeout))
            })?;
        }

        Ok(self)
    }

    /// Registered assets in order
    pub fn assets(&self) -> Vec<AssetId> {
        self.collateral.iter().map(|c| c.asset).collect()
    }

    /// Price feeds in asset order
    pub fn feeds(&self) -> Vec<FeedId> {
        self.collateral.iter().map(|c| c.price_feed).collect()
    }

    /// Look up collateral by symbol (case-insensitive)
    pub fn collateral_by_symbol(&self, symbol: &str) -> Option<&CollateralConfig> {
        self.collateral
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.engine.is_zero() {
            return Err(Error::ConfigurationError("engine address cannot be null".into()));
        }
        if self.synthetic_asset.is_zero() {
            return Err(Error::ConfigurationError(
                "synthetic asset address cannot be null".into(),
            ));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(Error::ConfigurationError(
                "oracle timeout must be greater than 0".into(),
            ));
        }
        if let Some(c) = self
            .collateral
            .iter()
            .find(|c| c.feed_decimals > MAX_FEED_DECIMALS)
        {
            return Err(Error::ConfigurationError(format!(
                "{} feed has {} decimals, at most {} are supported",
                c.symbol, c.feed_decimals, MAX_FEED_DECIMALS
            )));
        }
        AssetRegistry::new(self.assets(), self.feeds())?;
        Ok(())
    }
}
