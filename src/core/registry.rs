//! Registry of allowed collateral assets and their price feeds.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::utils::address::{AssetId, FeedId};

/// Immutable mapping from collateral asset to USD price feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRegistry {
    /// Assets in registration order
    assets: Vec<AssetId>,
    /// Price feed per asset
    feeds: HashMap<AssetId, FeedId>,
}

impl AssetRegistry {
    /// Build a registry from parallel asset and feed lists
    pub fn new(assets: Vec<AssetId>, feeds: Vec<FeedId>) -> Result<Self> {
        if assets.len() != feeds.len() {
            return Err(Error::ConfigurationError(format!(
                "{} collateral assets but {} price feeds",
                assets.len(),
                feeds.len()
            )));
        }
        if assets.is_empty() {
            return Err(Error::ConfigurationError(
                "at least one collateral asset is required".into(),
            ));
        }

        let mut map = HashMap::with_capacity(assets.len());
        for (asset, feed) in assets.iter().zip(feeds.iter()) {
            if asset.is_zero() {
                return Err(Error::ConfigurationError("null collateral asset".into()));
            }
            if feed.is_zero() {
                return Err(Error::ConfigurationError(format!(
                    "null price feed for {}",
                    asset
                )));
            }
            if map.insert(*asset, *feed).is_some() {
                return Err(Error::ConfigurationError(format!(
                    "collateral asset {} registered twice",
                    asset
                )));
            }
        }

        Ok(Self { assets, feeds: map })
    }

    /// Fail with `AssetNotAllowed` unless `asset` is registered
    pub fn ensure_allowed(&self, asset: &AssetId) -> Result<FeedId> {
        self.feed_of(asset).ok_or(Error::AssetNotAllowed(*asset))
    }

    /// Price feed of `asset`, if registered
    pub fn feed_of(&self, asset: &AssetId) -> Option<FeedId> {
        self.feeds.get(asset).copied()
    }

    /// Check if `asset` is registered
    pub fn contains(&self, asset: &AssetId) -> bool {
        self.feeds.contains_key(asset)
    }

    /// Registered assets in registration order
    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Always false for a constructed registry
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(label: &str) -> AssetId {
        AssetId::from_label(label)
    }

    fn feed(label: &str) -> FeedId {
        FeedId::from_label(label)
    }

    #[test]
    fn test_registry_lookup() {
        let registry = AssetRegistry::new(
            vec![asset("weth"), asset("wbtc")],
            vec![feed("eth-usd"), feed("btc-usd")],
        )
        .unwrap();

        assert_eq!(registry.assets(), &[asset("weth"), asset("wbtc")]);
        assert_eq!(registry.feed_of(&asset("wbtc")), Some(feed("btc-usd")));
        assert_eq!(registry.ensure_allowed(&asset("weth")).unwrap(), feed("eth-usd"));
        assert_eq!(
            registry.ensure_allowed(&asset("link")),
            Err(Error::AssetNotAllowed(asset("link")))
        );
    }

    #[test]
    fn test_length_mismatch() {
        let result = AssetRegistry::new(vec![asset("weth"), asset("wbtc")], vec![feed("eth-usd")]);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_rejects_empty_duplicate_and_null() {
        assert!(AssetRegistry::new(vec![], vec![]).is_err());
        assert!(AssetRegistry::new(
            vec![asset("weth"), asset("weth")],
            vec![feed("a"), feed("b")]
        )
        .is_err());
        assert!(AssetRegistry::new(vec![AssetId::ZERO], vec![feed("a")]).is_err());
        assert!(AssetRegistry::new(vec![asset("weth")], vec![FeedId::ZERO]).is_err());
    }
}
