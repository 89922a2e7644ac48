//! Price feed interface and in-memory aggregators.
//!
//! This module provides:
//! - The [`PriceOracle`] trait the engine reads prices through
//! - Round data as reported by an aggregator
//! - [`MockAggregator`], a single in-memory feed
//! - [`FeedRegistry`], a set of aggregators keyed by [`FeedId`]

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::oracle::clock::Clock;
use crate::utils::address::FeedId;

// ═══════════════════════════════════════════════════════════════════════════════
// ROUND DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// A single aggregator reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundData {
    /// Round identifier
    pub round_id: u64,
    /// USD price per unit, with the feed's decimals
    pub answer: i128,
    /// Unix timestamp the round started
    pub started_at: u64,
    /// Unix timestamp the answer was last updated
    pub updated_at: u64,
    /// Round in which the answer was computed
    pub answered_in_round: u64,
}

impl RoundData {
    /// Get age of the reading in seconds
    pub fn age(&self, current_time: u64) -> u64 {
        current_time.saturating_sub(self.updated_at)
    }

    /// Check if the round carries a complete answer
    pub fn is_complete(&self) -> bool {
        self.updated_at != 0 && self.answered_in_round >= self.round_id
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// USD price lookup per feed
pub trait PriceOracle: Send + Sync {
    /// Decimals of the feed's answers
    fn decimals(&self, feed: &FeedId) -> Result<u8>;

    /// Latest reading of the feed
    fn latest_round_data(&self, feed: &FeedId) -> Result<RoundData>;
}

impl<O: PriceOracle + ?Sized> PriceOracle for Arc<O> {
    fn decimals(&self, feed: &FeedId) -> Result<u8> {
        (**self).decimals(feed)
    }

    fn latest_round_data(&self, feed: &FeedId) -> Result<RoundData> {
        (**self).latest_round_data(feed)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK AGGREGATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory aggregator for a single feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockAggregator {
    /// Decimals of the answers
    decimals: u8,
    /// Latest round
    latest: RoundData,
    /// Previous rounds (oldest first)
    history: Vec<RoundData>,
    /// Maximum history size
    max_history: usize,
}

impl MockAggregator {
    /// Create an aggregator with an initial answer
    pub fn new(decimals: u8, initial_answer: i128, timestamp: u64) -> Self {
        let mut aggregator = Self {
            decimals,
            latest: RoundData::default(),
            history: Vec::new(),
            max_history: 100,
        };
        aggregator.update_answer(initial_answer, timestamp);
        aggregator
    }

    /// Publish a new answer in the next round
    pub fn update_answer(&mut self, answer: i128, timestamp: u64) {
        let round_id = self.latest.round_id + 1;
        self.push_round(RoundData {
            round_id,
            answer,
            started_at: timestamp,
            updated_at: timestamp,
            answered_in_round: round_id,
        });
    }

    /// Publish an arbitrary round (for simulating incomplete or stale rounds)
    pub fn update_round_data(&mut self, round: RoundData) {
        self.push_round(round);
    }

    fn push_round(&mut self, round: RoundData) {
        if self.latest.round_id != 0 {
            self.history.push(self.latest);
            if self.history.len() > self.max_history {
                self.history.remove(0);
            }
        }
        self.latest = round;
    }

    /// Decimals of the answers
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Latest round
    pub fn latest(&self) -> RoundData {
        self.latest
    }

    /// Previous rounds
    pub fn history(&self) -> &[RoundData] {
        &self.history
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FEED REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// A set of in-memory aggregators stamped by a shared clock
pub struct FeedRegistry<C: Clock> {
    feeds: RwLock<HashMap<FeedId, MockAggregator>>,
    clock: C,
}

impl<C: Clock> FeedRegistry<C> {
    /// Create an empty registry
    pub fn new(clock: C) -> Self {
        Self {
            feeds: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Register a feed with an initial answer
    pub fn add_feed(&self, feed: FeedId, decimals: u8, initial_answer: i128) -> Result<()> {
        let mut feeds = self.feeds.write().map_err(|_| Error::Lock)?;
        feeds.insert(feed, MockAggregator::new(decimals, initial_answer, self.clock.now()));
        Ok(())
    }

    /// Publish a new answer on a feed, stamped with the current time
    pub fn update_answer(&self, feed: &FeedId, answer: i128) -> Result<()> {
        let now = self.clock.now();
        self.with_feed_mut(feed, |aggregator| aggregator.update_answer(answer, now))
    }

    /// Publish an arbitrary round on a feed
    pub fn update_round_data(&self, feed: &FeedId, round: RoundData) -> Result<()> {
        self.with_feed_mut(feed, |aggregator| aggregator.update_round_data(round))
    }

    /// Get a copy of a feed's aggregator
    pub fn aggregator(&self, feed: &FeedId) -> Option<MockAggregator> {
        self.feeds.read().ok()?.get(feed).cloned()
    }

    /// Number of registered feeds
    pub fn len(&self) -> usize {
        self.feeds.read().map(|f| f.len()).unwrap_or(0)
    }

    /// Check if no feeds are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_feed_mut(&self, feed: &FeedId, f: impl FnOnce(&mut MockAggregator)) -> Result<()> {
        let mut feeds = self.feeds.write().map_err(|_| Error::Lock)?;
        let aggregator = feeds
            .get_mut(feed)
            .ok_or_else(|| Error::StaleOrInvalidPrice(format!("unknown feed {}", feed)))?;
        f(aggregator);
        Ok(())
    }
}

impl<C: Clock> PriceOracle for FeedRegistry<C> {
    fn decimals(&self, feed: &FeedId) -> Result<u8> {
        let feeds = self.feeds.read().map_err(|_| Error::Lock)?;
        feeds
            .get(feed)
            .map(MockAggregator::decimals)
            .ok_or_else(|| Error::StaleOrInvalidPrice(format!("unknown feed {}", feed)))
    }

    fn latest_round_data(&self, feed: &FeedId) -> Result<RoundData> {
        let feeds = self.feeds.read().map_err(|_| Error::Lock)?;
        feeds
            .get(feed)
            .map(MockAggregator::latest)
            .ok_or_else(|| Error::StaleOrInvalidPrice(format!("unknown feed {}", feed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::clock::ManualClock;

    #[test]
    fn test_aggregator_rounds() {
        let mut aggregator = MockAggregator::new(8, 2000_0000_0000, 100);
        assert_eq!(aggregator.latest().round_id, 1);
        assert!(aggregator.history().is_empty());

        aggregator.update_answer(18_0000_0000, 200);
        let latest = aggregator.latest();
        assert_eq!(latest.round_id, 2);
        assert_eq!(latest.answer, 18_0000_0000);
        assert_eq!(latest.updated_at, 200);
        assert!(latest.is_complete());
        assert_eq!(aggregator.history().len(), 1);
    }

    #[test]
    fn test_incomplete_round() {
        let round = RoundData {
            round_id: 5,
            answer: 1,
            started_at: 1,
            updated_at: 1,
            answered_in_round: 4,
        };
        assert!(!round.is_complete());
        assert!(!RoundData::default().is_complete());
    }

    #[test]
    fn test_registry_uses_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let registry = FeedRegistry::new(clock.clone());
        let feed = FeedId::from_label("eth-usd");

        registry.add_feed(feed, 8, 2000_0000_0000).unwrap();
        clock.advance(60);
        registry.update_answer(&feed, 1900_0000_0000).unwrap();

        let round = registry.latest_round_data(&feed).unwrap();
        assert_eq!(round.updated_at, 1_060);
        assert_eq!(round.answer, 1900_0000_0000);
        assert_eq!(registry.decimals(&feed).unwrap(), 8);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_feed() {
        let registry = FeedRegistry::new(ManualClock::new(0));
        let feed = FeedId::from_label("missing");
        assert!(matches!(
            registry.latest_round_data(&feed),
            Err(Error::StaleOrInvalidPrice(_))
        ));
        assert!(registry.update_answer(&feed, 1).is_err());
    }
}
