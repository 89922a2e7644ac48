//! Staleness-checked price readings.
//!
//! [`StaleCheckedOracle`] wraps any [`PriceOracle`] and refuses readings that
//! are incomplete, non-positive or older than the configured timeout. Callers
//! never receive a substitute price: a rejected reading is an error.

use crate::error::{Error, Result};
use crate::oracle::clock::Clock;
use crate::oracle::price_feed::{PriceOracle, RoundData};
use crate::utils::address::FeedId;
use crate::utils::constants::ORACLE_TIMEOUT_SECS;

/// Oracle adapter that enforces freshness of every reading
pub struct StaleCheckedOracle<O, C> {
    inner: O,
    clock: C,
    timeout_secs: u64,
}

impl<O: PriceOracle, C: Clock> StaleCheckedOracle<O, C> {
    /// Wrap `inner` with the default 3 hour timeout
    pub fn new(inner: O, clock: C) -> Self {
        Self::with_timeout(inner, clock, ORACLE_TIMEOUT_SECS)
    }

    /// Wrap `inner` with a custom timeout
    pub fn with_timeout(inner: O, clock: C, timeout_secs: u64) -> Self {
        Self {
            inner,
            clock,
            timeout_secs,
        }
    }

    /// Configured timeout in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Validate a reading against the current time
    pub fn check(&self, feed: &FeedId, round: &RoundData) -> Result<()> {
        if !round.is_complete() {
            return Err(Error::StaleOrInvalidPrice(format!(
                "feed {} round {} incomplete",
                feed, round.round_id
            )));
        }

        let age = round.age(self.clock.now());
        if age > self.timeout_secs {
            return Err(Error::StaleOrInvalidPrice(format!(
                "feed {} last updated {}s ago, max allowed {}s",
                feed, age, self.timeout_secs
            )));
        }

        if round.answer <= 0 {
            return Err(Error::StaleOrInvalidPrice(format!(
                "feed {} answered {}",
                feed, round.answer
            )));
        }

        Ok(())
    }
}

impl<O: PriceOracle, C: Clock> PriceOracle for StaleCheckedOracle<O, C> {
    fn decimals(&self, feed: &FeedId) -> Result<u8> {
        self.inner.decimals(feed)
    }

    fn latest_round_data(&self, feed: &FeedId) -> Result<RoundData> {
        let round = self.inner.latest_round_data(feed)?;
        if let Err(e) = self.check(feed, &round) {
            tracing::warn!(%feed, "rejected price reading: {}", e);
            return Err(e);
        }
        Ok(round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::clock::ManualClock;
    use crate::oracle::price_feed::FeedRegistry;
    use std::sync::Arc;

    fn setup() -> (
        Arc<ManualClock>,
        Arc<FeedRegistry<Arc<ManualClock>>>,
        StaleCheckedOracle<Arc<FeedRegistry<Arc<ManualClock>>>, Arc<ManualClock>>,
        FeedId,
    ) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let feeds = Arc::new(FeedRegistry::new(clock.clone()));
        let feed = FeedId::from_label("eth-usd");
        feeds.add_feed(feed, 8, 2000_0000_0000).unwrap();
        let oracle = StaleCheckedOracle::new(feeds.clone(), clock.clone());
        (clock, feeds, oracle, feed)
    }

    #[test]
    fn test_fresh_price_passes() {
        let (clock, _, oracle, feed) = setup();
        clock.advance(ORACLE_TIMEOUT_SECS);
        let round = oracle.latest_round_data(&feed).unwrap();
        assert_eq!(round.answer, 2000_0000_0000);
    }

    #[test]
    fn test_stale_price_rejected() {
        let (clock, _, oracle, feed) = setup();
        clock.advance(ORACLE_TIMEOUT_SECS + 1);
        assert!(matches!(
            oracle.latest_round_data(&feed),
            Err(Error::StaleOrInvalidPrice(_))
        ));
    }

    #[test]
    fn test_refreshed_price_accepted_again() {
        let (clock, feeds, oracle, feed) = setup();
        clock.advance(ORACLE_TIMEOUT_SECS + 1);
        assert!(oracle.latest_round_data(&feed).is_err());
        feeds.update_answer(&feed, 1800_0000_0000).unwrap();
        assert_eq!(oracle.latest_round_data(&feed).unwrap().answer, 1800_0000_0000);
    }

    #[test]
    fn test_incomplete_round_rejected() {
        let (clock, feeds, oracle, feed) = setup();
        feeds
            .update_round_data(
                &feed,
                RoundData {
                    round_id: 7,
                    answer: 2000_0000_0000,
                    started_at: clock.now(),
                    updated_at: clock.now(),
                    answered_in_round: 6,
                },
            )
            .unwrap();
        assert!(oracle.latest_round_data(&feed).is_err());
    }

    #[test]
    fn test_non_positive_answer_rejected() {
        let (_, feeds, oracle, feed) = setup();
        feeds.update_answer(&feed, 0).unwrap();
        assert!(oracle.latest_round_data(&feed).is_err());
    }
}
