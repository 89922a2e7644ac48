//! Oracle module for price feeds.
//!
//! This module provides price feed functionality:
//! - The [`PriceOracle`] interface the engine reads USD prices through
//! - In-memory aggregators for tests and simulations
//! - Staleness checking of every reading
//! - Time sources
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dsc::oracle::{FeedRegistry, StaleCheckedOracle, SystemClock};
//!
//! let feeds = Arc::new(FeedRegistry::new(SystemClock));
//! feeds.add_feed(eth_usd, 8, 2000_0000_0000)?;
//! let oracle = StaleCheckedOracle::new(feeds.clone(), SystemClock);
//! ```

pub mod clock;
pub mod price_feed;
pub mod stale;

pub use clock::*;
pub use price_feed::*;
pub use stale::*;
