//! # DSC Engine
//!
//! An over-collateralized synthetic USD engine. Users lock approved
//! collateral assets, mint a USD-pegged synthetic asset against them, and are
//! liquidated by third parties when their collateral value falls too far.
//!
//! ## Architecture
//!
//! The crate consists of several modules:
//!
//! - **Core**: Accounts, the collateral registry, token ledgers and configuration
//! - **Oracle**: USD price feeds with staleness checking
//! - **Protocol**: The engine, its events, atomic staging and liquidation
//! - **Storage**: Engine snapshots
//! - **CLI**: Scripted simulations and output formatting
//!
//! ## Design Principles
//!
//! - **Atomic**: Every operation commits in full or leaves no trace
//! - **Solvent**: No operation leaves its caller below the minimum health factor
//! - **Exact**: 1e18 fixed-point arithmetic with 256-bit intermediates
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsc::prelude::*;
//!
//! let engine = DscEngine::from_config(&config, collaborators)?;
//! engine.deposit_collateral_and_mint_dsc(alice, weth, 10 * PRECISION, 100 * PRECISION)?;
//! assert!(engine.health_factor(&alice)? >= MIN_HEALTH_FACTOR);
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod oracle;
pub mod protocol;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        account::{Account, AccountStore},
        collateral::{CollateralLedger, InMemoryTokenLedger},
        config::{CollateralConfig, EngineConfig},
        token::{StableToken, SyntheticAsset},
    };
    pub use crate::error::{Error, Result};
    pub use crate::oracle::{
        clock::{Clock, ManualClock, SystemClock},
        price_feed::{FeedRegistry, PriceOracle, RoundData},
        stale::StaleCheckedOracle,
    };
    pub use crate::protocol::{
        engine::{Collaborators, DscEngine},
        events::EngineEvent,
        liquidation::LiquidationQuote,
    };
    pub use crate::storage::EngineSnapshot;
    pub use crate::utils::{
        address::{Address, AssetId, FeedId},
        constants::{MIN_HEALTH_FACTOR, PRECISION},
    };
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "DSC";
