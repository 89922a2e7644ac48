//! Protocol module - engine orchestration.
//!
//! This module provides the DSC engine that applies every collateral and debt
//! operation atomically, together with its events, liquidation logic and the
//! staging machinery behind its all-or-nothing guarantee.

pub mod engine;
pub mod events;
pub mod guard;
pub mod liquidation;
pub mod transaction;

pub use engine::*;
pub use events::*;
pub use guard::*;
pub use liquidation::*;
pub use transaction::*;
