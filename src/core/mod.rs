//! Core ledgers of the DSC engine.
//!
//! This module contains the fundamental building blocks:
//! - Per-user collateral and debt accounts
//! - The registry of allowed collateral
//! - The synthetic asset and collateral token ledgers
//! - Engine configuration

pub mod account;
pub mod collateral;
pub mod config;
pub mod registry;
pub mod token;

pub use account::*;
pub use collateral::*;
pub use config::*;
pub use registry::*;
pub use token::*;
