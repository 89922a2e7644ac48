//! Utility modules for the DSC engine.
//!
//! This module contains shared utilities:
//! - Identifiers
//! - Fixed-point arithmetic
//! - Constants

pub mod address;
pub mod constants;
pub mod math;

pub use address::*;
pub use constants::*;
pub use math::*;
