//! DSC Command Line Interface.
//!
//! Provides operator tools for inspecting and simulating the engine:
//! - JSON simulation scripts and the in-memory [`Simulator`] replaying them
//! - Text and JSON rendering of results

pub mod output;
pub mod script;
pub mod simulator;

pub use output::*;
pub use script::*;
pub use simulator::*;
