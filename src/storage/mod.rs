//! Storage module for engine persistence.
//!
//! Engines are persisted as bincode snapshots of their committed state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dsc::storage::EngineSnapshot;
//!
//! engine.snapshot()?.save(Path::new("engine.snapshot"))?;
//! let engine = EngineSnapshot::load(Path::new("engine.snapshot"))?.restore(collaborators)?;
//! ```

pub mod snapshot;

pub use snapshot::*;
