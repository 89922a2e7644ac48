//! Engine snapshots.
//!
//! A snapshot captures an engine's identity, collateral registry and
//! committed state in a compact bincode encoding, so an engine can be saved
//! to disk and rebuilt later against the same collaborators.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{Error, Result};
use crate::protocol::engine::{Collaborators, DscEngine, EngineState};
use crate::utils::address::{Address, AssetId, FeedId};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Point-in-time copy of an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Format version (for migrations)
    pub version: u32,
    /// Unix timestamp the snapshot was taken
    pub taken_at: i64,
    /// Custody account of the engine
    pub engine: Address,
    /// Contract identifier of the synthetic asset
    pub synthetic_asset: Address,
    /// Allowed collateral in registration order
    pub assets: Vec<AssetId>,
    /// Price feed of each asset
    pub feeds: Vec<FeedId>,
    /// Committed accounts and events
    pub state: EngineState,
}

impl EngineSnapshot {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self =
            bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::Deserialization(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        Ok(snapshot)
    }

    /// Write to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)
            .map_err(|e| Error::Serialization(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Read from a file
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::Deserialization(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_bytes(&bytes)
    }

    /// Hash of the committed state
    pub fn state_hash(&self) -> [u8; 32] {
        let data = bincode::serialize(&self.state).unwrap_or_default();
        Sha256::digest(&data).into()
    }

    /// Verify account totals match the individual accounts
    pub fn verify_invariants(&self) -> Result<()> {
        if !self.state.accounts.verify_invariant() {
            return Err(Error::Deserialization(
                "account totals do not match accounts".into(),
            ));
        }
        Ok(())
    }

    /// Rebuild an engine from this snapshot
    pub fn restore(self, collaborators: Collaborators) -> Result<DscEngine> {
        self.verify_invariants()?;
        let engine = DscEngine::new(
            self.engine,
            self.assets,
            self.feeds,
            self.synthetic_asset,
            collaborators,
        )?;
        engine.replace_state(self.state)?;
        tracing::info!(engine = %engine.address().short(), "engine restored from snapshot");
        Ok(engine)
    }
}

impl DscEngine {
    /// Capture the engine's committed state
    pub fn snapshot(&self) -> Result<EngineSnapshot> {
        Ok(EngineSnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: chrono::Utc::now().timestamp(),
            engine: self.address(),
            synthetic_asset: self.synthetic_asset(),
            assets: self.registry().assets().to_vec(),
            feeds: self
                .registry()
                .assets()
                .iter()
                .filter_map(|asset| self.registry().feed_of(asset))
                .collect(),
            state: self.state()?,
        })
    }
}
