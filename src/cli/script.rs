//! Simulation scripts.
//!
//! A script is a JSON document listing the steps to replay against a fresh
//! in-memory engine:
//!
//! ```json
//! {
//!   "steps": [
//!     { "op": "fund", "user": "alice", "asset": "WETH", "amount": "10" },
//!     { "op": "deposit_and_mint", "user": "alice", "asset": "WETH",
//!       "collateral": "10", "mint": "100" },
//!     { "op": "set_price", "asset": "WETH", "price": "18" },
//!     { "op": "liquidate", "liquidator": "bob", "asset": "WETH",
//!       "target": "alice", "debt": "100" }
//!   ]
//! }
//! ```
//!
//! Users are labels (or `0x` addresses), assets are configured symbols and
//! amounts are decimal strings in whole tokens.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// An ordered list of steps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Deserialization(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if the script has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A single simulation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Publish a new USD price for a collateral asset
    SetPrice {
        /// Collateral symbol
        asset: String,
        /// USD price, e.g. "1850.5"
        price: String,
    },
    /// Move the simulation clock forward
    AdvanceTime {
        /// Seconds to advance
        secs: u64,
    },
    /// Mint collateral tokens to a user out of thin air
    Fund {
        /// Receiving user
        user: String,
        /// Collateral symbol
        asset: String,
        /// Token amount
        amount: String,
    },
    /// Deposit collateral
    Deposit {
        /// Depositing user
        user: String,
        /// Collateral symbol
        asset: String,
        /// Token amount
        amount: String,
    },
    /// Mint the synthetic asset
    Mint {
        /// Minting user
        user: String,
        /// Synthetic amount
        amount: String,
    },
    /// Deposit collateral and mint in one operation
    DepositAndMint {
        /// Acting user
        user: String,
        /// Collateral symbol
        asset: String,
        /// Collateral amount
        collateral: String,
        /// Synthetic amount
        mint: String,
    },
    /// Withdraw collateral
    Redeem {
        /// Redeeming user
        user: String,
        /// Collateral symbol
        asset: String,
        /// Token amount
        amount: String,
    },
    /// Repay debt
    Burn {
        /// Repaying user
        user: String,
        /// Synthetic amount
        amount: String,
    },
    /// Repay debt and withdraw collateral in one operation
    RedeemForDsc {
        /// Acting user
        user: String,
        /// Collateral symbol
        asset: String,
        /// Collateral amount
        collateral: String,
        /// Synthetic amount
        burn: String,
    },
    /// Liquidate an undercollateralized user
    Liquidate {
        /// User covering the debt
        liquidator: String,
        /// Collateral symbol to seize
        asset: String,
        /// User being liquidated
        target: String,
        /// Debt to cover
        debt: String,
    },
    /// Transfer the synthetic asset between users
    Transfer {
        /// Sender
        from: String,
        /// Recipient
        to: String,
        /// Synthetic amount
        amount: String,
    },
}

impl Step {
    /// Operation name as written in scripts
    pub fn op(&self) -> &'static str {
        match self {
            Step::SetPrice { .. } => "set_price",
            Step::AdvanceTime { .. } => "advance_time",
            Step::Fund { .. } => "fund",
            Step::Deposit { .. } => "deposit",
            Step::Mint { .. } => "mint",
            Step::DepositAndMint { .. } => "deposit_and_mint",
            Step::Redeem { .. } => "redeem",
            Step::Burn { .. } => "burn",
            Step::RedeemForDsc { .. } => "redeem_for_dsc",
            Step::Liquidate { .. } => "liquidate",
            Step::Transfer { .. } => "transfer",
        }
    }

    /// Users the step acts on
    pub fn users(&self) -> Vec<&str> {
        match self {
            Step::SetPrice { .. } | Step::AdvanceTime { .. } => Vec::new(),
            Step::Fund { user, .. }
            | Step::Deposit { user, .. }
            | Step::Mint { user, .. }
            | Step::DepositAndMint { user, .. }
            | Step::Redeem { user, .. }
            | Step::Burn { user, .. }
            | Step::RedeemForDsc { user, .. } => vec![user.as_str()],
            Step::Liquidate {
                liquidator, target, ..
            } => vec![liquidator.as_str(), target.as_str()],
            Step::Transfer { from, to, .. } => vec![from.as_str(), to.as_str()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script() {
        let script = Script::from_json(
            r#"{"steps": [
                {"op": "fund", "user": "alice", "asset": "WETH", "amount": "10"},
                {"op": "advance_time", "secs": 60},
                {"op": "liquidate", "liquidator": "bob", "asset": "WETH", "target": "alice", "debt": "100"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(script.len(), 3);
        assert_eq!(script.steps[1], Step::AdvanceTime { secs: 60 });
        assert_eq!(script.steps[2].op(), "liquidate");
        assert_eq!(script.steps[2].users(), vec!["bob", "alice"]);
    }

    #[test]
    fn test_unknown_op_rejected() {
        let result = Script::from_json(r#"{"steps": [{"op": "flash_loan", "amount": "1"}]}"#);
        assert!(matches!(result, Err(Error::Deserialization(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(&path, r#"{"steps": [{"op": "mint", "user": "alice", "amount": "1"}]}"#)
            .unwrap();

        let script = Script::load(&path).unwrap();
        assert_eq!(script.steps[0].op(), "mint");
        assert!(Script::load(&dir.path().join("missing.json")).is_err());
    }
}
