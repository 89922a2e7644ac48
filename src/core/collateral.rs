//! Collateral token ledgers.
//!
//! The engine moves collateral between users and its custody account through
//! the [`CollateralLedger`] interface. [`InMemoryTokenLedger`] holds balances
//! for any number of assets and can be told to refuse transfers of an asset,
//! which is how collaborator failures are exercised.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetId};
use crate::utils::math::safe_add;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL LEDGER INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Token ledgers of the collateral assets, as seen by the engine
pub trait CollateralLedger: Send + Sync {
    /// Move `amount` of `asset` from `owner` to `recipient` using `spender`'s allowance
    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &Address,
        owner: &Address,
        recipient: &Address,
        amount: u128,
    ) -> bool;

    /// Move `amount` of `asset` from `from` to `to`
    fn transfer(&self, asset: &AssetId, from: &Address, to: &Address, amount: u128) -> bool;

    /// Balance of `owner` in `asset`
    fn balance_of(&self, asset: &AssetId, owner: &Address) -> u128;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Balances and allowances of every asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Balances by asset, then holder
    balances: BTreeMap<AssetId, BTreeMap<Address, u128>>,
    /// Allowances by asset, then owner, then spender
    allowances: BTreeMap<AssetId, BTreeMap<Address, BTreeMap<Address, u128>>>,
    /// Assets whose transfers are refused
    failing: BTreeSet<AssetId>,
}

impl LedgerState {
    fn balance_of(&self, asset: &AssetId, owner: &Address) -> u128 {
        self.balances
            .get(asset)
            .and_then(|holders| holders.get(owner))
            .copied()
            .unwrap_or(0)
    }

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> u128 {
        self.allowances
            .get(asset)
            .and_then(|owners| owners.get(owner))
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn set_balance(&mut self, asset: AssetId, holder: Address, balance: u128) {
        let holders = self.balances.entry(asset).or_default();
        if balance == 0 {
            holders.remove(&holder);
        } else {
            holders.insert(holder, balance);
        }
        if holders.is_empty() {
            self.balances.remove(&asset);
        }
    }

    fn set_allowance(&mut self, asset: AssetId, owner: Address, spender: Address, amount: u128) {
        let spenders = self
            .allowances
            .entry(asset)
            .or_default()
            .entry(owner)
            .or_default();
        spenders.insert(spender, amount);
    }

    fn transfer(&mut self, asset: AssetId, from: Address, to: Address, amount: u128) -> Result<()> {
        if self.failing.contains(&asset) {
            return Err(Error::Unauthorized(format!("transfers of {} are disabled", asset)));
        }
        if amount == 0 {
            return Err(Error::ZeroAmount);
        }
        if to.is_zero() {
            return Err(Error::InvalidParameter {
                name: "to".into(),
                reason: "cannot transfer to the null address".into(),
            });
        }

        let from_balance = self.balance_of(&asset, &from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: from_balance,
            });
        }
        if from == to {
            return Ok(());
        }

        let to_balance = safe_add(self.balance_of(&asset, &to), amount)?;
        self.set_balance(asset, from, from_balance - amount);
        self.set_balance(asset, to, to_balance);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        asset: AssetId,
        spender: Address,
        owner: Address,
        recipient: Address,
        amount: u128,
    ) -> Result<()> {
        if spender == owner {
            return self.transfer(asset, owner, recipient, amount);
        }

        let allowance = self.allowance(&asset, &owner, &spender);
        if allowance < amount {
            return Err(Error::InsufficientAllowance {
                required: amount,
                available: allowance,
            });
        }

        self.transfer(asset, owner, recipient, amount)?;
        if allowance != u128::MAX {
            self.set_allowance(asset, owner, spender, allowance - amount);
        }
        Ok(())
    }
}

/// Shareable multi-asset token ledger
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryTokenLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a ledger from saved state
    pub fn from_state(state: LedgerState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    /// Create `amount` of `asset` out of thin air for `to`
    pub fn mint(&self, asset: &AssetId, to: &Address, amount: u128) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        let balance = safe_add(state.balance_of(asset, to), amount)?;
        state.set_balance(*asset, *to, balance);
        Ok(())
    }

    /// Allow `spender` to move up to `amount` of `owner`'s `asset`
    pub fn approve(
        &self,
        asset: &AssetId,
        owner: &Address,
        spender: &Address,
        amount: u128,
    ) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        state.set_allowance(*asset, *owner, *spender, amount);
        Ok(())
    }

    /// Remaining allowance of `spender` over `owner`'s `asset`
    pub fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> u128 {
        self.state
            .read()
            .map(|s| s.allowance(asset, owner, spender))
            .unwrap_or(0)
    }

    /// Make every transfer of `asset` return `false` until switched back
    pub fn set_failing(&self, asset: &AssetId, failing: bool) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        if failing {
            state.failing.insert(*asset);
        } else {
            state.failing.remove(asset);
        }
        Ok(())
    }

    /// Sum of all balances of `asset`
    pub fn total_supply(&self, asset: &AssetId) -> u128 {
        self.state
            .read()
            .map(|s| {
                s.balances
                    .get(asset)
                    .map(|holders| holders.values().fold(0u128, |acc, b| acc.saturating_add(*b)))
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }

    /// Copy of the current state
    pub fn state(&self) -> Result<LedgerState> {
        Ok(self.state.read().map_err(|_| Error::Lock)?.clone())
    }

    fn apply(&self, asset: &AssetId, f: impl FnOnce(&mut LedgerState) -> Result<()>) -> bool {
        let result = self
            .state
            .write()
            .map_err(|_| Error::Lock)
            .and_then(|mut state| f(&mut state));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%asset, "collateral transfer rejected: {}", e);
                false
            }
        }
    }
}

impl CollateralLedger for InMemoryTokenLedger {
    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &Address,
        owner: &Address,
        recipient: &Address,
        amount: u128,
    ) -> bool {
        self.apply(asset, |s| {
            s.transfer_from(*asset, *spender, *owner, *recipient, amount)
        })
    }

    fn transfer(&self, asset: &AssetId, from: &Address, to: &Address, amount: u128) -> bool {
        self.apply(asset, |s| s.transfer(*asset, *from, *to, amount))
    }

    fn balance_of(&self, asset: &AssetId, owner: &Address) -> u128 {
        self.state
            .read()
            .map(|s| s.balance_of(asset, owner))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn engine() -> Address {
        Address::from_label("engine")
    }

    #[test]
    fn test_mint_and_transfer() {
        let ledger = InMemoryTokenLedger::new();
        ledger.mint(&weth(), &alice(), 100).unwrap();

        assert!(ledger.transfer(&weth(), &alice(), &engine(), 40));
        assert_eq!(ledger.balance_of(&weth(), &alice()), 60);
        assert_eq!(ledger.balance_of(&weth(), &engine()), 40);
        assert_eq!(ledger.total_supply(&weth()), 100);

        assert!(!ledger.transfer(&weth(), &alice(), &engine(), 61));
        assert_eq!(ledger.balance_of(&weth(), &alice()), 60);
    }

    #[test]
    fn test_transfer_from_requires_allowance() {
        let ledger = InMemoryTokenLedger::new();
        ledger.mint(&weth(), &alice(), 100).unwrap();

        assert!(!ledger.transfer_from(&weth(), &engine(), &alice(), &engine(), 10));

        ledger.approve(&weth(), &alice(), &engine(), 25).unwrap();
        assert!(ledger.transfer_from(&weth(), &engine(), &alice(), &engine(), 10));
        assert_eq!(ledger.allowance(&weth(), &alice(), &engine()), 15);
        assert_eq!(ledger.balance_of(&weth(), &engine()), 10);
    }

    #[test]
    fn test_failing_asset() {
        let ledger = InMemoryTokenLedger::new();
        ledger.mint(&weth(), &alice(), 100).unwrap();
        ledger.set_failing(&weth(), true).unwrap();

        assert!(!ledger.transfer(&weth(), &alice(), &engine(), 1));
        assert_eq!(ledger.balance_of(&weth(), &alice()), 100);

        ledger.set_failing(&weth(), false).unwrap();
        assert!(ledger.transfer(&weth(), &alice(), &engine(), 1));
    }

    #[test]
    fn test_state_roundtrip() {
        let ledger = InMemoryTokenLedger::new();
        ledger.mint(&weth(), &alice(), 7).unwrap();
        let restored = InMemoryTokenLedger::from_state(ledger.state().unwrap());
        assert_eq!(restored.balance_of(&weth(), &alice()), 7);
    }
}
