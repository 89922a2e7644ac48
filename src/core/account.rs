//! Per-user collateral and debt bookkeeping.
//!
//! This module manages the engine's account ledger:
//! - Collateral balances per registered asset
//! - Synthetic debt minted against the collateral
//! - Aggregate custody and debt totals

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::utils::address::{Address, AssetId};
use crate::utils::math::safe_add;

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral and debt position of a single user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Deposited collateral per asset (zero balances are not stored)
    collateral: BTreeMap<AssetId, u128>,
    /// Synthetic asset minted against the collateral
    debt_minted: u128,
}

impl Account {
    /// Create an empty account
    pub fn new() -> Self {
        Self::default()
    }

    /// Deposited balance of `asset`
    pub fn collateral_of(&self, asset: &AssetId) -> u128 {
        self.collateral.get(asset).copied().unwrap_or(0)
    }

    /// All non-zero collateral balances
    pub fn collateral(&self) -> &BTreeMap<AssetId, u128> {
        &self.collateral
    }

    /// Outstanding debt
    pub fn debt_minted(&self) -> u128 {
        self.debt_minted
    }

    /// Add collateral
    pub fn credit_collateral(&mut self, asset: AssetId, amount: u128) -> Result<()> {
        let balance = safe_add(self.collateral_of(&asset), amount)?;
        if balance > 0 {
            self.collateral.insert(asset, balance);
        }
        Ok(())
    }

    /// Remove collateral, failing if the balance is too low
    pub fn debit_collateral(&mut self, asset: AssetId, amount: u128) -> Result<()> {
        let available = self.collateral_of(&asset);
        let balance = available
            .checked_sub(amount)
            .ok_or(Error::InsufficientCollateral {
                requested: amount,
                available,
            })?;

        if balance == 0 {
            self.collateral.remove(&asset);
        } else {
            self.collateral.insert(asset, balance);
        }
        Ok(())
    }

    /// Record newly minted debt
    pub fn add_debt(&mut self, amount: u128) -> Result<()> {
        self.debt_minted = safe_add(self.debt_minted, amount)?;
        Ok(())
    }

    /// Reduce debt, failing if more than the outstanding amount is repaid
    pub fn repay_debt(&mut self, amount: u128) -> Result<()> {
        self.debt_minted =
            self.debt_minted
                .checked_sub(amount)
                .ok_or(Error::BurnExceedsBalance {
                    requested: amount,
                    debt: self.debt_minted,
                })?;
        Ok(())
    }

    /// Check if the account holds nothing
    pub fn is_empty(&self) -> bool {
        self.debt_minted == 0 && self.collateral.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Keyed store of all accounts with running totals
///
/// Empty accounts are pruned, so a user who withdrew everything is
/// indistinguishable from one who never interacted with the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStore {
    /// Accounts by user
    accounts: BTreeMap<Address, Account>,
    /// Total deposited collateral per asset
    total_collateral: BTreeMap<AssetId, u128>,
    /// Total outstanding debt
    total_debt: u128,
}

impl AccountStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of a user's account (empty if unknown)
    pub fn account(&self, user: &Address) -> Account {
        self.accounts.get(user).cloned().unwrap_or_default()
    }

    /// Replace a user's account, keeping totals in step
    pub fn put(&mut self, user: Address, account: Account) -> Result<()> {
        let mut changes = BTreeMap::new();
        changes.insert(user, account);
        self.apply(&changes)
    }

    /// Check that `changes` can be applied without overflowing the totals
    pub fn can_apply(&self, changes: &BTreeMap<Address, Account>) -> Result<()> {
        self.next_totals(changes).map(|_| ())
    }

    /// Replace several accounts at once; either all are applied or none
    pub fn apply(&mut self, changes: &BTreeMap<Address, Account>) -> Result<()> {
        let (totals, total_debt) = self.next_totals(changes)?;

        self.total_collateral = totals;
        self.total_debt = total_debt;
        for (user, account) in changes {
            if account.is_empty() {
                self.accounts.remove(user);
            } else {
                self.accounts.insert(*user, account.clone());
            }
        }
        Ok(())
    }

    fn next_totals(
        &self,
        changes: &BTreeMap<Address, Account>,
    ) -> Result<(BTreeMap<AssetId, u128>, u128)> {
        let mut totals = self.total_collateral.clone();
        let mut total_debt = self.total_debt;

        for (user, account) in changes {
            let empty = Account::new();
            let previous = self.accounts.get(user).unwrap_or(&empty);

            for (asset, amount) in previous.collateral() {
                let entry = totals.entry(*asset).or_insert(0);
                *entry = entry.checked_sub(*amount).ok_or_else(|| Error::Overflow {
                    operation: format!("total collateral of {}", asset),
                })?;
            }
            for (asset, amount) in account.collateral() {
                let entry = totals.entry(*asset).or_insert(0);
                *entry = safe_add(*entry, *amount)?;
            }

            total_debt = total_debt
                .checked_sub(previous.debt_minted())
                .ok_or_else(|| Error::Overflow {
                    operation: "total debt".into(),
                })?;
            total_debt = safe_add(total_debt, account.debt_minted())?;
        }

        totals.retain(|_, amount| *amount > 0);
        Ok((totals, total_debt))
    }

    /// Deposited collateral of `asset` across all users
    pub fn total_collateral(&self, asset: &AssetId) -> u128 {
        self.total_collateral.get(asset).copied().unwrap_or(0)
    }

    /// Outstanding debt across all users
    pub fn total_debt(&self) -> u128 {
        self.total_debt
    }

    /// Number of non-empty accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Check if no account holds anything
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Iterate over non-empty accounts in address order
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.accounts.iter()
    }

    /// Verify running totals match the sum of all accounts
    pub fn verify_invariant(&self) -> bool {
        let mut collateral: BTreeMap<AssetId, u128> = BTreeMap::new();
        let mut debt: u128 = 0;
        for account in self.accounts.values() {
            for (asset, amount) in account.collateral() {
                let entry = collateral.entry(*asset).or_insert(0);
                *entry = entry.saturating_add(*amount);
            }
            debt = debt.saturating_add(account.debt_minted());
        }
        collateral == self.total_collateral && debt == self.total_debt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> AssetId {
        AssetId::from_label("weth")
    }

    fn wbtc() -> AssetId {
        AssetId::from_label("wbtc")
    }

    #[test]
    fn test_credit_and_debit() {
        let mut account = Account::new();
        account.credit_collateral(weth(), 10).unwrap();
        account.debit_collateral(weth(), 4).unwrap();
        assert_eq!(account.collateral_of(&weth()), 6);
        assert_eq!(account.collateral_of(&wbtc()), 0);
    }

    #[test]
    fn test_debit_insufficient() {
        let mut account = Account::new();
        account.credit_collateral(weth(), 1).unwrap();
        assert_eq!(
            account.debit_collateral(weth(), 2),
            Err(Error::InsufficientCollateral {
                requested: 2,
                available: 1
            })
        );
        assert_eq!(account.collateral_of(&weth()), 1);
    }

    #[test]
    fn test_repay_exceeds_debt() {
        let mut account = Account::new();
        account.add_debt(5).unwrap();
        assert_eq!(
            account.repay_debt(6),
            Err(Error::BurnExceedsBalance {
                requested: 6,
                debt: 5
            })
        );
        account.repay_debt(5).unwrap();
        assert!(account.is_empty());
    }

    #[test]
    fn test_zero_balances_not_stored() {
        let mut account = Account::new();
        account.credit_collateral(weth(), 3).unwrap();
        account.debit_collateral(weth(), 3).unwrap();
        assert!(account.collateral().is_empty());
        assert_eq!(account, Account::new());
    }

    #[test]
    fn test_store_prunes_empty_accounts() {
        let user = Address::from_label("alice");
        let mut store = AccountStore::new();

        let mut account = store.account(&user);
        account.credit_collateral(weth(), 7).unwrap();
        store.put(user, account).unwrap();
        assert_eq!(store.len(), 1);

        let mut account = store.account(&user);
        account.debit_collateral(weth(), 7).unwrap();
        store.put(user, account).unwrap();
        assert!(store.is_empty());
        assert_eq!(store, AccountStore::new());
    }

    #[test]
    fn test_store_totals() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut store = AccountStore::new();

        let mut a = Account::new();
        a.credit_collateral(weth(), 10).unwrap();
        a.add_debt(3).unwrap();
        store.put(alice, a).unwrap();

        let mut b = Account::new();
        b.credit_collateral(weth(), 5).unwrap();
        b.credit_collateral(wbtc(), 1).unwrap();
        store.put(bob, b).unwrap();

        let mut a = store.account(&alice);
        a.debit_collateral(weth(), 4).unwrap();
        a.repay_debt(1).unwrap();
        store.put(alice, a).unwrap();

        assert_eq!(store.total_collateral(&weth()), 11);
        assert_eq!(store.total_collateral(&wbtc()), 1);
        assert_eq!(store.total_debt(), 2);
        assert!(store.verify_invariant());
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut store = AccountStore::new();

        let mut a = Account::new();
        a.credit_collateral(weth(), u128::MAX).unwrap();
        store.put(alice, a).unwrap();

        let mut changes = BTreeMap::new();
        let mut b = Account::new();
        b.credit_collateral(weth(), 1).unwrap();
        changes.insert(bob, b);

        assert!(store.can_apply(&changes).is_err());
        assert!(store.apply(&changes).is_err());
        assert_eq!(store.len(), 1);
        assert!(store.verify_invariant());
    }
}
