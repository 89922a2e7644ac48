//! Liquidation of undercollateralized positions.
//!
//! This module handles:
//! - Detection of liquidatable positions
//! - Quoting the collateral a liquidator receives for covering debt
//! - Executing a liquidation against the engine

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::protocol::engine::DscEngine;
use crate::utils::address::{Address, AssetId};
use crate::utils::constants::MIN_HEALTH_FACTOR;
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION QUOTE
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral seized for covering a given amount of debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationQuote {
    /// Debt the liquidator repays (1e18 scale)
    pub debt_to_cover: u128,
    /// Collateral worth exactly `debt_to_cover`
    pub token_amount: u128,
    /// Extra collateral awarded to the liquidator
    pub bonus: u128,
    /// Collateral moved to the liquidator
    pub total_seized: u128,
}

impl LiquidationQuote {
    /// Quote at a normalized price
    pub fn compute(debt_to_cover: u128, price: u128) -> Result<Self> {
        let token_amount = token_amount_from_usd(debt_to_cover, price)?;
        let bonus = liquidation_bonus(token_amount);
        let total_seized = safe_add(token_amount, bonus)?;
        Ok(Self {
            debt_to_cover,
            token_amount,
            bonus,
            total_seized,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION
// ═══════════════════════════════════════════════════════════════════════════════

impl DscEngine {
    /// Cover `debt_to_cover` of `target`'s debt and seize its collateral plus a bonus
    ///
    /// The liquidator pays with its own synthetic asset (the engine must be
    /// approved to pull it) and receives the seized collateral. Fails with
    /// `HealthFactorOk` if the target is not below the minimum health factor,
    /// `BurnExceedsBalance` if `debt_to_cover` exceeds its debt and
    /// `InsufficientCollateral` if the seizure exceeds its deposit.
    pub fn liquidate(
        &self,
        liquidator: Address,
        collateral_asset: AssetId,
        target: Address,
        debt_to_cover: u128,
    ) -> Result<()> {
        self.execute("liquidate", |tx| {
            if debt_to_cover == 0 {
                return Err(Error::ZeroAmount);
            }
            self.registry().ensure_allowed(&collateral_asset)?;

            let starting = self.staged_health_factor(tx, &target)?;
            if starting >= MIN_HEALTH_FACTOR {
                return Err(Error::HealthFactorOk);
            }

            let quote = self.liquidation_quote(&collateral_asset, debt_to_cover)?;
            self.stage_redeem(tx, target, liquidator, collateral_asset, quote.total_seized)?;
            self.stage_burn(tx, target, liquidator, debt_to_cover)?;

            let ending = self.staged_health_factor(tx, &target)?;
            if ending <= starting {
                return Err(Error::HealthFactorNotImproved);
            }
            self.ensure_healthy(tx, &liquidator)?;

            info!(
                target = %target.short(),
                liquidator = %liquidator.short(),
                debt_covered = debt_to_cover,
                collateral_seized = quote.total_seized,
                starting = %format_health_factor(starting),
                ending = %format_health_factor(ending),
                "liquidation staged"
            );
            Ok(())
        })
    }

    /// Collateral of `asset` a liquidator would receive for `debt_to_cover`
    pub fn liquidation_quote(&self, asset: &AssetId, debt_to_cover: u128) -> Result<LiquidationQuote> {
        LiquidationQuote::compute(debt_to_cover, self.normalized_price(asset)?)
    }

    /// Check if `user` is below the minimum health factor
    pub fn is_liquidatable(&self, user: &Address) -> Result<bool> {
        Ok(self.health_factor(user)? < MIN_HEALTH_FACTOR)
    }

    /// Users below the minimum health factor, most at risk first
    pub fn liquidatable_accounts(&self) -> Result<Vec<(Address, u128)>> {
        let users: Vec<Address> = self
            .state()?
            .accounts
            .iter()
            .filter(|(_, account)| account.debt_minted() > 0)
            .map(|(user, _)| *user)
            .collect();

        let mut at_risk = Vec::new();
        for user in users {
            let health_factor = self.health_factor(&user)?;
            if health_factor < MIN_HEALTH_FACTOR {
                at_risk.push((user, health_factor));
            }
        }
        at_risk.sort_by_key(|(_, health_factor)| *health_factor);
        Ok(at_risk)
    }
}
