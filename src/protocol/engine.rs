//! DSC engine - collateral and debt orchestration.
//!
//! The engine owns every user's collateral and debt bookkeeping and drives
//! the external ledgers:
//! - Collateral moves through a [`CollateralLedger`]
//! - The synthetic asset is minted and burned through a [`SyntheticAsset`]
//! - Prices come from a [`PriceOracle`]
//!
//! Every mutating operation is all-or-nothing. It is staged in a
//! [`Transaction`], validated against the staged positions, executed against
//! the collaborators and only then committed. Shared state is never locked
//! while a collaborator runs, so collaborators may call the engine's views.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::core::account::{Account, AccountStore};
use crate::core::collateral::CollateralLedger;
use crate::core::config::EngineConfig;
use crate::core::registry::AssetRegistry;
use crate::core::token::SyntheticAsset;
use crate::error::{Error, Result};
use crate::oracle::price_feed::PriceOracle;
use crate::protocol::events::*;
use crate::protocol::guard::OperationLock;
use crate::protocol::transaction::{Compensation, Effect, Transaction};
use crate::utils::address::{Address, AssetId, FeedId};
use crate::utils::constants::*;
use crate::utils::math::*;

// ═══════════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// External ledgers and price source the engine calls into
#[derive(Clone)]
pub struct Collaborators {
    /// Synthetic asset ledger (the engine's custody address must own it)
    pub synthetic: Arc<dyn SyntheticAsset>,
    /// Collateral token ledgers
    pub collateral: Arc<dyn CollateralLedger>,
    /// USD price feeds
    pub oracle: Arc<dyn PriceOracle>,
}

impl Collaborators {
    /// Bundle collaborators
    pub fn new(
        synthetic: Arc<dyn SyntheticAsset>,
        collateral: Arc<dyn CollateralLedger>,
        oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        Self {
            synthetic,
            collateral,
            oracle,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Committed engine state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Collateral and debt per user
    pub accounts: AccountStore,
    /// Committed events
    pub events: EventLog,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DSC ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Over-collateralized synthetic USD engine
pub struct DscEngine {
    /// Custody account holding deposited collateral
    address: Address,
    /// Allowed collateral and price feeds
    registry: AssetRegistry,
    /// Contract identifier of the synthetic asset
    synthetic_asset: Address,
    /// Synthetic asset ledger
    synthetic: Arc<dyn SyntheticAsset>,
    /// Collateral token ledgers
    collateral: Arc<dyn CollateralLedger>,
    /// Price source
    oracle: Arc<dyn PriceOracle>,
    /// Committed state
    state: RwLock<EngineState>,
    /// Serializes mutating operations
    lock: OperationLock,
}

impl DscEngine {
    /// Create an engine
    ///
    /// # Arguments
    /// * `address` - Custody account of the engine
    /// * `assets` - Allowed collateral assets
    /// * `feeds` - USD price feed of each asset, in the same order
    /// * `synthetic_asset` - Contract identifier of the synthetic asset
    /// * `collaborators` - Ledgers and oracle to call into
    pub fn new(
        address: Address,
        assets: Vec<AssetId>,
        feeds: Vec<FeedId>,
        synthetic_asset: Address,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let registry = AssetRegistry::new(assets, feeds)?;
        if synthetic_asset.is_zero() {
            return Err(Error::ConfigurationError(
                "synthetic asset address cannot be null".into(),
            ));
        }
        if address.is_zero() {
            return Err(Error::ConfigurationError(
                "engine address cannot be null".into(),
            ));
        }

        info!(
            engine = %address.short(),
            synthetic = %synthetic_asset.short(),
            assets = registry.len(),
            "DSC engine created"
        );

        Ok(Self {
            address,
            registry,
            synthetic_asset,
            synthetic: collaborators.synthetic,
            collateral: collaborators.collateral,
            oracle: collaborators.oracle,
            state: RwLock::new(EngineState::default()),
            lock: OperationLock::new(),
        })
    }

    /// Create an engine from a validated configuration
    pub fn from_config(config: &EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.engine,
            config.assets(),
            config.feeds(),
            config.synthetic_asset,
            collaborators,
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLATERAL OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deposit `amount` of `asset` from `caller` into custody
    pub fn deposit_collateral(&self, caller: Address, asset: AssetId, amount: u128) -> Result<()> {
        self.execute("deposit_collateral", |tx| {
            self.stage_deposit(tx, caller, asset, amount)
        })
    }

    /// Return `amount` of `asset` from custody to `caller`
    pub fn redeem_collateral(&self, caller: Address, asset: AssetId, amount: u128) -> Result<()> {
        self.execute("redeem_collateral", |tx| {
            self.stage_redeem(tx, caller, caller, asset, amount)?;
            self.ensure_healthy(tx, &caller)
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEBT OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Mint `amount` of the synthetic asset to `caller` against its collateral
    pub fn mint_dsc(&self, caller: Address, amount: u128) -> Result<()> {
        self.execute("mint_dsc", |tx| self.stage_mint(tx, caller, amount))
    }

    /// Repay `amount` of `caller`'s debt with its own synthetic asset
    pub fn burn_dsc(&self, caller: Address, amount: u128) -> Result<()> {
        self.execute("burn_dsc", |tx| self.stage_burn(tx, caller, caller, amount))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COMPOSITE OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deposit collateral and mint against it in one step
    pub fn deposit_collateral_and_mint_dsc(
        &self,
        caller: Address,
        asset: AssetId,
        collateral_amount: u128,
        mint_amount: u128,
    ) -> Result<()> {
        self.execute("deposit_collateral_and_mint_dsc", |tx| {
            self.stage_deposit(tx, caller, asset, collateral_amount)?;
            self.stage_mint(tx, caller, mint_amount)
        })
    }

    /// Repay debt and withdraw collateral in one step
    pub fn redeem_collateral_for_dsc(
        &self,
        caller: Address,
        asset: AssetId,
        collateral_amount: u128,
        burn_amount: u128,
    ) -> Result<()> {
        self.execute("redeem_collateral_for_dsc", |tx| {
            self.stage_burn(tx, caller, caller, burn_amount)?;
            self.stage_redeem(tx, caller, caller, asset, collateral_amount)?;
            self.ensure_healthy(tx, &caller)
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Health factor of `user` (1e18 scale, `u128::MAX` without debt)
    pub fn health_factor(&self, user: &Address) -> Result<u128> {
        let account = self.read_state()?.accounts.account(user);
        self.health_factor_of(&account)
    }

    /// Outstanding debt and total collateral value of `user`
    pub fn account_information(&self, user: &Address) -> Result<(u128, u128)> {
        let account = self.read_state()?.accounts.account(user);
        Ok((account.debt_minted(), self.collateral_value_of(&account)?))
    }

    /// Total USD value (1e18 scale) of `user`'s collateral
    pub fn account_collateral_value(&self, user: &Address) -> Result<u128> {
        let account = self.read_state()?.accounts.account(user);
        self.collateral_value_of(&account)
    }

    /// USD value (1e18 scale) of `amount` units of `asset`
    pub fn usd_value(&self, asset: &AssetId, amount: u128) -> Result<u128> {
        usd_value(self.normalized_price(asset)?, amount)
    }

    /// Units of `asset` worth `usd_amount` (1e18 scale)
    pub fn token_amount_from_usd(&self, asset: &AssetId, usd_amount: u128) -> Result<u128> {
        token_amount_from_usd(usd_amount, self.normalized_price(asset)?)
    }

    /// Price of one unit of `asset` in USD, lifted to 1e18 scale
    pub fn normalized_price(&self, asset: &AssetId) -> Result<u128> {
        let feed = self.registry.ensure_allowed(asset)?;
        let round = self
            .oracle
            .latest_round_data(&feed)
            .map_err(price_error)?;
        let decimals = self.oracle.decimals(&feed).map_err(price_error)?;
        normalize_price(round.answer, decimals)
    }

    /// Deposited balance of `asset` for `user`
    pub fn collateral_balance_of(&self, user: &Address, asset: &AssetId) -> Result<u128> {
        Ok(self.read_state()?.accounts.account(user).collateral_of(asset))
    }

    /// Outstanding debt of `user`
    pub fn debt_of(&self, user: &Address) -> Result<u128> {
        Ok(self.read_state()?.accounts.account(user).debt_minted())
    }

    /// Full position of `user`
    pub fn account(&self, user: &Address) -> Result<Account> {
        Ok(self.read_state()?.accounts.account(user))
    }

    /// Deposited collateral of `asset` across all users
    pub fn total_collateral(&self, asset: &AssetId) -> Result<u128> {
        Ok(self.read_state()?.accounts.total_collateral(asset))
    }

    /// Outstanding debt across all users
    pub fn total_debt(&self) -> Result<u128> {
        Ok(self.read_state()?.accounts.total_debt())
    }

    /// Allowed collateral assets in registration order
    pub fn collateral_tokens(&self) -> &[AssetId] {
        self.registry.assets()
    }

    /// Price feed of `asset`, if it is allowed collateral
    pub fn collateral_token_price_feed(&self, asset: &AssetId) -> Option<FeedId> {
        self.registry.feed_of(asset)
    }

    /// Contract identifier of the synthetic asset
    pub fn synthetic_asset(&self) -> Address {
        self.synthetic_asset
    }

    /// Custody account of the engine
    pub fn address(&self) -> Address {
        self.address
    }

    /// Registry of allowed collateral
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Health factor for a given debt and collateral value
    pub fn calculate_health_factor(debt_minted: u128, collateral_value_usd: u128) -> u128 {
        calculate_health_factor(debt_minted, collateral_value_usd)
    }

    /// Fixed-point scale
    pub fn precision(&self) -> u128 {
        PRECISION
    }

    /// Scale lifting 8-decimal feed answers to 1e18
    pub fn additional_feed_precision(&self) -> u128 {
        ADDITIONAL_FEED_PRECISION
    }

    /// Share of collateral value counted towards the health factor
    pub fn liquidation_threshold(&self) -> u128 {
        LIQUIDATION_THRESHOLD
    }

    /// Liquidator bonus in percent
    pub fn liquidation_bonus(&self) -> u128 {
        LIQUIDATION_BONUS
    }

    /// Denominator of threshold and bonus
    pub fn liquidation_precision(&self) -> u128 {
        LIQUIDATION_PRECISION
    }

    /// Lowest health factor a position may be left with
    pub fn min_health_factor(&self) -> u128 {
        MIN_HEALTH_FACTOR
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS AND STATE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Committed events
    pub fn events(&self) -> Result<Vec<EngineEvent>> {
        Ok(self.read_state()?.events.events().to_vec())
    }

    /// Take committed events (clears the log)
    pub fn take_events(&self) -> Result<Vec<EngineEvent>> {
        Ok(self.write_state()?.events.take_events())
    }

    /// Copy of the committed state
    pub fn state(&self) -> Result<EngineState> {
        Ok(self.read_state()?.clone())
    }

    /// Replace the committed state
    pub(crate) fn replace_state(&self, state: EngineState) -> Result<()> {
        let _guard = self.lock.acquire()?;
        *self.write_state()? = state;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STAGING
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn stage_account<'t>(
        &self,
        tx: &'t mut Transaction,
        user: Address,
    ) -> Result<&'t mut Account> {
        tx.stage_with(user, || Ok(self.read_state()?.accounts.account(&user)))
    }

    pub(crate) fn staged_account(&self, tx: &Transaction, user: &Address) -> Result<Account> {
        match tx.account(user) {
            Some(account) => Ok(account.clone()),
            None => Ok(self.read_state()?.accounts.account(user)),
        }
    }

    fn stage_deposit(
        &self,
        tx: &mut Transaction,
        user: Address,
        asset: AssetId,
        amount: u128,
    ) -> Result<()> {
        ensure_non_zero(amount)?;
        self.registry.ensure_allowed(&asset)?;

        self.stage_account(tx, user)?.credit_collateral(asset, amount)?;
        tx.emit(EngineEvent::CollateralDeposited(CollateralDepositedEvent {
            user,
            asset,
            amount,
        }));
        tx.push_effect(Effect::PullCollateral {
            asset,
            from: user,
            amount,
        });
        Ok(())
    }

    pub(crate) fn stage_redeem(
        &self,
        tx: &mut Transaction,
        from: Address,
        to: Address,
        asset: AssetId,
        amount: u128,
    ) -> Result<()> {
        ensure_non_zero(amount)?;
        self.registry.ensure_allowed(&asset)?;

        self.stage_account(tx, from)?.debit_collateral(asset, amount)?;
        tx.emit(EngineEvent::CollateralRedeemed(CollateralRedeemedEvent {
            from,
            to,
            asset,
            amount,
        }));
        tx.push_effect(Effect::PushCollateral { asset, to, amount });
        Ok(())
    }

    fn stage_mint(&self, tx: &mut Transaction, user: Address, amount: u128) -> Result<()> {
        ensure_non_zero(amount)?;

        self.stage_account(tx, user)?.add_debt(amount)?;
        self.ensure_healthy(tx, &user)?;
        tx.emit(EngineEvent::DebtMinted(DebtMintedEvent { user, amount }));
        tx.push_effect(Effect::MintSynthetic { to: user, amount });
        Ok(())
    }

    pub(crate) fn stage_burn(
        &self,
        tx: &mut Transaction,
        on_behalf_of: Address,
        payer: Address,
        amount: u128,
    ) -> Result<()> {
        ensure_non_zero(amount)?;

        self.stage_account(tx, on_behalf_of)?.repay_debt(amount)?;
        tx.emit(EngineEvent::DebtBurned(DebtBurnedEvent {
            on_behalf_of,
            payer,
            amount,
        }));
        tx.push_effect(Effect::PullSynthetic {
            from: payer,
            amount,
        });
        tx.push_effect(Effect::BurnSynthetic { payer, amount });
        Ok(())
    }

    /// Health factor of `user`'s staged position
    pub(crate) fn staged_health_factor(&self, tx: &Transaction, user: &Address) -> Result<u128> {
        let account = self.staged_account(tx, user)?;
        self.health_factor_of(&account)
    }

    /// Fail with `HealthFactorBroken` if `user`'s staged position is below the minimum
    pub(crate) fn ensure_healthy(&self, tx: &Transaction, user: &Address) -> Result<()> {
        let health_factor = self.staged_health_factor(tx, user)?;
        debug!(
            user = %user.short(),
            health_factor = %format_health_factor(health_factor),
            "checked health factor"
        );
        if health_factor < MIN_HEALTH_FACTOR {
            return Err(Error::HealthFactorBroken(health_factor));
        }
        Ok(())
    }

    fn health_factor_of(&self, account: &Account) -> Result<u128> {
        if account.debt_minted() == 0 {
            return Ok(MAX_HEALTH_FACTOR);
        }
        let value = self.collateral_value_of(account)?;
        Ok(calculate_health_factor(account.debt_minted(), value))
    }

    fn collateral_value_of(&self, account: &Account) -> Result<u128> {
        let mut total = 0u128;
        for asset in self.registry.assets() {
            let amount = account.collateral_of(asset);
            if amount == 0 {
                continue;
            }
            total = safe_add(total, usd_value(self.normalized_price(asset)?, amount)?)?;
        }
        Ok(total)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run one operation under the operation lock: stage, execute, commit
    pub(crate) fn execute(
        &self,
        operation: &'static str,
        stage: impl FnOnce(&mut Transaction) -> Result<()>,
    ) -> Result<()> {
        let _guard = self.lock.acquire().map_err(|e| {
            warn!(operation, "operation rejected: {}", e);
            e
        })?;

        let mut tx = Transaction::new();
        let prepared = stage(&mut tx)
            .and_then(|()| self.read_state()?.accounts.can_apply(tx.accounts()))
            .and_then(|()| self.run_effects(&mut tx))
            .and_then(|()| self.commit(&mut tx));

        match prepared {
            Ok(count) => {
                info!(operation, events = count, "operation committed");
                Ok(())
            }
            Err(e) => Err(self.abort(operation, &mut tx, e)),
        }
    }

    fn run_effects(&self, tx: &mut Transaction) -> Result<()> {
        for effect in tx.ordered_effects() {
            match effect {
                Effect::PullCollateral {
                    asset,
                    from,
                    amount,
                } => {
                    if !self
                        .collateral
                        .transfer_from(&asset, &self.address, &from, &self.address, amount)
                    {
                        return Err(Error::CollateralTransferFailed);
                    }
                    tx.record(Compensation::ReturnCollateral {
                        asset,
                        to: from,
                        amount,
                    });
                }
                Effect::PullSynthetic { from, amount } => {
                    if !self
                        .synthetic
                        .transfer_from(&self.address, &from, &self.address, amount)
                    {
                        return Err(Error::DebtTransferFailed);
                    }
                    tx.record(Compensation::ReturnSynthetic { to: from, amount });
                }
                Effect::BurnSynthetic { payer, amount } => {
                    if !self.synthetic.burn(&self.address, amount) {
                        return Err(Error::BurnFailed);
                    }
                    tx.convert_to_remint(&payer, amount);
                }
                Effect::PushCollateral { asset, to, amount } => {
                    if !self.collateral.transfer(&asset, &self.address, &to, amount) {
                        return Err(Error::RedeemTransferFailed);
                    }
                }
                Effect::MintSynthetic { to, amount } => {
                    if !self.synthetic.mint(&self.address, &to, amount) {
                        return Err(Error::MintingFailed);
                    }
                }
            }
        }
        Ok(())
    }

    fn commit(&self, tx: &mut Transaction) -> Result<usize> {
        let mut state = self.write_state()?;
        state.accounts.apply(tx.accounts())?;
        let events = tx.take_events();
        let count = events.len();
        state.events.extend(events);
        Ok(count)
    }

    /// Unwind executed effects and return the error to report
    fn abort(&self, operation: &'static str, tx: &mut Transaction, cause: Error) -> Error {
        let mut failures = Vec::new();
        for compensation in tx.take_journal() {
            if let Err(e) = self.compensate(&compensation) {
                error!(operation, ?compensation, "compensation failed: {}", e);
                failures.push(e);
            }
        }

        if failures.is_empty() {
            warn!(operation, code = cause.code(), "operation rejected: {}", cause);
            return cause;
        }

        let details: Vec<String> = failures.iter().map(ToString::to_string).collect();
        error!(
            operation,
            "rollback after '{}' left collaborators inconsistent",
            cause
        );
        Error::RollbackFailed(format!("{} (after: {})", details.join("; "), cause))
    }

    fn compensate(&self, compensation: &Compensation) -> Result<()> {
        let done = match *compensation {
            Compensation::ReturnCollateral { asset, to, amount } => {
                self.collateral.transfer(&asset, &self.address, &to, amount)
            }
            Compensation::ReturnSynthetic { to, amount } => {
                self.synthetic.transfer(&self.address, &to, amount)
            }
            Compensation::Remint { to, amount } => self.synthetic.mint(&self.address, &to, amount),
        };
        if done {
            Ok(())
        } else {
            Err(Error::RollbackFailed(format!("{:?} refused", compensation)))
        }
    }

    fn read_state(&self) -> Result<RwLockReadGuard<'_, EngineState>> {
        self.state.read().map_err(|_| Error::Lock)
    }

    fn write_state(&self) -> Result<RwLockWriteGuard<'_, EngineState>> {
        self.state.write().map_err(|_| Error::Lock)
    }
}

fn ensure_non_zero(amount: u128) -> Result<()> {
    if amount == 0 {
        return Err(Error::ZeroAmount);
    }
    Ok(())
}

fn price_error(e: Error) -> Error {
    match e {
        Error::StaleOrInvalidPrice(_) => e,
        other => Error::StaleOrInvalidPrice(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::collateral::InMemoryTokenLedger;
    use crate::core::token::StableToken;
    use crate::oracle::clock::ManualClock;
    use crate::oracle::price_feed::FeedRegistry;

    const E18: u128 = PRECISION;

    struct Fixture {
        engine: DscEngine,
        token: Arc<StableToken>,
        ledger: Arc<InMemoryTokenLedger>,
        feeds: Arc<FeedRegistry<Arc<ManualClock>>>,
        weth: AssetId,
        eth_usd: FeedId,
        alice: Address,
    }

    fn fixture() -> Fixture {
        let engine_address = Address::from_label("engine");
        let clock = Arc::new(ManualClock::new(1_700_000_000));
        let feeds = Arc::new(FeedRegistry::new(clock));
        let weth = AssetId::from_label("weth");
        let eth_usd = FeedId::from_label("eth-usd");
        feeds.add_feed(eth_usd, 8, 2000_0000_0000).unwrap();

        let token = Arc::new(StableToken::new(Address::from_label("dsc"), engine_address));
        let ledger = Arc::new(InMemoryTokenLedger::new());
        let alice = Address::from_label("alice");
        ledger.mint(&weth, &alice, 100 * E18).unwrap();
        ledger.approve(&weth, &alice, &engine_address, u128::MAX).unwrap();
        token.approve(&alice, &engine_address, u128::MAX).unwrap();

        let engine = DscEngine::new(
            engine_address,
            vec![weth],
            vec![eth_usd],
            token.id(),
            Collaborators::new(token.clone(), ledger.clone(), feeds.clone()),
        )
        .unwrap();

        Fixture {
            engine,
            token,
            ledger,
            feeds,
            weth,
            eth_usd,
            alice,
        }
    }

    #[test]
    fn test_constructor_rejects_null_synthetic() {
        let f = fixture();
        let result = DscEngine::new(
            Address::from_label("engine"),
            vec![f.weth],
            vec![f.eth_usd],
            Address::ZERO,
            Collaborators::new(f.token.clone(), f.ledger.clone(), f.feeds.clone()),
        );
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_deposit_and_views() {
        let f = fixture();
        f.engine.deposit_collateral(f.alice, f.weth, 10 * E18).unwrap();

        assert_eq!(f.engine.collateral_balance_of(&f.alice, &f.weth).unwrap(), 10 * E18);
        assert_eq!(f.ledger.balance_of(&f.weth, &f.engine.address()), 10 * E18);
        assert_eq!(f.engine.account_collateral_value(&f.alice).unwrap(), 20_000 * E18);
        assert_eq!(f.engine.health_factor(&f.alice).unwrap(), u128::MAX);
        assert_eq!(f.engine.events().unwrap().len(), 1);
    }

    #[test]
    fn test_mint_checks_post_mint_health() {
        let f = fixture();
        f.engine.deposit_collateral(f.alice, f.weth, 10 * E18).unwrap();

        // 10 WETH at $2000 supports at most 10_000 DSC
        f.engine.mint_dsc(f.alice, 10_000 * E18).unwrap();
        assert_eq!(f.engine.health_factor(&f.alice).unwrap(), E18);

        let result = f.engine.mint_dsc(f.alice, 1);
        assert!(matches!(result, Err(Error::HealthFactorBroken(_))));
        assert_eq!(f.engine.debt_of(&f.alice).unwrap(), 10_000 * E18);
        assert_eq!(f.token.total_supply(), 10_000 * E18);
    }

    #[test]
    fn test_zero_amount_rejected_first() {
        let f = fixture();
        let other = AssetId::from_label("doge");
        assert_eq!(f.engine.deposit_collateral(f.alice, other, 0), Err(Error::ZeroAmount));
        assert_eq!(
            f.engine.deposit_collateral(f.alice, other, 1),
            Err(Error::AssetNotAllowed(other))
        );
    }

    #[test]
    fn test_collateral_transfer_failure_leaves_no_trace() {
        let f = fixture();
        f.ledger.set_failing(&f.weth, true).unwrap();
        assert_eq!(
            f.engine.deposit_collateral(f.alice, f.weth, E18),
            Err(Error::CollateralTransferFailed)
        );
        assert_eq!(f.engine.collateral_balance_of(&f.alice, &f.weth).unwrap(), 0);
        assert!(f.engine.events().unwrap().is_empty());
    }

    #[test]
    fn test_burn_and_redeem() {
        let f = fixture();
        f.engine
            .deposit_collateral_and_mint_dsc(f.alice, f.weth, 10 * E18, 100 * E18)
            .unwrap();
        f.engine
            .redeem_collateral_for_dsc(f.alice, f.weth, 10 * E18, 100 * E18)
            .unwrap();

        assert_eq!(f.engine.account(&f.alice).unwrap(), Account::new());
        assert_eq!(f.ledger.balance_of(&f.weth, &f.alice), 100 * E18);
        assert_eq!(f.token.total_supply(), 0);
        assert_eq!(f.engine.total_debt().unwrap(), 0);

        let types: Vec<&str> = f
            .engine
            .events()
            .unwrap()
            .iter()
            .map(EngineEvent::event_type)
            .collect();
        assert_eq!(
            types,
            vec!["CollateralDeposited", "DebtMinted", "DebtBurned", "CollateralRedeemed"]
        );
    }

    #[test]
    fn test_oracle_failure_maps_to_stale_price() {
        let f = fixture();
        f.engine.deposit_collateral(f.alice, f.weth, E18).unwrap();
        f.feeds.update_answer(&f.eth_usd, -1).unwrap();
        assert!(matches!(
            f.engine.mint_dsc(f.alice, 1),
            Err(Error::StaleOrInvalidPrice(_))
        ));
        assert!(matches!(
            f.engine.usd_value(&f.weth, E18),
            Err(Error::StaleOrInvalidPrice(_))
        ));
    }

    #[test]
    fn test_constant_getters() {
        let f = fixture();
        assert_eq!(f.engine.precision(), PRECISION);
        assert_eq!(f.engine.additional_feed_precision(), 10_000_000_000);
        assert_eq!(f.engine.liquidation_threshold(), 50);
        assert_eq!(f.engine.liquidation_bonus(), 10);
        assert_eq!(f.engine.liquidation_precision(), 100);
        assert_eq!(f.engine.min_health_factor(), E18);
        assert_eq!(f.engine.collateral_tokens(), &[f.weth]);
        assert_eq!(f.engine.collateral_token_price_feed(&f.weth), Some(f.eth_usd));
        assert_eq!(f.engine.synthetic_asset(), f.token.id());
    }
}
