//! Scripted engine simulations.
//!
//! A [`Simulator`] wires a [`DscEngine`] to in-memory collaborators built
//! from an [`EngineConfig`] and replays [`Script`] steps against it. A
//! failing step is recorded and the run continues, so a script can probe
//! rejections and the report shows where each one happened.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cli::script::{Script, Step};
use crate::core::collateral::InMemoryTokenLedger;
use crate::core::config::{CollateralConfig, EngineConfig};
use crate::core::token::{StableToken, SyntheticAsset};
use crate::error::{Error, Result};
use crate::oracle::clock::{Clock, ManualClock};
use crate::oracle::price_feed::FeedRegistry;
use crate::oracle::stale::StaleCheckedOracle;
use crate::protocol::engine::{Collaborators, DscEngine};
use crate::protocol::events::EngineEvent;
use crate::utils::address::{Address, AssetId};
use crate::utils::constants::PRECISION_DECIMALS;
use crate::utils::math::{format_health_factor, format_units, parse_units};

/// Unix time the simulation clock starts at
pub const SIMULATION_EPOCH: u64 = 1_700_000_000;

type SimulatedFeeds = FeedRegistry<Arc<ManualClock>>;

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Position in the script
    pub index: usize,
    /// Operation name
    pub op: String,
    /// Whether the step succeeded
    pub ok: bool,
    /// Error message of a failed step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error code of a failed step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u32>,
}

/// Position of one user at the end of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReport {
    /// Label the script used
    pub label: String,
    /// Derived address
    pub address: Address,
    /// Deposited collateral by symbol
    pub collateral: BTreeMap<String, String>,
    /// USD value of the collateral
    pub collateral_value_usd: String,
    /// Outstanding debt
    pub debt: String,
    /// Synthetic asset held
    pub dsc_balance: String,
    /// Health factor, or the reason it could not be read
    pub health_factor: String,
}

/// Result of replaying a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// One outcome per step
    pub steps: Vec<StepOutcome>,
    /// Final position of every user the script mentioned
    pub accounts: Vec<AccountReport>,
    /// Outstanding debt across all users
    pub total_debt: String,
    /// Synthetic asset in circulation
    pub total_supply: String,
    /// Committed engine events
    pub events: Vec<EngineEvent>,
}

impl SimulationReport {
    /// Number of failed steps
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// An engine wired to in-memory ledgers and a manual clock
pub struct Simulator {
    config: EngineConfig,
    clock: Arc<ManualClock>,
    feeds: Arc<SimulatedFeeds>,
    ledger: Arc<InMemoryTokenLedger>,
    token: Arc<StableToken>,
    engine: DscEngine,
    users: BTreeMap<String, Address>,
}

impl Simulator {
    /// Build a simulator from a configuration
    ///
    /// Every collateral entry needs an `initial_price`.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let clock = Arc::new(ManualClock::new(SIMULATION_EPOCH));
        let feeds = Arc::new(FeedRegistry::new(clock.clone()));
        for collateral in &config.collateral {
            let price = collateral.initial_price.as_deref().ok_or_else(|| {
                Error::ConfigurationError(format!(
                    "collateral {} has no initial price",
                    collateral.symbol
                ))
            })?;
            let answer = feed_answer(collateral, price)?;
            feeds.add_feed(collateral.price_feed, collateral.feed_decimals, answer)?;
        }

        let ledger = Arc::new(InMemoryTokenLedger::new());
        let token = Arc::new(StableToken::new(config.synthetic_asset, config.engine));
        let oracle = StaleCheckedOracle::with_timeout(
            feeds.clone(),
            clock.clone(),
            config.oracle_timeout_secs,
        );
        let collaborators = Collaborators::new(token.clone(), ledger.clone(), Arc::new(oracle));
        let engine = DscEngine::from_config(&config, collaborators)?;

        Ok(Self {
            config,
            clock,
            feeds,
            ledger,
            token,
            engine,
            users: BTreeMap::new(),
        })
    }

    /// The simulated engine
    pub fn engine(&self) -> &DscEngine {
        &self.engine
    }

    /// The simulated synthetic asset
    pub fn token(&self) -> &StableToken {
        &self.token
    }

    /// The simulated collateral ledgers
    pub fn ledger(&self) -> &InMemoryTokenLedger {
        &self.ledger
    }

    /// Configuration the simulator was built from
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Asset id of a configured collateral symbol
    pub fn asset(&self, symbol: &str) -> Result<AssetId> {
        Ok(self.collateral(symbol)?.asset)
    }

    /// Current simulation time
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Address of a user label, registering it on first use
    ///
    /// New users approve the engine for every collateral asset and the
    /// synthetic asset without limit.
    pub fn user(&mut self, label: &str) -> Result<Address> {
        if let Some(address) = self.users.get(label) {
            return Ok(*address);
        }

        let address = if label.starts_with("0x") {
            label.parse()?
        } else {
            Address::from_label(label)
        };
        let spender = self.engine.address();
        for collateral in &self.config.collateral {
            self.ledger
                .approve(&collateral.asset, &address, &spender, u128::MAX)?;
        }
        self.token.approve(&address, &spender, u128::MAX)?;

        debug!(label, address = %address.short(), "registered simulated user");
        self.users.insert(label.to_string(), address);
        Ok(address)
    }

    /// Replay every step, continuing past failures
    pub fn run(&mut self, script: &Script) -> Result<SimulationReport> {
        info!(steps = script.len(), "running simulation");

        let mut steps = Vec::with_capacity(script.len());
        for (index, step) in script.steps.iter().enumerate() {
            let outcome = match self.apply(step) {
                Ok(()) => StepOutcome {
                    index,
                    op: step.op().to_string(),
                    ok: true,
                    error: None,
                    code: None,
                },
                Err(e) => {
                    warn!(index, op = step.op(), "step failed: {}", e);
                    StepOutcome {
                        index,
                        op: step.op().to_string(),
                        ok: false,
                        error: Some(e.to_string()),
                        code: Some(e.code()),
                    }
                }
            };
            steps.push(outcome);
        }

        let report = self.report(steps)?;
        info!(
            steps = report.steps.len(),
            failures = report.failures(),
            events = report.events.len(),
            "simulation finished"
        );
        Ok(report)
    }

    /// Apply a single step
    pub fn apply(&mut self, step: &Step) -> Result<()> {
        for label in step.users() {
            self.user(label)?;
        }

        match step {
            Step::SetPrice { asset, price } => {
                let collateral = self.collateral(asset)?.clone();
                let answer = feed_answer(&collateral, price)?;
                self.feeds.update_answer(&collateral.price_feed, answer)
            }
            Step::AdvanceTime { secs } => {
                self.clock.advance(*secs);
                Ok(())
            }
            Step::Fund {
                user,
                asset,
                amount,
            } => {
                let user = self.user(user)?;
                let asset = self.asset_id(asset);
                self.ledger.mint(&asset, &user, tokens(amount)?)
            }
            Step::Deposit {
                user,
                asset,
                amount,
            } => {
                let user = self.user(user)?;
                self.engine
                    .deposit_collateral(user, self.asset_id(asset), tokens(amount)?)
            }
            Step::Mint { user, amount } => {
                let user = self.user(user)?;
                self.engine.mint_dsc(user, tokens(amount)?)
            }
            Step::DepositAndMint {
                user,
                asset,
                collateral,
                mint,
            } => {
                let user = self.user(user)?;
                self.engine.deposit_collateral_and_mint_dsc(
                    user,
                    self.asset_id(asset),
                    tokens(collateral)?,
                    tokens(mint)?,
                )
            }
            Step::Redeem {
                user,
                asset,
                amount,
            } => {
                let user = self.user(user)?;
                self.engine
                    .redeem_collateral(user, self.asset_id(asset), tokens(amount)?)
            }
            Step::Burn { user, amount } => {
                let user = self.user(user)?;
                self.engine.burn_dsc(user, tokens(amount)?)
            }
            Step::RedeemForDsc {
                user,
                asset,
                collateral,
                burn,
            } => {
                let user = self.user(user)?;
                self.engine.redeem_collateral_for_dsc(
                    user,
                    self.asset_id(asset),
                    tokens(collateral)?,
                    tokens(burn)?,
                )
            }
            Step::Liquidate {
                liquidator,
                asset,
                target,
                debt,
            } => {
                let liquidator = self.user(liquidator)?;
                let target = self.user(target)?;
                self.engine
                    .liquidate(liquidator, self.asset_id(asset), target, tokens(debt)?)
            }
            Step::Transfer { from, to, amount } => {
                let from = self.user(from)?;
                let to = self.user(to)?;
                let amount = tokens(amount)?;
                if self.token.transfer(&from, &to, amount) {
                    Ok(())
                } else {
                    Err(Error::InsufficientBalance {
                        required: amount,
                        available: self.token.balance_of(&from),
                    })
                }
            }
        }
    }

    /// Final positions of every registered user
    pub fn report(&self, steps: Vec<StepOutcome>) -> Result<SimulationReport> {
        let mut accounts = Vec::with_capacity(self.users.len());
        for (label, address) in &self.users {
            let account = self.engine.account(address)?;
            let collateral = self
                .config
                .collateral
                .iter()
                .filter(|c| account.collateral_of(&c.asset) > 0)
                .map(|c| {
                    (
                        c.symbol.clone(),
                        format_units(account.collateral_of(&c.asset), PRECISION_DECIMALS),
                    )
                })
                .collect();
            let collateral_value_usd = match self.engine.account_collateral_value(address) {
                Ok(value) => format_units(value, PRECISION_DECIMALS),
                Err(e) => format!("unavailable ({})", e),
            };
            let health_factor = match self.engine.health_factor(address) {
                Ok(hf) => format_health_factor(hf),
                Err(e) => format!("unavailable ({})", e),
            };

            accounts.push(AccountReport {
                label: label.clone(),
                address: *address,
                collateral,
                collateral_value_usd,
                debt: format_units(account.debt_minted(), PRECISION_DECIMALS),
                dsc_balance: format_units(self.token.balance_of(address), PRECISION_DECIMALS),
                health_factor,
            });
        }

        Ok(SimulationReport {
            steps,
            accounts,
            total_debt: format_units(self.engine.total_debt()?, PRECISION_DECIMALS),
            total_supply: format_units(self.token.total_supply(), PRECISION_DECIMALS),
            events: self.engine.events()?,
        })
    }

    fn collateral(&self, symbol: &str) -> Result<&CollateralConfig> {
        self.config.collateral_by_symbol(symbol).ok_or_else(|| {
            Error::InvalidParameter {
                name: "asset".into(),
                reason: format!("unknown collateral symbol {}", symbol),
            }
        })
    }

    /// Unknown symbols resolve to a label-derived id the engine will reject
    fn asset_id(&self, symbol: &str) -> AssetId {
        self.config
            .collateral_by_symbol(symbol)
            .map(|c| c.asset)
            .unwrap_or_else(|| AssetId::from_label(&symbol.to_lowercase()))
    }
}

fn tokens(amount: &str) -> Result<u128> {
    parse_units(amount, PRECISION_DECIMALS)
}

fn feed_answer(collateral: &CollateralConfig, price: &str) -> Result<i128> {
    let scaled = parse_units(price, collateral.feed_decimals)?;
    i128::try_from(scaled).map_err(|_| Error::Overflow {
        operation: format!("{} price", collateral.symbol),
    })
}
