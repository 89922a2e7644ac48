//! Staged execution of engine operations.
//!
//! An operation first stages its account changes, events and external
//! effects in a [`Transaction`] without touching shared state. Effects are
//! then run against the collaborators in phase order, each successful one
//! leaving a [`Compensation`] in the journal. The engine commits the staged
//! accounts and events only after every effect succeeded; otherwise it
//! unwinds the journal.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::core::account::Account;
use crate::error::Result;
use crate::protocol::events::EngineEvent;
use crate::utils::address::{Address, AssetId};

// ═══════════════════════════════════════════════════════════════════════════════
// EFFECTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A call into a collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Pull collateral from a user into custody
    PullCollateral {
        /// Asset pulled
        asset: AssetId,
        /// Owner of the collateral
        from: Address,
        /// Amount pulled
        amount: u128,
    },
    /// Pull synthetic asset from a payer into custody
    PullSynthetic {
        /// Payer
        from: Address,
        /// Amount pulled
        amount: u128,
    },
    /// Burn synthetic asset held in custody
    BurnSynthetic {
        /// Payer the burned units came from
        payer: Address,
        /// Amount burned
        amount: u128,
    },
    /// Push collateral out of custody
    PushCollateral {
        /// Asset pushed
        asset: AssetId,
        /// Recipient
        to: Address,
        /// Amount pushed
        amount: u128,
    },
    /// Mint synthetic asset to a user
    MintSynthetic {
        /// Recipient
        to: Address,
        /// Amount minted
        amount: u128,
    },
}

impl Effect {
    /// Execution phase; lower phases run first
    ///
    /// Pulls can be refunded and burns can be re-minted, but collateral
    /// pushed to a user or freshly minted units cannot be taken back, so
    /// those run last.
    pub fn phase(&self) -> u8 {
        match self {
            Effect::PullCollateral { .. } | Effect::PullSynthetic { .. } => 0,
            Effect::BurnSynthetic { .. } => 1,
            Effect::PushCollateral { .. } | Effect::MintSynthetic { .. } => 2,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPENSATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Action undoing a completed effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Send pulled collateral back
    ReturnCollateral {
        /// Asset to return
        asset: AssetId,
        /// Original owner
        to: Address,
        /// Amount to return
        amount: u128,
    },
    /// Send pulled synthetic asset back
    ReturnSynthetic {
        /// Original payer
        to: Address,
        /// Amount to return
        amount: u128,
    },
    /// Recreate burned synthetic asset for its payer
    Remint {
        /// Original payer
        to: Address,
        /// Amount to mint
        amount: u128,
    },
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Staged state of one engine operation
#[derive(Debug, Default)]
pub struct Transaction {
    /// Accounts touched by the operation, as they will be after commit
    accounts: BTreeMap<Address, Account>,
    /// Events in emission order
    events: Vec<EngineEvent>,
    /// External effects in staging order
    effects: Vec<Effect>,
    /// Compensations for effects already executed
    journal: Vec<Compensation>,
}

impl Transaction {
    /// Create empty transaction
    pub fn new() -> Self {
        Self::default()
    }

    /// Staged account of `user`, loading it on first touch
    pub fn stage_with(
        &mut self,
        user: Address,
        load: impl FnOnce() -> Result<Account>,
    ) -> Result<&mut Account> {
        match self.accounts.entry(user) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(load()?)),
        }
    }

    /// Staged account of `user`
    pub fn account(&self, user: &Address) -> Option<&Account> {
        self.accounts.get(user)
    }

    /// All staged accounts
    pub fn accounts(&self) -> &BTreeMap<Address, Account> {
        &self.accounts
    }

    /// Queue an event for publication on commit
    pub fn emit(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    /// Queue an external effect
    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Effects in execution order (stable within a phase)
    pub fn ordered_effects(&self) -> Vec<Effect> {
        let mut effects = self.effects.clone();
        effects.sort_by_key(Effect::phase);
        effects
    }

    /// Record how to undo an executed effect
    pub fn record(&mut self, compensation: Compensation) {
        self.journal.push(compensation);
    }

    /// Swap the refund of pulled synthetic asset for a re-mint once it is burned
    pub fn convert_to_remint(&mut self, payer: &Address, amount: u128) {
        let position = self.journal.iter().rposition(|c| {
            matches!(c, Compensation::ReturnSynthetic { to, amount: a } if to == payer && *a == amount)
        });
        let remint = Compensation::Remint { to: *payer, amount };
        match position {
            Some(index) => self.journal[index] = remint,
            None => self.journal.push(remint),
        }
    }

    /// Take compensations, most recent first
    pub fn take_journal(&mut self) -> Vec<Compensation> {
        let mut journal = std::mem::take(&mut self.journal);
        journal.reverse();
        journal
    }

    /// Take queued events for publication
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}
