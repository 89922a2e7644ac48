//! Engine events for state change notifications.
//!
//! Events are published only when an operation commits, in the order the
//! operation produced them, so clients never observe effects of a failed call.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::address::{Address, AssetId};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Collateral moved into custody
    CollateralDeposited(CollateralDepositedEvent),
    /// Collateral moved out of custody
    CollateralRedeemed(CollateralRedeemedEvent),
    /// Synthetic asset minted against collateral
    DebtMinted(DebtMintedEvent),
    /// Synthetic asset burned to repay debt
    DebtBurned(DebtBurnedEvent),
}

impl EngineEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralDeposited(_) => "CollateralDeposited",
            Self::CollateralRedeemed(_) => "CollateralRedeemed",
            Self::DebtMinted(_) => "DebtMinted",
            Self::DebtBurned(_) => "DebtBurned",
        }
    }

    /// Account whose position the event changed
    pub fn account(&self) -> Address {
        match self {
            Self::CollateralDeposited(e) => e.user,
            Self::CollateralRedeemed(e) => e.from,
            Self::DebtMinted(e) => e.user,
            Self::DebtBurned(e) => e.on_behalf_of,
        }
    }

    /// Amount carried by the event
    pub fn amount(&self) -> u128 {
        match self {
            Self::CollateralDeposited(e) => e.amount,
            Self::CollateralRedeemed(e) => e.amount,
            Self::DebtMinted(e) => e.amount,
            Self::DebtBurned(e) => e.amount,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> [u8; 32] {
        let data = bincode::serialize(self).unwrap_or_default();
        Sha256::digest(&data).into()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when collateral is deposited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDepositedEvent {
    /// Depositor
    pub user: Address,
    /// Deposited asset
    pub asset: AssetId,
    /// Amount deposited
    pub amount: u128,
}

/// Event emitted when collateral leaves custody
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRedeemedEvent {
    /// Account the collateral was debited from
    pub from: Address,
    /// Recipient (the liquidator during a liquidation)
    pub to: Address,
    /// Redeemed asset
    pub asset: AssetId,
    /// Amount redeemed
    pub amount: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEBT EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when the synthetic asset is minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtMintedEvent {
    /// Minter
    pub user: Address,
    /// Amount minted
    pub amount: u128,
}

/// Event emitted when debt is repaid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtBurnedEvent {
    /// Account whose debt was reduced
    pub on_behalf_of: Address,
    /// Account that supplied the synthetic asset
    pub payer: Address,
    /// Amount burned
    pub amount: u128,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Append-only log of committed events
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<EngineEvent>,
}

impl EventLog {
    /// Create empty event log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append committed events
    pub fn extend(&mut self, events: impl IntoIterator<Item = EngineEvent>) {
        self.events.extend(events);
    }

    /// Get all events
    pub fn events(&self) -> &[EngineEvent] {
        &self.events
    }

    /// Take all events (clears the log)
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    /// Events touching `account`
    pub fn events_for(&self, account: &Address) -> Vec<&EngineEvent> {
        self.events
            .iter()
            .filter(|e| match e {
                EngineEvent::CollateralRedeemed(r) => r.from == *account || r.to == *account,
                EngineEvent::DebtBurned(b) => b.on_behalf_of == *account || b.payer == *account,
                other => other.account() == *account,
            })
            .collect()
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn bob() -> Address {
        Address::from_label("bob")
    }

    #[test]
    fn test_event_type_and_account() {
        let event = EngineEvent::DebtBurned(DebtBurnedEvent {
            on_behalf_of: alice(),
            payer: bob(),
            amount: 5,
        });
        assert_eq!(event.event_type(), "DebtBurned");
        assert_eq!(event.account(), alice());
        assert_eq!(event.amount(), 5);
    }

    #[test]
    fn test_event_hash_deterministic() {
        let a = EngineEvent::DebtMinted(DebtMintedEvent {
            user: alice(),
            amount: 1,
        });
        let b = EngineEvent::DebtMinted(DebtMintedEvent {
            user: alice(),
            amount: 2,
        });
        assert_eq!(a.hash(), a.clone().hash());
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        log.extend(vec![
            EngineEvent::CollateralDeposited(CollateralDepositedEvent {
                user: alice(),
                asset: AssetId::from_label("weth"),
                amount: 10,
            }),
            EngineEvent::CollateralRedeemed(CollateralRedeemedEvent {
                from: alice(),
                to: bob(),
                asset: AssetId::from_label("weth"),
                amount: 3,
            }),
        ]);

        assert_eq!(log.len(), 2);
        assert_eq!(log.events_for(&bob()).len(), 1);
        assert_eq!(log.events_for(&alice()).len(), 2);

        let taken = log.take_events();
        assert_eq!(taken.len(), 2);
        assert!(log.is_empty());
    }
}
