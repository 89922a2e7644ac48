//! Error types for the DSC engine.
//!
//! Every engine operation is all-or-nothing: when one of these errors is
//! returned, the account ledger, custody balances, synthetic supply and event
//! log are exactly as they were before the call.

use thiserror::Error;

use crate::utils::address::AssetId;

/// Result type alias for DSC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the DSC engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Construction Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Engine construction or configuration is invalid
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ═══════════════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount is zero
    #[error("Amount must be more than zero")]
    ZeroAmount,

    /// Collateral asset is not registered with the engine
    #[error("Asset {0} is not an allowed collateral")]
    AssetNotAllowed(AssetId),

    /// Burn would exceed the account's outstanding debt
    #[error("Burn of {requested} exceeds outstanding debt {debt}")]
    BurnExceedsBalance {
        /// Requested burn amount
        requested: u128,
        /// Outstanding debt
        debt: u128,
    },

    /// Redeem or seizure would exceed the deposited collateral
    #[error("Insufficient collateral: requested {requested}, available {available}")]
    InsufficientCollateral {
        /// Requested amount
        requested: u128,
        /// Deposited amount
        available: u128,
    },

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Health Factor Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Operation would leave the account below the minimum health factor
    #[error("Health factor broken: {0}")]
    HealthFactorBroken(u128),

    /// Liquidation attempted on a healthy account
    #[error("Health factor is ok, account cannot be liquidated")]
    HealthFactorOk,

    /// Liquidation did not improve the target's health factor
    #[error("Health factor not improved by liquidation")]
    HealthFactorNotImproved,

    // ═══════════════════════════════════════════════════════════════════
    // Collaborator Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Pulling collateral into custody failed
    #[error("Collateral transfer into custody failed")]
    CollateralTransferFailed,

    /// Pushing collateral out of custody failed
    #[error("Collateral transfer out of custody failed")]
    RedeemTransferFailed,

    /// Synthetic asset refused to mint
    #[error("Minting failed")]
    MintingFailed,

    /// Pulling synthetic asset from the payer failed
    #[error("Synthetic asset transfer into custody failed")]
    DebtTransferFailed,

    /// Synthetic asset refused to burn custody balance
    #[error("Burning failed")]
    BurnFailed,

    /// Price reading is stale or unusable
    #[error("Stale or invalid price: {0}")]
    StaleOrInvalidPrice(String),

    // ═══════════════════════════════════════════════════════════════════
    // Token Ledger Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Not authorized to perform this action
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Token balance too low
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Required amount
        required: u128,
        /// Available amount
        available: u128,
    },

    /// Spender allowance too low
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance {
        /// Required amount
        required: u128,
        /// Approved amount
        available: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Execution Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Mutating operation re-entered from within a collaborator call
    #[error("Reentrant call into the engine")]
    Reentrancy,

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Compensating a partially applied operation failed
    #[error("Rollback failed: {0}")]
    RollbackFailed(String),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Returns true if the caller can succeed by correcting input or retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ZeroAmount
                | Error::AssetNotAllowed(_)
                | Error::BurnExceedsBalance { .. }
                | Error::InsufficientCollateral { .. }
                | Error::HealthFactorBroken(_)
                | Error::HealthFactorOk
                | Error::HealthFactorNotImproved
                | Error::CollateralTransferFailed
                | Error::RedeemTransferFailed
                | Error::MintingFailed
                | Error::DebtTransferFailed
                | Error::BurnFailed
                | Error::StaleOrInvalidPrice(_)
                | Error::Reentrancy
        )
    }

    /// Returns true if this error means engine and collaborators may disagree
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::RollbackFailed(_) | Error::Overflow { .. } | Error::Lock
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Construction errors: 1xxx
            Error::ConfigurationError(_) => 1001,

            // Input errors: 2xxx
            Error::ZeroAmount => 2001,
            Error::AssetNotAllowed(_) => 2002,
            Error::BurnExceedsBalance { .. } => 2003,
            Error::InsufficientCollateral { .. } => 2004,
            Error::InvalidParameter { .. } => 2005,

            // Health factor errors: 3xxx
            Error::HealthFactorBroken(_) => 3001,
            Error::HealthFactorOk => 3002,
            Error::HealthFactorNotImproved => 3003,

            // Collaborator errors: 4xxx
            Error::CollateralTransferFailed => 4001,
            Error::RedeemTransferFailed => 4002,
            Error::MintingFailed => 4003,
            Error::DebtTransferFailed => 4004,
            Error::BurnFailed => 4005,
            Error::StaleOrInvalidPrice(_) => 4006,

            // Token ledger errors: 5xxx
            Error::Unauthorized(_) => 5001,
            Error::InsufficientBalance { .. } => 5002,
            Error::InsufficientAllowance { .. } => 5003,

            // Execution errors: 6xxx
            Error::Reentrancy => 6001,
            Error::Overflow { .. } => 6002,
            Error::RollbackFailed(_) => 6003,
            Error::Lock => 6004,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,
        }
    }
}
