//! Engine constants.
//!
//! All protocol-wide constants are defined here for easy auditing.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point scale for amounts, USD values and health factors (1e18)
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Decimals of the reference USD price feeds
pub const FEED_DECIMALS: u8 = 8;

/// Most decimals a feed answer may carry (10^38 is the largest power of ten in a `u128`)
pub const MAX_FEED_DECIMALS: u8 = 38;

/// Scale that lifts an 8-decimal feed answer to 18 decimals (1e10)
pub const ADDITIONAL_FEED_PRECISION: u128 = 10_000_000_000;

/// Decimals of the fixed-point scale
pub const PRECISION_DECIMALS: u8 = 18;

// ═══════════════════════════════════════════════════════════════════════════════
// RISK CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Share of collateral value that counts toward backing debt - 50%
/// Equivalent to a 200% collateralization requirement
pub const LIQUIDATION_THRESHOLD: u128 = 50;

/// Denominator for threshold and bonus percentages
pub const LIQUIDATION_PRECISION: u128 = 100;

/// Extra collateral awarded to liquidators - 10%
pub const LIQUIDATION_BONUS: u128 = 10;

/// Minimum health factor (1.0 in fixed point)
pub const MIN_HEALTH_FACTOR: u128 = PRECISION;

/// Health factor of an account without debt
pub const MAX_HEALTH_FACTOR: u128 = u128::MAX;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum age of a price reading - 3 hours
pub const ORACLE_TIMEOUT_SECS: u64 = 3 * 3600;

// ═══════════════════════════════════════════════════════════════════════════════
// SYNTHETIC ASSET CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Synthetic asset name
pub const SYNTHETIC_NAME: &str = "DecentralizedStableCoin";

/// Synthetic asset symbol
pub const SYNTHETIC_SYMBOL: &str = "DSC";

/// Synthetic asset decimals
pub const SYNTHETIC_DECIMALS: u8 = 18;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIER CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an account or contract address in bytes
pub const ADDRESS_LENGTH: usize = 20;

/// Maximum in-memory token events kept by the reference ledgers
pub const MAX_TOKEN_EVENTS: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_precision_lifts_to_wad() {
        assert_eq!(
            ADDITIONAL_FEED_PRECISION,
            10u128.pow((PRECISION_DECIMALS - FEED_DECIMALS) as u32)
        );
        assert_eq!(PRECISION, 10u128.pow(PRECISION_DECIMALS as u32));
    }

    #[test]
    fn test_risk_constants() {
        assert!(LIQUIDATION_THRESHOLD < LIQUIDATION_PRECISION);
        assert!(LIQUIDATION_BONUS < LIQUIDATION_PRECISION);
        assert!(MIN_HEALTH_FACTOR < MAX_HEALTH_FACTOR);
    }
}
