//! Fixed-point arithmetic for the engine.
//!
//! Amounts, USD values and health factors are unsigned integers scaled by
//! [`PRECISION`] (1e18). Products of two scaled values do not fit in `u128`,
//! so every multiply-then-divide goes through a 256-bit intermediate. All
//! multiplications happen before any division.

use primitive_types::U256;

use crate::error::{Error, Result};
use crate::utils::constants::{
    LIQUIDATION_BONUS, LIQUIDATION_PRECISION, LIQUIDATION_THRESHOLD, MAX_HEALTH_FACTOR,
    PRECISION, PRECISION_DECIMALS,
};

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Computes `a * b / c` with a 256-bit intermediate, rounding down
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    if result > U256::from(u128::MAX) {
        return Err(Error::Overflow {
            operation: format!("({} * {}) / {}", a, b, c),
        });
    }
    Ok(result.low_u128())
}

/// Like [`mul_div`] but clamps results that exceed `u128` to `u128::MAX`
fn mul_div_saturating(a: u128, b: u128, c: u128) -> u128 {
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    if result > U256::from(u128::MAX) {
        u128::MAX
    } else {
        result.low_u128()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE CALCULATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Lift a raw feed answer with `decimals` decimals to the 1e18 scale
pub fn normalize_price(answer: i128, decimals: u8) -> Result<u128> {
    if answer <= 0 {
        return Err(Error::StaleOrInvalidPrice(format!(
            "non-positive answer {}",
            answer
        )));
    }
    let answer = answer as u128;

    if decimals <= PRECISION_DECIMALS {
        let scale = 10u128.pow((PRECISION_DECIMALS - decimals) as u32);
        answer.checked_mul(scale).ok_or(Error::Overflow {
            operation: format!("normalize {} with {} decimals", answer, decimals),
        })
    } else {
        let excess = (decimals - PRECISION_DECIMALS) as u32;
        let scale = 10u128.checked_pow(excess).ok_or(Error::Overflow {
            operation: format!("feed decimals {}", decimals),
        })?;
        Ok(answer / scale)
    }
}

/// USD value (1e18 scale) of `amount` units at a normalized price
pub fn usd_value(price: u128, amount: u128) -> Result<u128> {
    mul_div(price, amount, PRECISION)
}

/// Units of an asset worth `usd_amount` at a normalized price
pub fn token_amount_from_usd(usd_amount: u128, price: u128) -> Result<u128> {
    if price == 0 {
        return Err(Error::StaleOrInvalidPrice("zero price".into()));
    }
    mul_div(usd_amount, PRECISION, price)
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH FACTOR CALCULATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Calculate the health factor of a position
///
/// # Arguments
/// * `debt_minted` - Synthetic asset minted against the position (1e18 scale)
/// * `collateral_value_usd` - Total collateral value in USD (1e18 scale)
///
/// # Returns
/// `collateral_value * 50 / 100 * 1e18 / debt`, or [`MAX_HEALTH_FACTOR`] when
/// there is no debt. Values beyond `u128` saturate.
pub fn calculate_health_factor(debt_minted: u128, collateral_value_usd: u128) -> u128 {
    if debt_minted == 0 {
        return MAX_HEALTH_FACTOR;
    }
    // Never exceeds collateral_value_usd, so it fits
    let adjusted = mul_div_saturating(
        collateral_value_usd,
        LIQUIDATION_THRESHOLD,
        LIQUIDATION_PRECISION,
    );
    mul_div_saturating(adjusted, PRECISION, debt_minted)
}

/// Collateral awarded to a liquidator on top of `token_amount`
pub fn liquidation_bonus(token_amount: u128) -> u128 {
    mul_div_saturating(token_amount, LIQUIDATION_BONUS, LIQUIDATION_PRECISION)
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNIT CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a decimal string such as `"2000"` or `"0.9"` into an integer with
/// `decimals` implied decimals
pub fn parse_units(value: &str, decimals: u8) -> Result<u128> {
    let invalid = |reason: &str| Error::InvalidParameter {
        name: "amount".into(),
        reason: format!("{:?}: {}", value, reason),
    };

    let cleaned: String = value.trim().chars().filter(|c| *c != '_').collect();
    if cleaned.is_empty() {
        return Err(invalid("empty"));
    }

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (cleaned.as_str(), ""),
    };
    if fraction.len() > decimals as usize {
        return Err(invalid("too many decimal places"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a decimal number"));
    }

    let scale = decimal_scale(decimals)?;
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid("out of range"))?
    };
    let fraction: u128 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded.parse().map_err(|_| invalid("out of range"))?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or_else(|| invalid("out of range"))
}

/// `10^decimals`, failing when it does not fit in a `u128`
fn decimal_scale(decimals: u8) -> Result<u128> {
    10u128
        .checked_pow(decimals as u32)
        .ok_or_else(|| Error::InvalidParameter {
            name: "decimals".into(),
            reason: format!("10^{} does not fit in 128 bits", decimals),
        })
}

/// Format an integer with `decimals` implied decimals, trimming trailing zeros
pub fn format_units(value: u128, decimals: u8) -> String {
    let decimals = decimals as usize;
    let digits = format!("{:0>width$}", value, width = decimals + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Format a health factor, rendering the no-debt sentinel as infinity
pub fn format_health_factor(health_factor: u128) -> String {
    if health_factor == MAX_HEALTH_FACTOR {
        "∞".to_string()
    } else {
        format_units(health_factor, PRECISION_DECIMALS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{ADDITIONAL_FEED_PRECISION, FEED_DECIMALS};

    const E18: u128 = PRECISION;

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 15e18 * 2000e18 overflows u128 but the quotient does not
        let value = mul_div(15 * E18, 2000 * E18, E18).unwrap();
        assert_eq!(value, 30_000 * E18);
    }

    #[test]
    fn test_mul_div_errors() {
        assert!(matches!(
            mul_div(1, 1, 0),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            mul_div(u128::MAX, u128::MAX, 1),
            Err(Error::Overflow { .. })
        ));
    }

    #[test]
    fn test_normalize_price() {
        assert_eq!(
            normalize_price(2000 * 100_000_000, FEED_DECIMALS).unwrap(),
            2000 * 100_000_000 * ADDITIONAL_FEED_PRECISION
        );
        assert_eq!(normalize_price(2000, 0).unwrap(), 2000 * E18);
        assert_eq!(normalize_price((2000 * E18 * 100) as i128, 20).unwrap(), 2000 * E18);
        assert!(matches!(
            normalize_price(0, 8),
            Err(Error::StaleOrInvalidPrice(_))
        ));
        assert!(normalize_price(-5, 8).is_err());
    }

    #[test]
    fn test_usd_value_and_inverse() {
        let price = 2000 * E18;
        assert_eq!(usd_value(price, 15 * E18).unwrap(), 30_000 * E18);
        assert_eq!(token_amount_from_usd(30_000 * E18, price).unwrap(), 15 * E18);
        assert!(token_amount_from_usd(1, 0).is_err());
    }

    #[test]
    fn test_health_factor() {
        assert_eq!(calculate_health_factor(0, 0), MAX_HEALTH_FACTOR);
        assert_eq!(calculate_health_factor(100 * E18, 20_000 * E18), 100 * E18);
        assert_eq!(calculate_health_factor(100 * E18, 180 * E18), E18 * 9 / 10);
        assert_eq!(calculate_health_factor(100 * E18, 0), 0);
    }

    #[test]
    fn test_health_factor_saturates() {
        assert_eq!(calculate_health_factor(1, u128::MAX), u128::MAX);
    }

    #[test]
    fn test_liquidation_bonus() {
        assert_eq!(liquidation_bonus(100), 10);
        assert_eq!(liquidation_bonus(9), 0);
    }

    #[test]
    fn test_parse_units() {
        assert_eq!(parse_units("15", 18).unwrap(), 15 * E18);
        assert_eq!(parse_units("0.9", 18).unwrap(), E18 * 9 / 10);
        assert_eq!(parse_units("2_000", 8).unwrap(), 200_000_000_000);
        assert_eq!(parse_units(".5", 1).unwrap(), 5);
        assert!(parse_units("", 18).is_err());
        assert!(parse_units("1.23", 1).is_err());
        assert!(parse_units("abc", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
        assert!(matches!(
            parse_units("1", 40),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(15 * E18, 18), "15");
        assert_eq!(format_units(E18 * 9 / 10, 18), "0.9");
        assert_eq!(format_units(5_555_555_555_555_555_555, 18), "5.555555555555555555");
        assert_eq!(format_units(1, 40), "0.0000000000000000000000000000000000000001");
        assert_eq!(format_units(0, 40), "0");
        assert_eq!(format_health_factor(MAX_HEALTH_FACTOR), "∞");
        assert_eq!(format_health_factor(100 * E18), "100");
    }
}
