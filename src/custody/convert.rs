//! Conversion between raw base-unit token amounts and platform credits.
//!
//! Credits are integers pegged 1:1 to a whole stablecoin unit. Raw amounts
//! arrive as decimal strings and can exceed 64-bit range before scaling, so
//! the inbound direction goes through arbitrary-precision decimals.

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("invalid raw amount '{0}'")]
    InvalidAmount(String),
    #[error("negative amount not permitted")]
    NegativeAmount,
    #[error("amount out of range")]
    Overflow,
}

/// Convert a raw base-unit amount to whole credits, truncating toward zero.
///
/// Sub-credit remainders (dust) are never credited; `"999999"` at 6
/// decimals is 0 credits.
pub fn to_credits(raw_amount: &str, decimals: u32) -> Result<i64, ConversionError> {
    let raw = BigDecimal::from_str(raw_amount.trim())
        .map_err(|_| ConversionError::InvalidAmount(raw_amount.to_string()))?;
    if raw.sign() == bigdecimal::num_bigint::Sign::Minus {
        return Err(ConversionError::NegativeAmount);
    }

    // 10^-decimals as an exact decimal
    let factor = BigDecimal::new(BigInt::from(1), decimals as i64);
    let credits = (raw * factor).with_scale_round(0, RoundingMode::Down);
    credits.to_i64().ok_or(ConversionError::Overflow)
}

/// Convert whole credits to a raw base-unit decimal string, exactly.
pub fn to_raw_amount(credits: i64, decimals: u32) -> Result<String, ConversionError> {
    if credits < 0 {
        return Err(ConversionError::NegativeAmount);
    }
    let scale = 10_i128.checked_pow(decimals).ok_or(ConversionError::Overflow)?;
    let raw = (credits as i128)
        .checked_mul(scale)
        .ok_or(ConversionError::Overflow)?;
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncating_division() {
        assert_eq!(to_credits("1500000", 6).unwrap(), 1);
        assert_eq!(to_credits("999999", 6).unwrap(), 0);
        assert_eq!(to_credits("2000000", 6).unwrap(), 2);
        assert_eq!(to_credits("0", 6).unwrap(), 0);
    }

    #[test]
    fn test_amounts_beyond_u64_before_scaling() {
        // 10^30 base units at 6 decimals = 10^24 credits, out of i64 range
        let huge = "1000000000000000000000000000000";
        assert_eq!(to_credits(huge, 6), Err(ConversionError::Overflow));

        // but a large-yet-representable value converts fine
        assert_eq!(to_credits("9223372036854775807000000", 6).unwrap(), i64::MAX);
    }

    #[test]
    fn test_invalid_and_negative_inputs() {
        assert!(matches!(
            to_credits("not-a-number", 6),
            Err(ConversionError::InvalidAmount(_))
        ));
        assert_eq!(to_credits("-1000000", 6), Err(ConversionError::NegativeAmount));
    }

    #[test]
    fn test_to_raw_amount_exact() {
        assert_eq!(to_raw_amount(1, 6).unwrap(), "1000000");
        assert_eq!(to_raw_amount(10_000, 6).unwrap(), "10000000000");
        assert_eq!(to_raw_amount(0, 6).unwrap(), "0");
        assert_eq!(to_raw_amount(-5, 6), Err(ConversionError::NegativeAmount));
    }

    #[test]
    fn test_round_trip_of_whole_credits() {
        let raw = to_raw_amount(250, 6).unwrap();
        assert_eq!(to_credits(&raw, 6).unwrap(), 250);
    }
}
