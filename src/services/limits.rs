//! Withdrawal amount limits.
//!
//! The range check is pure; the daily usage it is checked against is read
//! inside the initiation transaction so concurrent requests cannot both
//! slip under the ceiling.

use crate::error::{AppError, AppResult, DomainError, ValidationError};

/// Smallest withdrawal accepted, in credits
pub const MIN_WITHDRAWAL: i64 = 10;
/// Largest single withdrawal, in credits
pub const MAX_WITHDRAWAL: i64 = 10_000;
/// Ceiling on credits committed to withdrawals per UTC day
pub const DAILY_LIMIT: i64 = 50_000;

/// Reject amounts outside [MIN_WITHDRAWAL, MAX_WITHDRAWAL].
pub fn check_amount_range(amount_credits: i64) -> AppResult<()> {
    if amount_credits < MIN_WITHDRAWAL || amount_credits > MAX_WITHDRAWAL {
        return Err(AppError::validation(ValidationError::OutOfRange {
            field: "amount_credits".to_string(),
            min: Some(MIN_WITHDRAWAL),
            max: Some(MAX_WITHDRAWAL),
        }));
    }
    Ok(())
}

/// Reject a request that would push the day's usage past DAILY_LIMIT.
/// Landing exactly on the limit is allowed.
pub fn check_daily_limit(used_today: i64, requested: i64) -> AppResult<()> {
    if used_today + requested > DAILY_LIMIT {
        return Err(AppError::domain(DomainError::DailyLimitExceeded {
            limit: DAILY_LIMIT,
            used: used_today,
            requested,
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_range_boundaries() {
        assert!(check_amount_range(MIN_WITHDRAWAL).is_ok());
        assert!(check_amount_range(MAX_WITHDRAWAL).is_ok());
        assert!(check_amount_range(MIN_WITHDRAWAL - 1).is_err());
        assert!(check_amount_range(MAX_WITHDRAWAL + 1).is_err());
        assert!(check_amount_range(0).is_err());
        assert!(check_amount_range(-5).is_err());
    }

    #[test]
    fn test_daily_limit_boundary_inclusive() {
        // 49,990 + 10 lands exactly on the limit and is allowed
        assert!(check_daily_limit(49_990, 10).is_ok());
        // 49,990 + 20 crosses it
        assert!(check_daily_limit(49_990, 20).is_err());
        assert!(check_daily_limit(0, MAX_WITHDRAWAL).is_ok());
        assert!(check_daily_limit(DAILY_LIMIT, 10).is_err());
    }
}
