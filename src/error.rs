//! Unified error handling for the custody-backed credits ledger.
//!
//! One error system with HTTP status mapping, user-facing messages, and
//! structured error codes for client handling. Webhook processing does not
//! use these types: problems on that path are logged and the event is
//! dropped (the custody sender is always acknowledged once its signature
//! checks out).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::database::types::WithdrawalStatus;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    // Domain errors (4xx)
    #[serde(rename = "INSUFFICIENT_BALANCE")]
    InsufficientBalance,
    #[serde(rename = "DAILY_LIMIT_EXCEEDED")]
    DailyLimitExceeded,
    #[serde(rename = "INVALID_STATE_TRANSITION")]
    InvalidStateTransition,
    #[serde(rename = "WITHDRAWAL_NOT_FOUND")]
    WithdrawalNotFound,
    #[serde(rename = "TRANSACTION_NOT_FOUND")]
    TransactionNotFound,
    #[serde(rename = "USER_NOT_FOUND")]
    UserNotFound,
    #[serde(rename = "WALLET_NOT_FOUND")]
    WalletNotFound,
    #[serde(rename = "CHAIN_NOT_CONFIGURED")]
    ChainNotConfigured,
    #[serde(rename = "UNSUPPORTED_TOKEN")]
    UnsupportedToken,

    // Infrastructure errors (5xx)
    #[serde(rename = "DATABASE_ERROR")]
    DatabaseError,
    #[serde(rename = "CONFIGURATION_ERROR")]
    ConfigurationError,

    // External errors (502)
    #[serde(rename = "CUSTODY_SERVICE_ERROR")]
    CustodyServiceError,

    // Generic
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
    #[serde(rename = "VALIDATION_ERROR")]
    ValidationError,
}

/// Domain-specific business logic errors
#[derive(Debug, Clone)]
pub enum DomainError {
    /// The user's credit balance cannot cover the requested withdrawal
    InsufficientBalance { available: i64, required: i64 },
    /// The per-UTC-day withdrawal ceiling would be exceeded
    DailyLimitExceeded {
        limit: i64,
        used: i64,
        requested: i64,
    },
    /// The withdrawal request is not in a state that permits the action
    InvalidStateTransition {
        current: WithdrawalStatus,
        attempted: WithdrawalStatus,
    },
    /// Withdrawal request with given ID doesn't exist
    WithdrawalNotFound { id: Uuid },
    /// Crypto transaction with given ID doesn't exist (for this user)
    TransactionNotFound { id: Uuid },
    /// User record doesn't exist
    UserNotFound { user_id: i64 },
    /// No active MPC wallet for this user on this chain
    WalletNotFound { user_id: i64, chain_id: i64 },
    /// The chain directory has no entry for this chain
    ChainNotConfigured { chain_id: i64 },
    /// The token is not available (or has no contract address) on the chain
    UnsupportedToken { symbol: String, chain_name: String },
}

/// Infrastructure-level errors (database, configuration)
#[derive(Debug, Clone)]
pub enum InfrastructureError {
    /// Database connection or query failure
    Database { message: String, is_retryable: bool },
    /// Missing or invalid configuration
    Configuration { message: String },
}

/// External service errors (the custody collaborator)
#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Custody service call failed (wallet creation, transfer initiation)
    Custody { message: String, is_retryable: bool },
}

/// Input validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Unknown or disabled chain name
    InvalidChain { name: String },
    /// Unsupported token symbol
    InvalidToken { symbol: String },
    /// Destination address doesn't match the chain's address format
    InvalidAddress { address: String, chain: String },
    /// Field value out of acceptable range
    OutOfRange {
        field: String,
        min: Option<i64>,
        max: Option<i64>,
    },
    /// Required field missing or empty
    MissingField { field: String },
    /// Field value not among the accepted values
    InvalidValue { field: String, value: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn domain(err: DomainError) -> Self {
        Self::new(AppErrorKind::Domain(err))
    }

    pub fn validation(err: ValidationError) -> Self {
        Self::new(AppErrorKind::Validation(err))
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InsufficientBalance { .. } => 422,
                DomainError::DailyLimitExceeded { .. } => 422,
                DomainError::InvalidStateTransition { .. } => 409, // Conflict
                DomainError::WithdrawalNotFound { .. } => 404,
                DomainError::TransactionNotFound { .. } => 404,
                DomainError::UserNotFound { .. } => 404,
                // Approve-time setup problems: recoverable by the admin,
                // request stays PENDING.
                DomainError::WalletNotFound { .. } => 422,
                DomainError::ChainNotConfigured { .. } => 422,
                DomainError::UnsupportedToken { .. } => 422,
            },
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(ExternalError::Custody { .. }) => 502, // Bad Gateway
            AppErrorKind::Validation(_) => 400,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
                DomainError::DailyLimitExceeded { .. } => ErrorCode::DailyLimitExceeded,
                DomainError::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
                DomainError::WithdrawalNotFound { .. } => ErrorCode::WithdrawalNotFound,
                DomainError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
                DomainError::UserNotFound { .. } => ErrorCode::UserNotFound,
                DomainError::WalletNotFound { .. } => ErrorCode::WalletNotFound,
                DomainError::ChainNotConfigured { .. } => ErrorCode::ChainNotConfigured,
                DomainError::UnsupportedToken { .. } => ErrorCode::UnsupportedToken,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(ExternalError::Custody { .. }) => ErrorCode::CustodyServiceError,
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::InsufficientBalance {
                    available,
                    required,
                } => {
                    format!(
                        "Insufficient balance. Available: {} credits, Required: {} credits",
                        available, required
                    )
                }
                DomainError::DailyLimitExceeded {
                    limit,
                    used,
                    requested,
                } => {
                    format!(
                        "Daily withdrawal limit exceeded. Limit: {}, Used today: {}, Requested: {}",
                        limit, used, requested
                    )
                }
                DomainError::InvalidStateTransition { current, attempted } => {
                    format!(
                        "Cannot move withdrawal from {} to {}",
                        current.as_str(),
                        attempted.as_str()
                    )
                }
                DomainError::WithdrawalNotFound { id } => {
                    format!("Withdrawal request '{}' not found", id)
                }
                DomainError::TransactionNotFound { id } => {
                    format!("Transaction '{}' not found", id)
                }
                DomainError::UserNotFound { user_id } => {
                    format!("User {} not found", user_id)
                }
                DomainError::WalletNotFound { user_id, chain_id } => {
                    format!(
                        "No active wallet for user {} on chain {}",
                        user_id, chain_id
                    )
                }
                DomainError::ChainNotConfigured { chain_id } => {
                    format!("Chain {} is not configured", chain_id)
                }
                DomainError::UnsupportedToken { symbol, chain_name } => {
                    format!("Token '{}' is not available on chain '{}'", symbol, chain_name)
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(ExternalError::Custody { is_retryable, .. }) => {
                if *is_retryable {
                    "Custody service is temporarily unavailable. Please try again".to_string()
                } else {
                    "Custody service rejected the request. Please contact support".to_string()
                }
            }
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidChain { name } => {
                    format!("Invalid chain name '{}'", name)
                }
                ValidationError::InvalidToken { symbol } => {
                    format!("Invalid token symbol '{}'. Supported: USDC, USDT", symbol)
                }
                ValidationError::InvalidAddress { address, chain } => {
                    format!("Invalid destination address '{}' for chain '{}'", address, chain)
                }
                ValidationError::OutOfRange { field, min, max } => match (min, max) {
                    (Some(min), Some(max)) => {
                        format!("Field '{}' must be between {} and {}", field, min, max)
                    }
                    (Some(min), None) => {
                        format!("Field '{}' must be at least {}", field, min)
                    }
                    (None, Some(max)) => {
                        format!("Field '{}' must be at most {}", field, max)
                    }
                    (None, None) => {
                        format!("Field '{}' is out of acceptable range", field)
                    }
                },
                ValidationError::MissingField { field } => {
                    format!("Required field '{}' is missing", field)
                }
                ValidationError::InvalidValue { field, value } => {
                    format!("Invalid value '{}' for field '{}'", value, field)
                }
            },
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(ExternalError::Custody { is_retryable, .. }) => *is_retryable,
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

// Note: From<DatabaseError> is implemented in database/error.rs and
// From<CustodyError> in custody/error.rs to keep dependencies one-way.

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_error() {
        let error = AppError::domain(DomainError::InsufficientBalance {
            available: 50,
            required: 100,
        });

        assert_eq!(error.status_code(), 422);
        assert_eq!(error.error_code(), ErrorCode::InsufficientBalance);
        assert!(error.user_message().contains("Insufficient balance"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_invalid_state_transition_error() {
        let error = AppError::domain(DomainError::InvalidStateTransition {
            current: WithdrawalStatus::Rejected,
            attempted: WithdrawalStatus::Approved,
        });

        assert_eq!(error.status_code(), 409);
        assert_eq!(error.error_code(), ErrorCode::InvalidStateTransition);
        assert!(error.user_message().contains("REJECTED"));
    }

    #[test]
    fn test_daily_limit_error() {
        let error = AppError::domain(DomainError::DailyLimitExceeded {
            limit: 50_000,
            used: 49_990,
            requested: 20,
        });

        assert_eq!(error.status_code(), 422);
        assert_eq!(error.error_code(), ErrorCode::DailyLimitExceeded);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_validation_error() {
        let error = AppError::validation(ValidationError::OutOfRange {
            field: "amount".to_string(),
            min: Some(10),
            max: Some(10_000),
        });

        assert_eq!(error.status_code(), 400);
        assert_eq!(error.error_code(), ErrorCode::ValidationError);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_custody_error_is_bad_gateway() {
        let error = AppError::new(AppErrorKind::External(ExternalError::Custody {
            message: "timeout".to_string(),
            is_retryable: true,
        }));

        assert_eq!(error.status_code(), 502);
        assert!(error.is_retryable());
    }
}
