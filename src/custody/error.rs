use crate::error::{AppError, AppErrorKind, ExternalError};
use thiserror::Error;

pub type CustodyResult<T> = Result<T, CustodyError>;

/// Errors from the custody service boundary
#[derive(Debug, Clone, Error)]
pub enum CustodyError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Custody API error: HTTP {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Invalid custody response: {message}")]
    InvalidResponse { message: String },

    #[error("Webhook verification failed: {message}")]
    WebhookVerification { message: String },
}

impl CustodyError {
    pub fn is_retryable(&self) -> bool {
        match self {
            CustodyError::Network { .. } => true,
            CustodyError::Api { retryable, .. } => *retryable,
            CustodyError::InvalidResponse { .. } => false,
            CustodyError::WebhookVerification { .. } => false,
        }
    }
}

impl From<CustodyError> for AppError {
    fn from(err: CustodyError) -> Self {
        let is_retryable = err.is_retryable();
        AppError::new(AppErrorKind::External(ExternalError::Custody {
            message: err.to_string(),
            is_retryable,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_errors_are_retryable() {
        let err = CustodyError::Network {
            message: "connection reset".to_string(),
        };
        assert!(err.is_retryable());

        let app: AppError = err.into();
        assert_eq!(app.status_code(), 502);
        assert!(app.is_retryable());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let err = CustodyError::Api {
            status: 400,
            message: "bad request".to_string(),
            retryable: false,
        };
        assert!(!err.is_retryable());
    }
}
