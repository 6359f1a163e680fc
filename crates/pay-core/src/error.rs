//! # Payment Error Types
//!
//! Typed error handling for the pay-relay service.
//! All payment operations return `Result<T, PaymentError>`.

use thiserror::Error;

/// Core error type for all payment operations
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller omitted or malformed a required field
    #[error("{0}")]
    Validation(String),

    /// Payment provider rejected the call (message passed through)
    #[error("{message}")]
    Provider { provider: String, message: String },

    /// Payment provider did not answer within the configured timeout
    #[error("{provider} did not respond within {timeout_secs} seconds")]
    ProviderTimeout { provider: String, timeout_secs: u64 },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    Network(String),

    /// Webhook signature verification failed
    #[error("Webhook signature verification failed: {0}")]
    SignatureVerification(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PaymentError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        PaymentError::Validation(message.into())
    }

    /// Returns true if the caller may retry the request as-is.
    ///
    /// Nothing is retried internally.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentError::Network(_) | PaymentError::ProviderTimeout { .. }
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            PaymentError::Configuration(_) => 500,
            PaymentError::Validation(_) => 400,
            PaymentError::Provider { .. } => 500,
            PaymentError::ProviderTimeout { .. } => 504,
            PaymentError::Network(_) => 500,
            PaymentError::SignatureVerification(_) => 400,
            PaymentError::WebhookParse(_) => 400,
            PaymentError::Serialization(_) => 500,
        }
    }
}

/// Result type alias for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;
