use std::fmt;
use thiserror::Error;

/// The error type every LeadPay HTTP handler returns.
///
/// The `Display` output is what the client sees in the `error` field of the
/// response body, so variants carry client-safe messages only. Crate-specific
/// errors are logged where they happen and then converted into one of these.
#[derive(Error, Debug)]
pub enum LeadpayError {
    /// The request is missing data or carries invalid values
    #[error("{0}")]
    ValidationError(String),

    /// The checkout session exists but has not been paid
    #[error("Payment not completed")]
    PaymentNotCompleted,

    /// A call to the payment processor or document store failed
    #[error("{0}")]
    UpstreamError(String),

    /// Missing or incomplete server configuration
    #[error("{0}")]
    ConfigError(String),

    /// The referenced record does not exist
    #[error("{0}")]
    NotFoundError(String),

    /// Signature or credential checks failed
    #[error("{0}")]
    AuthError(String),

    /// The feature backing this endpoint is turned off
    #[error("{0}")]
    DisabledError(String),

    #[error("{0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for LeadpayError {
    fn status_code(&self) -> u16 {
        match self {
            LeadpayError::ValidationError(_) => 400,
            LeadpayError::PaymentNotCompleted => 400,
            LeadpayError::UpstreamError(_) => 500,
            LeadpayError::ConfigError(_) => 500,
            LeadpayError::NotFoundError(_) => 404,
            LeadpayError::AuthError(_) => 400,
            LeadpayError::DisabledError(_) => 503,
            LeadpayError::InternalError(_) => 500,
        }
    }
}

// Utility functions for error handling
pub fn validation_error<T: fmt::Display>(message: T) -> LeadpayError {
    LeadpayError::ValidationError(message.to_string())
}

pub fn upstream_error<T: fmt::Display>(message: T) -> LeadpayError {
    LeadpayError::UpstreamError(message.to_string())
}

pub fn config_error<T: fmt::Display>(message: T) -> LeadpayError {
    LeadpayError::ConfigError(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> LeadpayError {
    LeadpayError::NotFoundError(message.to_string())
}

pub fn disabled<T: fmt::Display>(message: T) -> LeadpayError {
    LeadpayError::DisabledError(message.to_string())
}
