use leadpay_common::LeadpayError;
use thiserror::Error;

/// Stripe-specific error types.
#[derive(Error, Debug)]
pub enum StripeError {
    /// Error occurred during a Stripe API request
    #[error("Stripe API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Error returned by the Stripe API
    #[error("Stripe API returned an error: {message} (Status: {status_code})")]
    ApiError { status_code: u16, message: String },

    /// Error parsing Stripe API response
    #[error("Failed to parse Stripe API response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Missing or incomplete Stripe configuration
    #[error("Stripe configuration missing or incomplete: {0}")]
    ConfigError(String),

    /// Stripe created a session but returned no hosted checkout URL
    #[error("Stripe response missing checkout URL for session {0}")]
    MissingCheckoutUrl(String),

    /// Webhook signature verification failed
    #[error("Stripe webhook signature verification failed: {0}")]
    WebhookSignatureError(String),

    /// Webhook event processing error
    #[error("Stripe webhook event processing error: {0}")]
    WebhookProcessingError(String),

    /// Internal processing error
    #[error("Internal processing error: {0}")]
    InternalError(String),
}

/// Webhook responses go to Stripe, not to end users, so they keep the detail.
impl From<StripeError> for LeadpayError {
    fn from(err: StripeError) -> Self {
        match err {
            StripeError::WebhookSignatureError(msg) => {
                LeadpayError::AuthError(format!("Invalid signature: {}", msg))
            }
            StripeError::ConfigError(msg) => LeadpayError::ConfigError(msg),
            other => LeadpayError::InternalError(format!("Webhook processing error: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadpay_common::HttpStatusCode;

    #[test]
    fn test_signature_errors_are_bad_requests() {
        let err = StripeError::WebhookSignatureError("Signature mismatch".to_string());
        let converted = LeadpayError::from(err);
        assert_eq!(converted.status_code(), 400);
        assert_eq!(
            converted.to_string(),
            "Invalid signature: Signature mismatch"
        );
    }

    #[test]
    fn test_api_errors_become_internal() {
        let err = StripeError::ApiError {
            status_code: 404,
            message: "No such checkout.session".to_string(),
        };
        assert_eq!(LeadpayError::from(err).status_code(), 500);
    }
}
