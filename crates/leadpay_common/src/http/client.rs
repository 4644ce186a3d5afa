use once_cell::sync::Lazy;
use reqwest::{Client, Error as ReqwestError};
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shared client for outbound calls to Stripe and Firestore.
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    create_client(DEFAULT_TIMEOUT_SECS).unwrap_or_else(|err| {
        tracing::warn!("Falling back to default HTTP client: {}", err);
        Client::new()
    })
});

/// Creates a new HTTP client with the given timeout.
pub fn create_client(timeout_secs: u64) -> Result<Client, ReqwestError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Pulls `error.message` out of a Stripe or Google API error body, falling back to the raw body.
pub fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message_extracts_nested_message() {
        let body = r#"{"error":{"message":"No such checkout.session: cs_x","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "No such checkout.session: cs_x");
    }

    #[test]
    fn test_api_error_message_falls_back_to_body() {
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(api_error_message(r#"{"error":"flat"}"#), r#"{"error":"flat"}"#);
    }
}
