//! Typed wrapper over the checkout endpoints of the LeadPay backend.

use crate::error::ClientError;
use reqwest::{Client, Response};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

const SESSION_FAILED: &str = "Payment session creation failed";
const VERIFICATION_FAILED: &str = "Payment verification failed";

/// Where to send the buyer: the hosted checkout page of a new session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutRedirect {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPayment {
    pub success: bool,
    #[serde(default)]
    pub lead_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutRequest<'a> {
    lead_id: &'a str,
    amount: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    session_id: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Converts a dollar amount to whole cents, rounding half away from zero.
pub fn dollars_to_cents(amount: Decimal) -> Result<i64, ClientError> {
    let cents = amount
        .checked_mul(Decimal::from(100))
        .map(|c| c.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|c| c.to_i64())
        .ok_or_else(|| ClientError::InvalidAmount(amount.to_string()))?;
    if cents <= 0 {
        return Err(ClientError::InvalidAmount(amount.to_string()));
    }
    Ok(cents)
}

#[derive(Debug, Clone)]
pub struct LeadpayClient {
    http: Client,
    api_url: String,
}

impl Default for LeadpayClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl LeadpayClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), api_url)
    }

    pub fn with_client(http: Client, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.api_url, path)
    }

    /// Opens a checkout session for a lead priced in dollars.
    ///
    /// The caller redirects the buyer to the returned `url`.
    pub async fn create_payment_session(
        &self,
        lead_id: &str,
        amount: Decimal,
    ) -> Result<CheckoutRedirect, ClientError> {
        let cents = dollars_to_cents(amount)?;
        debug!("Requesting checkout for lead {} ({} cents)", lead_id, cents);

        let response = self
            .http
            .post(self.endpoint("create-checkout-session"))
            .json(&CheckoutRequest {
                lead_id,
                amount: cents,
            })
            .send()
            .await?;
        let response = ensure_success(response, SESSION_FAILED).await?;
        Ok(response.json().await?)
    }

    /// Confirms the session the checkout page redirected back with.
    pub async fn handle_payment_success(
        &self,
        session_id: &str,
    ) -> Result<VerifiedPayment, ClientError> {
        let response = self
            .http
            .post(self.endpoint("verify-payment"))
            .json(&VerifyRequest { session_id })
            .send()
            .await?;
        let response = ensure_success(response, VERIFICATION_FAILED).await?;
        Ok(response.json().await?)
    }
}

/// Passes successful responses through; otherwise reads `{"error": ...}` or uses `fallback`.
async fn ensure_success(response: Response, fallback: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    error!("LeadPay API returned {}: {}", status, message);
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
