use hmac::{Hmac, Mac};
use leadpay_common::{api_error_message, SharedLedger, HTTP_CLIENT};
use leadpay_config::StripeConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::error::StripeError;

/// Metadata key carrying the lead being bought.
pub const METADATA_LEAD_ID: &str = "leadId";
/// Metadata key carrying the ledger payment record, when one exists.
pub const METADATA_PAYMENT_ID: &str = "paymentId";

/// Maximum age of a webhook signature timestamp.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

// --- Data Structures ---

/// What is being sold in one checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadCheckout {
    pub lead_id: String,
    /// Smallest currency unit (cents).
    pub amount: i64,
    /// Ledger record to link, stored as session metadata.
    pub payment_id: Option<String>,
}

/// A created checkout session: its id and the hosted page to redirect to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Deserialize, Debug)]
struct StripeCheckoutSessionApiResponse {
    pub id: String,
    pub url: Option<String>,
}

/// A checkout session as retrieved from Stripe. Only the fields we read.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct StripeCheckoutSessionData {
    pub id: String,
    pub object: Option<String>, // "checkout.session"
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
    pub payment_status: Option<String>, // "paid", "unpaid", "no_payment_required"
    pub status: Option<String>,         // "open", "complete", "expired"
    pub url: Option<String>,
    pub created: Option<i64>,
}

impl StripeCheckoutSessionData {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    pub fn lead_id(&self) -> Option<&str> {
        self.metadata_value(METADATA_LEAD_ID)
    }

    pub fn payment_id(&self) -> Option<&str> {
        self.metadata_value(METADATA_PAYMENT_ID)
    }
}

/// Represents the `data` field within a Stripe Event.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeEventData {
    /// The object the event is about; its shape depends on the event type.
    pub object: serde_json::Value,
}

/// Represents the outer Stripe Event object.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

// --- Core Logic Functions ---

fn secret_key(stripe_config: &StripeConfig) -> Result<&str, StripeError> {
    stripe_config
        .secret_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| StripeError::ConfigError("STRIPE_SECRET_KEY is not set".to_string()))
}

/// Builds `{api_base}/seg/seg/...`, percent-encoding each segment.
fn endpoint(api_base: &str, segments: &[&str]) -> Result<Url, StripeError> {
    let mut url = Url::parse(api_base)
        .map_err(|e| StripeError::ConfigError(format!("Invalid Stripe api_base: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| StripeError::ConfigError("Stripe api_base cannot be a base URL".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Form body for `POST /v1/checkout/sessions`.
pub fn checkout_form(
    stripe_config: &StripeConfig,
    client_url: &str,
    checkout: &LeadCheckout,
) -> Vec<(String, String)> {
    let mut form_body: Vec<(String, String)> = vec![
        ("payment_method_types[]".to_string(), "card".to_string()),
        ("mode".to_string(), "payment".to_string()),
        (
            "success_url".to_string(),
            stripe_config.success_url(client_url),
        ),
        (
            "cancel_url".to_string(),
            stripe_config.cancel_url(client_url),
        ),
        (
            "line_items[0][price_data][currency]".to_string(),
            stripe_config.currency.to_lowercase(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            stripe_config.product_name.clone(),
        ),
        (
            "line_items[0][price_data][product_data][description]".to_string(),
            format!("Access to lead details (ID: {})", checkout.lead_id),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            checkout.amount.to_string(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            format!("metadata[{}]", METADATA_LEAD_ID),
            checkout.lead_id.clone(),
        ),
    ];
    if let Some(payment_id) = &checkout.payment_id {
        form_body.push((
            format!("metadata[{}]", METADATA_PAYMENT_ID),
            payment_id.clone(),
        ));
    }
    form_body
}

/// Creates a Stripe Checkout Session for one lead.
pub async fn create_checkout_session(
    stripe_config: &StripeConfig,
    client_url: &str,
    checkout: &LeadCheckout,
) -> Result<CheckoutSession, StripeError> {
    info!(
        "[Stripe Logic] Creating Checkout Session for lead {} ({} {})",
        checkout.lead_id, checkout.amount, stripe_config.currency
    );

    let secret_key = secret_key(stripe_config)?;
    let api_url = endpoint(&stripe_config.api_base, &["v1", "checkout", "sessions"])?;
    let form_body = checkout_form(stripe_config, client_url, checkout);

    let response = HTTP_CLIENT
        .post(api_url)
        .basic_auth(secret_key, None::<&str>)
        .form(&form_body)
        .send()
        .await?;

    let status = response.status();
    let body_text = response.text().await?;

    if !status.is_success() {
        let message = api_error_message(&body_text);
        error!(
            "[Stripe Logic] Stripe API request failed with HTTP status: {}. Message: {}",
            status, message
        );
        return Err(StripeError::ApiError {
            status_code: status.as_u16(),
            message,
        });
    }

    let stripe_response: StripeCheckoutSessionApiResponse = serde_json::from_str(&body_text)?;
    match stripe_response.url {
        Some(url) => {
            info!(
                "[Stripe Logic] Checkout Session {} created",
                stripe_response.id
            );
            Ok(CheckoutSession {
                id: stripe_response.id,
                url,
            })
        }
        None => Err(StripeError::MissingCheckoutUrl(stripe_response.id)),
    }
}

/// Retrieves a Stripe Checkout Session.
pub async fn retrieve_checkout_session(
    stripe_config: &StripeConfig,
    session_id: &str,
) -> Result<StripeCheckoutSessionData, StripeError> {
    info!(
        "[Stripe Logic] Retrieving Checkout Session details for ID: {}",
        session_id
    );

    let secret_key = secret_key(stripe_config)?;
    let api_url = endpoint(
        &stripe_config.api_base,
        &["v1", "checkout", "sessions", session_id],
    )?;

    let response = HTTP_CLIENT
        .get(api_url)
        .basic_auth(secret_key, None::<&str>)
        .send()
        .await?;

    let status = response.status();
    let body_text = response.text().await?;

    if status.is_success() {
        let session_data: StripeCheckoutSessionData = serde_json::from_str(&body_text)?;
        Ok(session_data)
    } else {
        let message = api_error_message(&body_text);
        error!(
            "[Stripe Logic] Failed to retrieve session {}: {} - {}",
            session_id, status, message
        );
        Err(StripeError::ApiError {
            status_code: status.as_u16(),
            message,
        })
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `"{timestamp}.{payload}"`, the `v1` scheme Stripe signs webhooks with.
pub fn compute_signature(
    payload: &[u8],
    secret: &str,
    timestamp: &str,
) -> Result<String, StripeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        StripeError::WebhookSignatureError("Invalid webhook secret format for HMAC".to_string())
    })?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a `Stripe-Signature` header (`t=...,v1=...[,v1=...]`) against the raw body.
///
/// `now` is the current Unix time; signatures older or newer than
/// [`SIGNATURE_TOLERANCE_SECS`] are rejected.
pub fn verify_stripe_signature(
    payload: &[u8],
    sig_header: Option<&str>,
    secret: &str,
    now: i64,
) -> Result<(), StripeError> {
    let header = sig_header.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing Stripe-Signature header".to_string())
    })?;

    let mut timestamp_str = None;
    let mut v1_signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp_str = Some(value),
            Some(("v1", value)) => v1_signatures.push(value),
            _ => {}
        }
    }

    let timestamp_str = timestamp_str.ok_or_else(|| {
        StripeError::WebhookSignatureError("Missing timestamp in signature header".to_string())
    })?;
    let timestamp: i64 = timestamp_str.parse().map_err(|_| {
        StripeError::WebhookSignatureError("Invalid timestamp in signature header".to_string())
    })?;
    if v1_signatures.is_empty() {
        return Err(StripeError::WebhookSignatureError(
            "No v1 signature in header".to_string(),
        ));
    }
    let within_tolerance = now
        .checked_sub(timestamp)
        .map(i64::unsigned_abs)
        .is_some_and(|skew| skew <= SIGNATURE_TOLERANCE_SECS.unsigned_abs());
    if !within_tolerance {
        return Err(StripeError::WebhookSignatureError(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_signature(payload, secret, timestamp_str)?;
    if v1_signatures
        .iter()
        .any(|provided| constant_time_eq(expected.as_bytes(), provided.as_bytes()))
    {
        Ok(())
    } else {
        Err(StripeError::WebhookSignatureError(
            "Signature mismatch".to_string(),
        ))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Processes a verified Stripe webhook event.
///
/// A paid `checkout.session.completed` (or `async_payment_succeeded`) event
/// marks its ledger payment as paid. Everything else is acknowledged and logged.
pub async fn process_stripe_webhook(
    event: StripeEvent,
    ledger: Option<&SharedLedger>,
) -> Result<(), StripeError> {
    info!("Processing Stripe event {} of type {}", event.id, event.event_type);

    match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            let session: StripeCheckoutSessionData = serde_json::from_value(event.data.object)
                .map_err(|e| {
                    StripeError::WebhookProcessingError(format!(
                        "Failed to parse checkout session object: {}",
                        e
                    ))
                })?;

            if !session.is_paid() {
                info!(
                    "Checkout session {} completed with payment status {:?}; nothing to record",
                    session.id, session.payment_status
                );
                return Ok(());
            }

            match (session.payment_id(), ledger) {
                (Some(payment_id), Some(ledger)) => {
                    ledger.mark_paid(payment_id).await.map_err(|e| {
                        StripeError::WebhookProcessingError(format!(
                            "Failed to mark payment {} paid: {}",
                            payment_id, e
                        ))
                    })?;
                    info!(
                        "Payment {} for session {} (lead {:?}) marked paid",
                        payment_id,
                        session.id,
                        session.lead_id()
                    );
                }
                (Some(payment_id), None) => {
                    warn!(
                        "Session {} references payment {} but no ledger is configured",
                        session.id, payment_id
                    );
                }
                (None, _) => {
                    info!(
                        "Session {} for lead {:?} paid; no ledger record attached",
                        session.id,
                        session.lead_id()
                    );
                }
            }
        }
        _ => {
            info!("Received unhandled Stripe event type: {}", event.event_type);
        }
    }
    Ok(())
}
