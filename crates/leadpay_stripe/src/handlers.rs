use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use leadpay_common::{
    config_error, disabled, upstream_error, validation_error, LeadpayError, SharedLedger,
};
use leadpay_config::{AppConfig, StripeConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::logic::{
    create_checkout_session, process_stripe_webhook, retrieve_checkout_session,
    verify_stripe_signature, LeadCheckout, StripeEvent,
};

pub const MISSING_PARAMETERS: &str = "Missing required parameters";
pub const NEGATIVE_AMOUNT: &str = "Amount must be a positive number of cents";
pub const SESSION_ID_REQUIRED: &str = "Session ID is required";
pub const CHECKOUT_FAILED: &str = "Failed to create checkout session";
pub const VERIFY_FAILED: &str = "Failed to verify payment";
pub const PAYMENT_SESSION_FAILED: &str = "Payment session creation failed";

// --- State for Stripe Handlers ---
#[derive(Clone)]
pub struct StripeState {
    pub config: Arc<AppConfig>,
    /// Payment ledger; `None` when the document store is disabled.
    pub ledger: Option<SharedLedger>,
}

impl StripeState {
    fn stripe_config(&self) -> Result<&StripeConfig, LeadpayError> {
        if !self.config.use_stripe {
            return Err(disabled("Stripe service is disabled"));
        }
        self.config
            .stripe
            .as_ref()
            .ok_or_else(|| disabled("Stripe service is disabled"))
    }
}

// --- Request / Response Types ---

/// Body of both checkout endpoints. `amount` is in cents.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateCheckoutSessionRequest {
    #[cfg_attr(feature = "openapi", schema(example = "lead_8f2a"))]
    pub lead_id: Option<String>,
    #[cfg_attr(feature = "openapi", schema(example = 2500))]
    pub amount: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateCheckoutSessionResponse {
    #[cfg_attr(feature = "openapi", schema(example = "cs_test_a1..."))]
    pub id: String,
    #[cfg_attr(
        feature = "openapi",
        schema(example = "https://checkout.stripe.com/c/pay/cs_test_a1...")
    )]
    pub url: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreatePaymentResponse {
    pub session_id: String,
    pub url: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VerifyPaymentRequest {
    #[cfg_attr(feature = "openapi", schema(example = "cs_test_a1..."))]
    pub session_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct VerifyPaymentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<String>,
}

/// Checks lead id and amount, returning them when both are usable.
fn validate_checkout(
    payload: Result<Json<CreateCheckoutSessionRequest>, JsonRejection>,
) -> Result<(String, i64), LeadpayError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected checkout request body: {}", rejection);
        validation_error(MISSING_PARAMETERS)
    })?;

    let lead_id = request
        .lead_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| validation_error(MISSING_PARAMETERS))?;

    match request.amount {
        Some(amount) if amount > 0 => Ok((lead_id, amount)),
        Some(amount) if amount < 0 => Err(validation_error(NEGATIVE_AMOUNT)),
        _ => Err(validation_error(MISSING_PARAMETERS)),
    }
}

/// Creates a Stripe Checkout Session for a lead and returns its id and hosted URL.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/create-checkout-session", // Path relative to /api
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CreateCheckoutSessionResponse),
        (status = 400, description = "Missing required parameters"),
        (status = 500, description = "Stripe API error"),
        (status = 503, description = "Stripe disabled")
    ),
    tag = "Checkout"
))]
pub async fn create_checkout_session_handler(
    State(state): State<Arc<StripeState>>,
    payload: Result<Json<CreateCheckoutSessionRequest>, JsonRejection>,
) -> Result<Json<CreateCheckoutSessionResponse>, LeadpayError> {
    let stripe_config = state.stripe_config()?;
    let (lead_id, amount) = validate_checkout(payload)?;

    let checkout = LeadCheckout {
        lead_id,
        amount,
        payment_id: None,
    };
    let session = create_checkout_session(stripe_config, &state.config.client_url, &checkout)
        .await
        .map_err(|e| {
            error!("Error creating checkout session: {}", e);
            upstream_error(CHECKOUT_FAILED)
        })?;

    Ok(Json(CreateCheckoutSessionResponse {
        id: session.id,
        url: session.url,
    }))
}

/// Confirms with Stripe that a session was paid and returns the lead it unlocks.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/verify-payment", // Path relative to /api
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment confirmed", body = VerifyPaymentResponse),
        (status = 400, description = "Session ID missing or payment not completed"),
        (status = 500, description = "Stripe API error"),
        (status = 503, description = "Stripe disabled")
    ),
    tag = "Checkout"
))]
pub async fn verify_payment_handler(
    State(state): State<Arc<StripeState>>,
    payload: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifyPaymentResponse>, LeadpayError> {
    let stripe_config = state.stripe_config()?;

    let session_id = payload
        .ok()
        .and_then(|Json(request)| request.session_id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| validation_error(SESSION_ID_REQUIRED))?;

    let session = retrieve_checkout_session(stripe_config, &session_id)
        .await
        .map_err(|e| {
            error!("Error verifying payment: {}", e);
            upstream_error(VERIFY_FAILED)
        })?;

    if !session.is_paid() {
        info!(
            "Session {} not paid yet (payment_status {:?})",
            session.id, session.payment_status
        );
        return Err(LeadpayError::PaymentNotCompleted);
    }

    if let (Some(ledger), Some(payment_id)) = (state.ledger.as_ref(), session.payment_id()) {
        // The processor already confirmed the payment; a ledger failure does not undo that.
        if let Err(e) = ledger.mark_paid(payment_id).await {
            error!("Failed to mark payment {} paid: {}", payment_id, e);
        }
    }

    Ok(Json(VerifyPaymentResponse {
        success: true,
        lead_id: session.lead_id().map(String::from),
    }))
}

/// Records a pending payment in the ledger, then opens a checkout session linked to it.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/payments", // Path relative to /api
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Pending payment recorded and checkout session created", body = CreatePaymentResponse),
        (status = 400, description = "Missing required parameters"),
        (status = 500, description = "Ledger or Stripe error"),
        (status = 503, description = "Stripe or ledger disabled")
    ),
    tag = "Checkout"
))]
pub async fn create_payment_handler(
    State(state): State<Arc<StripeState>>,
    payload: Result<Json<CreateCheckoutSessionRequest>, JsonRejection>,
) -> Result<Json<CreatePaymentResponse>, LeadpayError> {
    let stripe_config = state.stripe_config()?;
    let ledger = state
        .ledger
        .as_ref()
        .ok_or_else(|| disabled("Payment ledger is disabled"))?;
    let (lead_id, amount) = validate_checkout(payload)?;

    let payment_id = ledger
        .create_pending_payment(&lead_id, amount)
        .await
        .map_err(|e| {
            error!("Error recording pending payment for lead {}: {}", lead_id, e);
            upstream_error(PAYMENT_SESSION_FAILED)
        })?;

    let checkout = LeadCheckout {
        lead_id,
        amount,
        payment_id: Some(payment_id.clone()),
    };
    let session = create_checkout_session(stripe_config, &state.config.client_url, &checkout)
        .await
        .map_err(|e| {
            error!("Error creating payment session for {}: {}", payment_id, e);
            upstream_error(PAYMENT_SESSION_FAILED)
        })?;

    ledger
        .attach_session(&payment_id, &session.id)
        .await
        .map_err(|e| {
            error!(
                "Error attaching session {} to payment {}: {}",
                session.id, payment_id, e
            );
            upstream_error(PAYMENT_SESSION_FAILED)
        })?;

    Ok(Json(CreatePaymentResponse {
        session_id: session.id,
        url: session.url,
    }))
}

/// Receives Stripe webhook events. The raw body is needed for signature verification.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/stripe/webhook", // Path relative to /api
    responses(
        (status = 200, description = "Webhook received and acknowledged"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 500, description = "Webhook processing error")
    ),
    tag = "Stripe Webhooks"
))]
pub async fn stripe_webhook_handler(
    State(state): State<Arc<StripeState>>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, LeadpayError> {
    let stripe_config = state.stripe_config()?;
    let webhook_secret = stripe_config
        .webhook_secret
        .as_deref()
        .ok_or_else(|| {
            error!("STRIPE_WEBHOOK_SECRET is not configured");
            config_error("Stripe webhook secret is not configured")
        })?;

    let sig_header = headers.get("Stripe-Signature").and_then(|h| h.to_str().ok());
    verify_stripe_signature(
        body.as_bytes(),
        sig_header,
        webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        warn!("{}", e);
        LeadpayError::from(e)
    })?;

    let event: StripeEvent = serde_json::from_str(&body).map_err(|e| {
        warn!("Failed to deserialize Stripe webhook event: {}", e);
        validation_error("Invalid payload format")
    })?;

    process_stripe_webhook(event, state.ledger.as_ref())
        .await
        .map_err(|e| {
            error!("Error processing Stripe webhook: {}", e);
            LeadpayError::from(e)
        })?;

    Ok(StatusCode::OK)
}
