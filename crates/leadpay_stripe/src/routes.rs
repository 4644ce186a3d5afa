use crate::handlers::{
    create_checkout_session_handler, create_payment_handler, stripe_webhook_handler,
    verify_payment_handler, StripeState,
};
use axum::{routing::post, Router};
use leadpay_common::SharedLedger;
use leadpay_config::AppConfig;
use std::sync::Arc;

/// Creates a router containing all routes for the Stripe feature.
///
/// Paths are relative; the backend nests them under `/api`.
pub fn routes(config: Arc<AppConfig>, ledger: Option<SharedLedger>) -> Router {
    let stripe_state = Arc::new(StripeState { config, ledger });

    Router::new()
        .route(
            "/create-checkout-session",
            post(create_checkout_session_handler),
        )
        .route("/verify-payment", post(verify_payment_handler))
        .route("/payments", post(create_payment_handler))
        // Server-to-server notifications from Stripe
        .route("/stripe/webhook", post(stripe_webhook_handler))
        .with_state(stripe_state)
}
