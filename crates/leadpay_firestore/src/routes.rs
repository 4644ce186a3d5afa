use crate::handlers::{claim_lead_handler, FirestoreState};
use axum::{routing::post, Router};
use leadpay_common::SharedLedger;
use std::sync::Arc;

/// Ledger routes, relative to `/api`.
pub fn routes(ledger: Option<SharedLedger>) -> Router {
    let state = Arc::new(FirestoreState { ledger });

    Router::new()
        .route("/leads/{lead_id}/claim", post(claim_lead_handler))
        .with_state(state)
}
