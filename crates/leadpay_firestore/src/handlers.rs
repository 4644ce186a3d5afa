use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use leadpay_common::{
    disabled, not_found, upstream_error, validation_error, LeadPurchase, LeadpayError,
    SharedLedger,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use crate::client::FirestoreError;
use crate::repository::STATUS_CLAIMED;

pub const MISSING_PARAMETERS: &str = "Missing required parameters";
pub const LEAD_NOT_FOUND: &str = "Lead not found";
pub const RECORD_FAILED: &str = "Failed to record payment";

#[derive(Clone)]
pub struct FirestoreState {
    /// `None` when the document store is disabled.
    pub ledger: Option<SharedLedger>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClaimLeadRequest {
    #[cfg_attr(feature = "openapi", schema(example = "user_19c"))]
    pub user_id: Option<String>,
    /// Amount paid, in cents.
    #[cfg_attr(feature = "openapi", schema(example = 2500))]
    pub amount: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClaimLeadResponse {
    pub lead_id: String,
    #[cfg_attr(feature = "openapi", schema(example = "claimed"))]
    pub status: String,
}

fn validate_claim(
    lead_id: String,
    payload: Result<Json<ClaimLeadRequest>, JsonRejection>,
) -> Result<LeadPurchase, LeadpayError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected claim request body: {}", rejection);
        validation_error(MISSING_PARAMETERS)
    })?;

    let user_id = request
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| validation_error(MISSING_PARAMETERS))?;
    let amount = request
        .amount
        .filter(|amount| *amount >= 0)
        .ok_or_else(|| validation_error(MISSING_PARAMETERS))?;

    Ok(LeadPurchase {
        lead_id,
        user_id,
        amount,
    })
}

/// Marks a lead as purchased by a user after payment.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/leads/{lead_id}/claim", // Path relative to /api
    params(("lead_id" = String, Path, description = "Lead being claimed")),
    request_body = ClaimLeadRequest,
    responses(
        (status = 200, description = "Lead claimed", body = ClaimLeadResponse),
        (status = 400, description = "Missing required parameters"),
        (status = 404, description = "Lead not found"),
        (status = 500, description = "Failed to record payment"),
        (status = 503, description = "Ledger disabled")
    ),
    tag = "Ledger"
))]
pub async fn claim_lead_handler(
    State(state): State<Arc<FirestoreState>>,
    Path(lead_id): Path<String>,
    payload: Result<Json<ClaimLeadRequest>, JsonRejection>,
) -> Result<Json<ClaimLeadResponse>, LeadpayError> {
    let ledger = state
        .ledger
        .as_ref()
        .ok_or_else(|| disabled("Payment ledger is disabled"))?;
    let purchase = validate_claim(lead_id, payload)?;
    let lead_id = purchase.lead_id.clone();

    ledger.record_lead_purchase(purchase).await.map_err(|e| {
        match e.downcast_ref::<FirestoreError>() {
            Some(FirestoreError::NotFound(_)) => {
                warn!("Claim for unknown lead {}", lead_id);
                not_found(LEAD_NOT_FOUND)
            }
            _ => {
                error!("Error recording purchase of lead {}: {}", lead_id, e);
                upstream_error(RECORD_FAILED)
            }
        }
    })?;

    Ok(Json(ClaimLeadResponse {
        lead_id,
        status: STATUS_CLAIMED.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(user_id: Option<&str>, amount: Option<i64>) -> Result<LeadPurchase, LeadpayError> {
        validate_claim(
            "lead_42".to_string(),
            Ok(Json(ClaimLeadRequest {
                user_id: user_id.map(String::from),
                amount,
            })),
        )
    }

    #[test]
    fn test_validate_claim() {
        assert_eq!(
            claim(Some("user_7"), Some(2500)).unwrap(),
            LeadPurchase {
                lead_id: "lead_42".to_string(),
                user_id: "user_7".to_string(),
                amount: 2500,
            }
        );

        for (user_id, amount) in [
            (None, Some(2500)),
            (Some(" "), Some(2500)),
            (Some("user_7"), None),
            (Some("user_7"), Some(-1)),
        ] {
            assert_eq!(
                claim(user_id, amount).unwrap_err().to_string(),
                MISSING_PARAMETERS
            );
        }
    }
}
