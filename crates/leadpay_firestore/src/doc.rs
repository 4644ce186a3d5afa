use utoipa::OpenApi;

use crate::handlers::{ClaimLeadRequest, ClaimLeadResponse};

#[derive(OpenApi)]
#[openapi(
    paths(crate::handlers::claim_lead_handler),
    components(schemas(ClaimLeadRequest, ClaimLeadResponse)),
    tags(
        (name = "Ledger", description = "Lead purchases recorded in Firestore")
    )
)]
pub struct FirestoreApiDoc;
