use utoipa::OpenApi;

use crate::handlers::{
    CreateCheckoutSessionRequest, CreateCheckoutSessionResponse, CreatePaymentResponse,
    VerifyPaymentRequest, VerifyPaymentResponse,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::create_checkout_session_handler,
        crate::handlers::verify_payment_handler,
        crate::handlers::create_payment_handler,
        crate::handlers::stripe_webhook_handler
    ),
    components(
        schemas(
            CreateCheckoutSessionRequest,
            CreateCheckoutSessionResponse,
            CreatePaymentResponse,
            VerifyPaymentRequest,
            VerifyPaymentResponse
        )
    ),
    tags(
        (name = "Checkout", description = "Lead checkout via Stripe"),
        (name = "Stripe Webhooks", description = "Stripe server-to-server webhooks")
    )
)]
pub struct StripeApiDoc;
