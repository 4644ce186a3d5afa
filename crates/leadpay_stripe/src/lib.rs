//! Stripe Checkout integration: creating sessions for leads, confirming
//! payment, and receiving webhooks.

#[cfg(feature = "openapi")]
pub mod doc;
pub mod error;
pub mod handlers;
pub mod logic;
pub mod routes;

// Re-export for main backend
pub use error::StripeError;
pub use handlers::StripeState;
pub use logic::{CheckoutSession, LeadCheckout, StripeCheckoutSessionData};
pub use routes::routes;
