//! Client for the LeadPay checkout API.
//!
//! A buyer flow is two calls: [`LeadpayClient::create_payment_session`] before
//! redirecting to the hosted checkout page, and
//! [`LeadpayClient::handle_payment_success`] with the `session_id` the page
//! redirects back with.

pub mod client;
pub mod error;

pub use client::{dollars_to_cents, CheckoutRedirect, LeadpayClient, VerifiedPayment, DEFAULT_API_URL};
pub use error::ClientError;
