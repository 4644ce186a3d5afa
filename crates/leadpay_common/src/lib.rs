pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging utilities
pub mod routes; // Health route
pub mod services; // Service abstractions

// Re-export the routes function to be used by the main backend service
pub use routes::routes;

pub use error::{
    config_error, disabled, not_found, upstream_error, validation_error,
    HttpStatusCode, LeadpayError,
};

pub use http::{
    client::{api_error_message, create_client, HTTP_CLIENT},
    IntoHttpResponse,
};

pub use logging::log_result;

pub use services::{BoxedError, BoxedLedger, LeadPurchase, LedgerService, ServiceFactory, SharedLedger};
