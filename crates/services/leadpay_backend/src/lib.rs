//! LeadPay backend: assembles the feature routers into one application.

pub mod app;
pub mod service_factory;

pub use app::build_app;
pub use service_factory::LeadpayServiceFactory;
