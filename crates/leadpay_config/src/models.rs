use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16, // Also settable via the plain PORT env var
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// --- Logging Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Minimum level for the `leadpay` crates (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

// --- Stripe Config ---
// Holds non-secret Stripe config. Secrets come from STRIPE_SECRET_KEY / STRIPE_WEBHOOK_SECRET
// and are never serialized back out.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StripeConfig {
    #[serde(default = "default_stripe_api_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_product_name")]
    pub product_name: String,
    /// Appended to `client_url`. Stripe substitutes `{CHECKOUT_SESSION_ID}`.
    #[serde(default = "default_success_path")]
    pub success_path: String,
    #[serde(default = "default_cancel_path")]
    pub cancel_path: String,
    #[serde(default, skip_serializing)]
    pub secret_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub webhook_secret: Option<String>,
}

impl StripeConfig {
    pub fn success_url(&self, client_url: &str) -> String {
        join_url(client_url, &self.success_path)
    }

    pub fn cancel_url(&self, client_url: &str) -> String {
        join_url(client_url, &self.cancel_path)
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: default_stripe_api_base(),
            currency: default_currency(),
            product_name: default_product_name(),
            success_path: default_success_path(),
            cancel_path: default_cancel_path(),
            secret_key: None,
            webhook_secret: None,
        }
    }
}

// --- Firestore Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FirestoreConfig {
    pub project_id: Option<String>, // Mandatory once the ledger is used
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_firestore_api_base")]
    pub api_base: String,
    /// Path to a service account key; also read from GOOGLE_APPLICATION_CREDENTIALS.
    #[serde(default)]
    pub key_path: Option<String>,
    /// Static bearer token (emulator, tests). Takes precedence over `key_path`.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
    #[serde(default = "default_payments_collection")]
    pub payments_collection: String,
    #[serde(default = "default_leads_collection")]
    pub leads_collection: String,
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database: default_database(),
            api_base: default_firestore_api_base(),
            key_path: None,
            access_token: None,
            payments_collection: default_payments_collection(),
            leads_collection: default_leads_collection(),
        }
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    /// Origin of the web client. Used for CORS and for the checkout redirect URLs.
    #[serde(default = "default_client_url")]
    pub client_url: String,

    #[serde(default)]
    pub logging: LoggingConfig,

    // --- Runtime Flags ---
    #[serde(default = "default_true")]
    pub use_stripe: bool,
    #[serde(default)]
    pub use_firestore: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub stripe: Option<StripeConfig>,
    #[serde(default)]
    pub firestore: Option<FirestoreConfig>,
}

impl AppConfig {
    pub fn stripe_enabled(&self) -> bool {
        self.use_stripe && self.stripe.is_some()
    }

    pub fn firestore_enabled(&self) -> bool {
        self.use_firestore && self.firestore.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            client_url: default_client_url(),
            logging: LoggingConfig::default(),
            use_stripe: true,
            use_firestore: false,
            stripe: Some(StripeConfig::default()),
            firestore: None,
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_client_url() -> String {
    "http://localhost:5173".to_string()
}
fn default_true() -> bool {
    true
}
fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_currency() -> String {
    "usd".to_string()
}
fn default_product_name() -> String {
    "Lead Purchase".to_string()
}
fn default_success_path() -> String {
    "/leads?session_id={CHECKOUT_SESSION_ID}".to_string()
}
fn default_cancel_path() -> String {
    "/leads".to_string()
}
fn default_database() -> String {
    "(default)".to_string()
}
fn default_firestore_api_base() -> String {
    "https://firestore.googleapis.com".to_string()
}
fn default_payments_collection() -> String {
    "payments".to_string()
}
fn default_leads_collection() -> String {
    "leads".to_string()
}
