//! Configuration for the LeadPay services.
//!
//! Sources are layered, later ones winning:
//!
//! 1. `config/default.*` (optional, any format the `config` crate understands)
//! 2. `config/{RUN_ENV}.*` (optional, `RUN_ENV` defaults to `debug`)
//! 3. `LEADPAY__SECTION__KEY` environment variables
//! 4. the plain variable names the web client deployment already uses
//!    (`PORT`, `CLIENT_URL`, `STRIPE_SECRET_KEY`, ...)
//!
//! A `.env` file is loaded once before any of that.

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;
use tracing::debug;

pub mod models;
pub use models::*;

/// Prefix for structured configuration environment variables.
pub const ENV_PREFIX: &str = "LEADPAY";

/// Separator between nested keys in structured environment variables.
pub const ENV_SEPARATOR: &str = "__";

/// Plain environment variables and the configuration key each one overrides.
pub const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("PORT", "server.port"),
    ("CLIENT_URL", "client_url"),
    ("STRIPE_SECRET_KEY", "stripe.secret_key"),
    ("STRIPE_WEBHOOK_SECRET", "stripe.webhook_secret"),
    ("FIRESTORE_PROJECT_ID", "firestore.project_id"),
    ("FIRESTORE_ACCESS_TOKEN", "firestore.access_token"),
    ("GOOGLE_APPLICATION_CREDENTIALS", "firestore.key_path"),
];

/// Loads the application configuration from files and the environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let dotenv_path = ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let config_dir = PathBuf::from(env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string()));

    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);

    debug!(
        dotenv = %dotenv_path,
        default_path = %default_path.display(),
        env_path = %env_path.display(),
        "Loading configuration"
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR));

    let builder = apply_legacy_env(builder, |name| env::var(name).ok())?;

    builder.build()?.try_deserialize()
}

/// Applies the plain environment variable names on top of `builder`.
///
/// `lookup` resolves a variable name to its value; `load_config` passes `std::env::var`.
pub fn apply_legacy_env<F>(
    builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    LEGACY_ENV_VARS
        .iter()
        .try_fold(builder, |builder, (var, key)| {
            builder.set_override_option(*key, lookup(var).filter(|v| !v.is_empty()))
        })
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file into the process environment, once.
///
/// `DOTENV_OVERRIDE` selects the file; otherwise `.env` in the working directory.
/// Returns the path that was used.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path = env::var("DOTENV_OVERRIDE").unwrap_or_else(|_| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
client_url = "https://leads.example.com"
use_firestore = true

[server]
host = "127.0.0.1"
port = 8080

[stripe]
currency = "eur"

[firestore]
project_id = "leads-prod"
"#;

    fn load(source: &str, vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let builder = Config::builder().add_source(File::from_str(source, FileFormat::Toml));
        apply_legacy_env(builder, |name| vars.get(name).cloned())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_file_values_and_defaults() {
        let config = load(SAMPLE, &[]);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.client_url, "https://leads.example.com");
        assert!(config.use_stripe);
        assert!(config.firestore_enabled());

        let stripe = config.stripe.unwrap();
        assert_eq!(stripe.currency, "eur");
        assert_eq!(stripe.product_name, "Lead Purchase");
        assert_eq!(stripe.api_base, "https://api.stripe.com");
        assert!(stripe.secret_key.is_none());

        let firestore = config.firestore.unwrap();
        assert_eq!(firestore.project_id.as_deref(), Some("leads-prod"));
        assert_eq!(firestore.database, "(default)");
        assert_eq!(firestore.payments_collection, "payments");
        assert_eq!(firestore.leads_collection, "leads");
    }

    #[test]
    fn test_plain_env_vars_override_file() {
        let config = load(
            SAMPLE,
            &[
                ("PORT", "4000"),
                ("CLIENT_URL", "http://localhost:5173"),
                ("STRIPE_SECRET_KEY", "sk_test_abc"),
            ],
        );
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.client_url, "http://localhost:5173");
        assert_eq!(
            config.stripe.unwrap().secret_key.as_deref(),
            Some("sk_test_abc")
        );
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = load("", &[("STRIPE_SECRET_KEY", "sk_test_abc")]);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.client_url, "http://localhost:5173");
        assert!(config.stripe_enabled());
        assert!(!config.firestore_enabled());
    }

    #[test]
    fn test_empty_env_value_is_ignored() {
        let config = load(SAMPLE, &[("PORT", "")]);
        assert_eq!(config.server.port, 8080);
    }
}
