//! Access tokens for the Firestore REST API.
//!
//! Production uses a service account key file; the emulator and tests use a
//! fixed bearer token.

use crate::client::FirestoreError;
use leadpay_config::FirestoreConfig;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{read_service_account_key, ServiceAccountAuthenticator};

/// OAuth scope covering Firestore document reads and writes.
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

#[derive(Clone)]
pub enum TokenSource {
    /// A bearer token used as-is.
    Static(String),
    /// A service account key file. The authenticator is built on first use and
    /// shared by every clone, so yup-oauth2 refreshes the token only on expiry.
    ServiceAccount {
        key_path: String,
        authenticator: Arc<OnceCell<DefaultAuthenticator>>,
    },
}

impl fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Static(_) => f.write_str("Static(<redacted>)"),
            TokenSource::ServiceAccount {
                key_path,
                authenticator,
            } => f
                .debug_struct("ServiceAccount")
                .field("key_path", key_path)
                .field("initialized", &authenticator.initialized())
                .finish(),
        }
    }
}

impl TokenSource {
    /// Picks the credential from config. A configured `access_token` wins over `key_path`.
    pub fn from_config(config: &FirestoreConfig) -> Result<Self, FirestoreError> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(&config.access_token) {
            return Ok(TokenSource::Static(token));
        }
        if let Some(key_path) = non_empty(&config.key_path) {
            return Ok(TokenSource::service_account(key_path));
        }
        Err(FirestoreError::ConfigError(
            "Firestore needs access_token or key_path (GOOGLE_APPLICATION_CREDENTIALS)".to_string(),
        ))
    }

    pub fn service_account(key_path: impl Into<String>) -> Self {
        TokenSource::ServiceAccount {
            key_path: key_path.into(),
            authenticator: Arc::new(OnceCell::new()),
        }
    }

    /// Returns a bearer token for the datastore scope.
    pub async fn token(&self) -> Result<String, FirestoreError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount {
                key_path,
                authenticator,
            } => {
                let auth = authenticator
                    .get_or_try_init(|| build_authenticator(key_path))
                    .await?;
                let access_token = auth
                    .token(&[DATASTORE_SCOPE])
                    .await
                    .map_err(|e| FirestoreError::AuthError(e.to_string()))?;
                access_token
                    .token()
                    .map(String::from)
                    .ok_or_else(|| FirestoreError::AuthError("No token available".to_string()))
            }
        }
    }
}

async fn build_authenticator(key_path: &str) -> Result<DefaultAuthenticator, FirestoreError> {
    let sa_key = read_service_account_key(Path::new(key_path))
        .await
        .map_err(|e| FirestoreError::AuthError(format!("Cannot read {}: {}", key_path, e)))?;

    let auth = ServiceAccountAuthenticator::builder(sa_key)
        .build()
        .await
        .map_err(|e| FirestoreError::AuthError(e.to_string()))?;
    info!("Firestore service account authenticator ready");
    Ok(auth)
}
