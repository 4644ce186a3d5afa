//! Service factory implementation.
//!
//! Decides at startup which ledger, if any, backs the payment routes.
use leadpay_common::{BoxedLedger, ServiceFactory, SharedLedger};
use leadpay_config::AppConfig;
use leadpay_firestore::{FirestoreClient, FirestoreLedger};
use std::sync::Arc;
use tracing::{error, info};

/// Service factory for the backend.
///
/// With `use_firestore` on and a `[firestore]` section present, payments are
/// recorded in Firestore. Otherwise the backend runs as a stateless relay.
pub struct LeadpayServiceFactory {
    ledger: Option<SharedLedger>,
}

impl LeadpayServiceFactory {
    pub fn new(config: &AppConfig) -> Self {
        let ledger = match config.firestore.as_ref() {
            Some(firestore) if config.firestore_enabled() => {
                info!("Initializing Firestore payment ledger...");
                match FirestoreClient::new(firestore.clone()) {
                    Ok(client) => {
                        let ledger: SharedLedger =
                            Arc::new(BoxedLedger(FirestoreLedger::new(client)));
                        Some(ledger)
                    }
                    Err(e) => {
                        error!("Firestore ledger unavailable: {}", e);
                        None
                    }
                }
            }
            _ => {
                info!("Firestore ledger disabled; running as a stateless relay");
                None
            }
        };
        Self { ledger }
    }

    /// Factory with an explicit ledger, bypassing configuration.
    pub fn with_ledger(ledger: Option<SharedLedger>) -> Self {
        Self { ledger }
    }
}

impl ServiceFactory for LeadpayServiceFactory {
    fn ledger_service(&self) -> Option<SharedLedger> {
        self.ledger.clone()
    }
}
