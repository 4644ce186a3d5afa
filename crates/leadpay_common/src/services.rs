//! Service abstractions for external services.
//!
//! Handlers depend on these traits instead of on a concrete document store, so
//! the backend decides at startup which implementation (if any) is wired in.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A wrapper error type that implements std::error::Error for Box<dyn std::error::Error + Send + Sync>
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl BoxedError {
    pub fn new<E: StdError + Send + Sync + 'static>(err: E) -> Self {
        BoxedError(Box::new(err))
    }

    /// Returns the wrapped error as `E`, if that is its concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }
}

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

/// Purchase fields written onto a lead once it is claimed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadPurchase {
    pub lead_id: String,
    /// The user who bought the lead.
    pub user_id: String,
    pub amount: i64,
}

/// A trait for the payment ledger kept in the document store.
///
/// The ledger mirrors the checkout lifecycle: a payment is created `pending`,
/// linked to its checkout session, marked `paid`, and the lead is `claimed`.
/// None of these writes are linked transactionally to the processor.
pub trait LedgerService: Send + Sync {
    /// Error type returned by ledger operations.
    type Error: StdError + Send + Sync + 'static;

    /// Create a `pending` payment record and return its id.
    fn create_pending_payment(
        &self,
        lead_id: &str,
        amount: i64,
    ) -> BoxFuture<'_, String, Self::Error>;

    /// Store the checkout session id on an existing payment record.
    fn attach_session(&self, payment_id: &str, session_id: &str)
        -> BoxFuture<'_, (), Self::Error>;

    /// Mark a payment record as `paid`.
    fn mark_paid(&self, payment_id: &str) -> BoxFuture<'_, (), Self::Error>;

    /// Mark a lead as `claimed` by the purchasing user.
    fn record_lead_purchase(&self, purchase: LeadPurchase) -> BoxFuture<'_, (), Self::Error>;
}

/// Adapter that erases a ledger's error type into [`BoxedError`].
///
/// The concrete error stays reachable through [`BoxedError::downcast_ref`].
pub struct BoxedLedger<S>(pub S);

impl<S: LedgerService> LedgerService for BoxedLedger<S> {
    type Error = BoxedError;

    fn create_pending_payment(
        &self,
        lead_id: &str,
        amount: i64,
    ) -> BoxFuture<'_, String, Self::Error> {
        let fut = self.0.create_pending_payment(lead_id, amount);
        Box::pin(async move { fut.await.map_err(BoxedError::new) })
    }

    fn attach_session(
        &self,
        payment_id: &str,
        session_id: &str,
    ) -> BoxFuture<'_, (), Self::Error> {
        let fut = self.0.attach_session(payment_id, session_id);
        Box::pin(async move { fut.await.map_err(BoxedError::new) })
    }

    fn mark_paid(&self, payment_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let fut = self.0.mark_paid(payment_id);
        Box::pin(async move { fut.await.map_err(BoxedError::new) })
    }

    fn record_lead_purchase(&self, purchase: LeadPurchase) -> BoxFuture<'_, (), Self::Error> {
        let fut = self.0.record_lead_purchase(purchase);
        Box::pin(async move { fut.await.map_err(BoxedError::new) })
    }
}

/// Shared handle to whichever ledger the backend wired in.
pub type SharedLedger = Arc<dyn LedgerService<Error = BoxedError>>;

/// A factory for creating service instances.
pub trait ServiceFactory: Send + Sync {
    /// Get the payment ledger, if the document store is enabled.
    fn ledger_service(&self) -> Option<SharedLedger>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("ledger offline")]
    struct OfflineError;

    #[derive(Default)]
    struct RecordingLedger {
        calls: Mutex<Vec<String>>,
    }

    impl LedgerService for RecordingLedger {
        type Error = OfflineError;

        fn create_pending_payment(
            &self,
            lead_id: &str,
            amount: i64,
        ) -> BoxFuture<'_, String, Self::Error> {
            let call = format!("create {} {}", lead_id, amount);
            Box::pin(async move {
                self.calls.lock().unwrap().push(call);
                Ok("pay_1".to_string())
            })
        }

        fn attach_session(
            &self,
            _payment_id: &str,
            _session_id: &str,
        ) -> BoxFuture<'_, (), Self::Error> {
            Box::pin(async move { Err(OfflineError) })
        }

        fn mark_paid(&self, payment_id: &str) -> BoxFuture<'_, (), Self::Error> {
            let call = format!("paid {}", payment_id);
            Box::pin(async move {
                self.calls.lock().unwrap().push(call);
                Ok(())
            })
        }

        fn record_lead_purchase(
            &self,
            purchase: LeadPurchase,
        ) -> BoxFuture<'_, (), Self::Error> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .unwrap()
                    .push(format!("claim {}", purchase.lead_id));
                Ok(())
            })
        }
    }

    #[tokio::test]
    async fn test_boxed_ledger_forwards_calls() {
        let ledger: SharedLedger = Arc::new(BoxedLedger(RecordingLedger::default()));
        assert_eq!(
            ledger.create_pending_payment("lead_9", 2500).await.unwrap(),
            "pay_1"
        );
        ledger.mark_paid("pay_1").await.unwrap();
        ledger
            .record_lead_purchase(LeadPurchase {
                lead_id: "lead_9".to_string(),
                user_id: "user_1".to_string(),
                amount: 25,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_boxed_ledger_keeps_concrete_error() {
        let ledger = BoxedLedger(RecordingLedger::default());
        let err = ledger.attach_session("pay_1", "cs_1").await.unwrap_err();
        assert_eq!(err.to_string(), "ledger offline");
        assert!(err.downcast_ref::<OfflineError>().is_some());
    }
}
