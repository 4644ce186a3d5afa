//! Payment ledger stored in Firestore.
//!
//! `payments/{id}` tracks each checkout (`pending` then `paid`); the purchase
//! itself is stamped onto `leads/{leadId}`.

use crate::client::{FirestoreClient, FirestoreError};
use crate::models::{FieldValue, Fields};
use chrono::{DateTime, SecondsFormat, Utc};
use leadpay_common::services::BoxFuture;
use leadpay_common::{log_result, LeadPurchase, LedgerService};
use tracing::info;

pub const FIELD_LEAD_ID: &str = "leadId";
pub const FIELD_AMOUNT: &str = "amount";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_CREATED_AT: &str = "createdAt";
pub const FIELD_SESSION_ID: &str = "sessionId";
pub const FIELD_PAID_AT: &str = "paidAt";
pub const FIELD_PURCHASED_BY: &str = "purchasedBy";
pub const FIELD_PURCHASE_DATE: &str = "purchaseDate";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PAID: &str = "paid";
pub const STATUS_CLAIMED: &str = "claimed";

/// `LedgerService` backed by two Firestore collections.
#[derive(Debug, Clone)]
pub struct FirestoreLedger {
    client: FirestoreClient,
    payments_collection: String,
    leads_collection: String,
}

impl FirestoreLedger {
    pub fn new(client: FirestoreClient) -> Self {
        let payments_collection = client.config().payments_collection.clone();
        let leads_collection = client.config().leads_collection.clone();
        Self {
            client,
            payments_collection,
            leads_collection,
        }
    }
}

fn field(name: &str, value: FieldValue) -> (String, FieldValue) {
    (name.to_string(), value)
}

/// Fields of a new payment record. `createdAt` is added by the server.
pub fn pending_payment_fields(lead_id: &str, amount: i64) -> Fields {
    Fields::from([
        field(FIELD_LEAD_ID, FieldValue::string(lead_id)),
        field(FIELD_AMOUNT, FieldValue::integer(amount)),
        field(FIELD_STATUS, FieldValue::string(STATUS_PENDING)),
    ])
}

pub fn paid_fields(now: DateTime<Utc>) -> Fields {
    Fields::from([
        field(FIELD_STATUS, FieldValue::string(STATUS_PAID)),
        field(
            FIELD_PAID_AT,
            FieldValue::timestamp(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
        ),
    ])
}

/// Purchase fields for a lead. `purchaseDate` is an ISO-8601 string, not a timestamp value.
pub fn lead_purchase_fields(purchase: &LeadPurchase, now: DateTime<Utc>) -> Fields {
    Fields::from([
        field(FIELD_PURCHASED_BY, FieldValue::string(purchase.user_id.as_str())),
        field(
            FIELD_PURCHASE_DATE,
            FieldValue::string(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        ),
        field(FIELD_STATUS, FieldValue::string(STATUS_CLAIMED)),
        field(FIELD_AMOUNT, FieldValue::integer(purchase.amount)),
    ])
}

impl LedgerService for FirestoreLedger {
    type Error = FirestoreError;

    fn create_pending_payment(
        &self,
        lead_id: &str,
        amount: i64,
    ) -> BoxFuture<'_, String, Self::Error> {
        let fields = pending_payment_fields(lead_id, amount);
        let lead_id = lead_id.to_string();
        Box::pin(async move {
            let payment_id = self
                .client
                .create_document(&self.payments_collection, fields, &[FIELD_CREATED_AT])
                .await?;
            info!("Pending payment {} recorded for lead {}", payment_id, lead_id);
            Ok(payment_id)
        })
    }

    fn attach_session(
        &self,
        payment_id: &str,
        session_id: &str,
    ) -> BoxFuture<'_, (), Self::Error> {
        let payment_id = payment_id.to_string();
        let fields = Fields::from([field(FIELD_SESSION_ID, FieldValue::string(session_id))]);
        Box::pin(async move {
            log_result(
                self.client
                    .update_fields(&self.payments_collection, &payment_id, fields)
                    .await,
                "Checkout session linked to payment",
                &format!("Failed to link session to payment {}", payment_id),
            )
        })
    }

    /// Leaves an already paid record untouched, so the first `paidAt` wins when
    /// both the verify call and the webhook report the same payment.
    fn mark_paid(&self, payment_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let payment_id = payment_id.to_string();
        Box::pin(async move {
            let payment = self
                .client
                .get_document(&self.payments_collection, &payment_id)
                .await?;
            if payment.get_str(FIELD_STATUS) == Some(STATUS_PAID) {
                info!(
                    "Payment {} for lead {:?} ({:?} cents) already paid",
                    payment.id(),
                    payment.get_str(FIELD_LEAD_ID),
                    payment.get_i64(FIELD_AMOUNT)
                );
                return Ok(());
            }

            log_result(
                self.client
                    .update_fields(&self.payments_collection, &payment_id, paid_fields(Utc::now()))
                    .await,
                "Payment marked paid",
                &format!("Failed to mark payment {} paid", payment_id),
            )
        })
    }

    fn record_lead_purchase(&self, purchase: LeadPurchase) -> BoxFuture<'_, (), Self::Error> {
        let fields = lead_purchase_fields(&purchase, Utc::now());
        Box::pin(async move {
            self.client
                .update_fields(&self.leads_collection, &purchase.lead_id, fields)
                .await?;
            info!(
                "Lead {} claimed by {} for {}",
                purchase.lead_id, purchase.user_id, purchase.amount
            );
            Ok(())
        })
    }
}
