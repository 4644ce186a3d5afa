//! Firestore-backed payment ledger.
//!
//! Provides [`FirestoreLedger`], the `LedgerService` used when the document
//! store is enabled, and the lead claim route.

pub mod auth;
pub mod client;
#[cfg(feature = "openapi")]
pub mod doc;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;

pub use client::{FirestoreClient, FirestoreError};
pub use models::{Document, FieldValue, Fields};
pub use repository::FirestoreLedger;
pub use routes::routes;
