use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use leadpay_common::{BoxedLedger, LeadPurchase, LedgerService, SharedLedger};
use leadpay_config::FirestoreConfig;
use leadpay_firestore::{routes, FirestoreClient, FirestoreError, FirestoreLedger};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DOCUMENTS: &str = "/v1/projects/demo-project/databases/(default)/documents";

fn client_for(server: &MockServer) -> FirestoreClient {
    FirestoreClient::new(FirestoreConfig {
        project_id: Some("demo-project".to_string()),
        api_base: server.uri(),
        access_token: Some("test-token".to_string()),
        ..FirestoreConfig::default()
    })
    .unwrap()
}

fn ledger_for(server: &MockServer) -> FirestoreLedger {
    FirestoreLedger::new(client_for(server))
}

fn shared_ledger_for(server: &MockServer) -> SharedLedger {
    Arc::new(BoxedLedger(ledger_for(server)))
}

#[tokio::test]
async fn create_pending_payment_commits_with_server_timestamp() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{}:commit", DOCUMENTS)))
        .and(header("authorization", "Bearer test-token"))
        .and(body_partial_json(json!({
            "writes": [{
                "update": {
                    "fields": {
                        "leadId": { "stringValue": "lead_42" },
                        "amount": { "integerValue": "2500" },
                        "status": { "stringValue": "pending" }
                    }
                },
                "updateTransforms": [
                    { "fieldPath": "createdAt", "setToServerValue": "REQUEST_TIME" }
                ],
                "currentDocument": { "exists": false }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "writeResults": [{ "updateTime": "2026-03-14T15:09:26.000001Z" }],
            "commitTime": "2026-03-14T15:09:26.000001Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payment_id = ledger_for(&server)
        .create_pending_payment("lead_42", 2500)
        .await
        .unwrap();

    assert_eq!(payment_id.len(), 32);
    assert!(payment_id.chars().all(|c| c.is_ascii_hexdigit()));

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let name = body["writes"][0]["update"]["name"].as_str().unwrap();
    assert_eq!(
        name,
        format!(
            "projects/demo-project/databases/(default)/documents/payments/{}",
            payment_id
        )
    );
}

#[tokio::test]
async fn attach_session_patches_only_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/payments/pay_7", DOCUMENTS)))
        .and(query_param("updateMask.fieldPaths", "sessionId"))
        .and(query_param("currentDocument.exists", "true"))
        .and(body_partial_json(json!({
            "fields": { "sessionId": { "stringValue": "cs_test_1" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    ledger_for(&server)
        .attach_session("pay_7", "cs_test_1")
        .await
        .unwrap();
}

fn payment_document(status: &str) -> Value {
    json!({
        "name": "projects/demo-project/databases/(default)/documents/payments/pay_7",
        "fields": {
            "leadId": { "stringValue": "lead_42" },
            "amount": { "integerValue": "2500" },
            "status": { "stringValue": status }
        }
    })
}

#[tokio::test]
async fn mark_paid_sets_status_and_paid_at() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/payments/pay_7", DOCUMENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment_document("pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/payments/pay_7", DOCUMENTS)))
        .and(query_param("updateMask.fieldPaths", "status"))
        .and(query_param("updateMask.fieldPaths", "paidAt"))
        .and(body_partial_json(json!({
            "fields": { "status": { "stringValue": "paid" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    ledger_for(&server).mark_paid("pay_7").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let body: Value = serde_json::from_slice(&patch.body).unwrap();
    assert!(body["fields"]["paidAt"]["timestampValue"].is_string());
}

#[tokio::test]
async fn mark_paid_keeps_existing_paid_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/payments/pay_7", DOCUMENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(payment_document("paid")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    ledger_for(&server).mark_paid("pay_7").await.unwrap();
}

#[tokio::test]
async fn missing_payment_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "No document to update", "status": "NOT_FOUND" }
        })))
        .mount(&server)
        .await;

    let err = ledger_for(&server).mark_paid("pay_gone").await.unwrap_err();
    assert!(matches!(err, FirestoreError::NotFound(name) if name.ends_with("/payments/pay_gone")));
}

#[tokio::test]
async fn api_errors_carry_google_message() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
        })))
        .mount(&server)
        .await;

    let err = ledger_for(&server)
        .attach_session("pay_7", "cs_test_1")
        .await
        .unwrap_err();
    match err {
        FirestoreError::ApiError {
            status_code,
            message,
        } => {
            assert_eq!(status_code, 403);
            assert_eq!(message, "Missing or insufficient permissions.");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn get_document_reads_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/leads/lead_42", DOCUMENTS)))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "projects/demo-project/databases/(default)/documents/leads/lead_42",
            "fields": {
                "status": { "stringValue": "claimed" },
                "purchasedBy": { "stringValue": "user_7" },
                "amount": { "integerValue": "2500" }
            }
        })))
        .mount(&server)
        .await;

    let doc = client_for(&server)
        .get_document("leads", "lead_42")
        .await
        .unwrap();
    assert_eq!(doc.id(), "lead_42");
    assert_eq!(doc.get_str("purchasedBy"), Some("user_7"));
    assert_eq!(doc.get_i64("amount"), Some(2500));
}

async fn claim(ledger: Option<SharedLedger>, lead_id: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::post(format!("/leads/{}/claim", lead_id))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = routes(ledger).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn claim_lead_updates_lead_document() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/leads/lead_42", DOCUMENTS)))
        .and(query_param("updateMask.fieldPaths", "purchasedBy"))
        .and(query_param("updateMask.fieldPaths", "purchaseDate"))
        .and(query_param("currentDocument.exists", "true"))
        .and(body_partial_json(json!({
            "fields": {
                "purchasedBy": { "stringValue": "user_7" },
                "status": { "stringValue": "claimed" },
                "amount": { "integerValue": "2500" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (status, body) = claim(
        Some(shared_ledger_for(&server)),
        "lead_42",
        json!({ "userId": "user_7", "amount": 2500 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "leadId": "lead_42", "status": "claimed" }));
}

#[tokio::test]
async fn claim_unknown_lead_is_404() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "No document to update", "status": "NOT_FOUND" }
        })))
        .mount(&server)
        .await;

    let (status, body) = claim(
        Some(shared_ledger_for(&server)),
        "lead_missing",
        json!({ "userId": "user_7", "amount": 2500 }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Lead not found" }));
}

#[tokio::test]
async fn claim_store_failure_is_500() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend unavailable"))
        .mount(&server)
        .await;

    let (status, body) = claim(
        Some(shared_ledger_for(&server)),
        "lead_42",
        json!({ "userId": "user_7", "amount": 2500 }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to record payment" }));
}

#[tokio::test]
async fn claim_requires_user_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (status, body) = claim(
        Some(shared_ledger_for(&server)),
        "lead_42",
        json!({ "amount": 2500 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Missing required parameters" }));
}

#[tokio::test]
async fn claim_without_ledger_is_unavailable() {
    let (status, body) = claim(None, "lead_42", json!({ "userId": "user_7", "amount": 2500 })).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "error": "Payment ledger is disabled" }));
}

#[tokio::test]
async fn ledger_purchase_through_trait_object() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/leads/lead_9", DOCUMENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    shared_ledger_for(&server)
        .record_lead_purchase(LeadPurchase {
            lead_id: "lead_9".to_string(),
            user_id: "user_1".to_string(),
            amount: 900,
        })
        .await
        .unwrap();
}
