//! End-to-end scenarios against a live chainvoice server.
//!
//! Every test starts its own server on an ephemeral port, so tests run in
//! parallel without stepping on each other.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{SignedLogin, TestServer};
use chainvoice::client::ApiClient;
use chainvoice::error::Error;
use chainvoice::invoice::{fresh_invoice_number, InvoiceDraft, InvoiceStatus};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn invoice_body(number: &str) -> Value {
    json!({
        "invoiceNumber": number,
        "clientName": "Acme Corp",
        "description": "Consulting retainer",
        "amount": "750.00",
        "dueDate": "2025-10-01",
        "walletAddress": "0x5555555555555555555555555555555555555555",
    })
}

/// Test that the index route reports the service and its endpoints.
#[tokio::test]
async fn test_index_reports_endpoints() {
    let server = TestServer::start().await.expect("Failed to start server");

    for path in ["/", "/api"] {
        let response = server.get(path).await.expect("request sends");
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        let body: Value = response.json().await.expect("body is JSON");
        assert_eq!(body["service"], "chainvoice");
        assert!(body["endpoints"]["saveInvoice"]
            .as_str()
            .expect("endpoint listed")
            .contains("/api/save-invoice"));
    }

    server.teardown().await.expect("Failed to teardown");
}

/// Test the full invoice lifecycle: save, fetch, mark paid, fetch again.
#[tokio::test]
async fn test_invoice_lifecycle() {
    let server = TestServer::start().await.expect("Failed to start server");

    // Save
    let response = server
        .post_json("/api/save-invoice", &invoice_body("INV-2001"))
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    let saved: Value = response.json().await.expect("body is JSON");
    assert_eq!(saved["success"], true);
    assert_eq!(saved["invoiceNumber"], "INV-2001");

    // Fetch: defaults were filled server-side
    let response = server
        .get("/api/get-invoice/INV-2001")
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Value = response.json().await.expect("body is JSON");
    assert_eq!(fetched["invoice"]["status"], "pending");
    assert!(!fetched["invoice"]["createdDate"]
        .as_str()
        .expect("createdDate present")
        .is_empty());

    // Mark paid
    let response = server
        .put_json(
            "/api/update-invoice",
            &json!({ "invoiceNumber": "INV-2001", "status": "paid" }),
        )
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.expect("body is JSON");
    assert_eq!(updated["invoice"]["status"], "paid");

    // Fetch again: only the status changed
    let response = server
        .get("/api/get-invoice/INV-2001")
        .await
        .expect("request sends");
    let fetched: Value = response.json().await.expect("body is JSON");
    assert_eq!(fetched["invoice"]["status"], "paid");
    assert_eq!(fetched["invoice"]["amount"], "750.00");
    assert_eq!(fetched["invoice"]["clientName"], "Acme Corp");

    server.teardown().await.expect("Failed to teardown");
}

/// Test that server-side validation rejects an incomplete draft and
/// persists nothing.
#[tokio::test]
async fn test_save_validation_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");

    let mut body = invoice_body("INV-2002");
    body["clientName"] = json!("");
    let response = server
        .post_json("/api/save-invoice", &body)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let rejected: Value = response.json().await.expect("body is JSON");
    assert!(rejected["error"]
        .as_str()
        .expect("error message present")
        .contains("clientName"));

    // The key was never written
    let response = server
        .get("/api/get-invoice/INV-2002")
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    server.teardown().await.expect("Failed to teardown");
}

/// Test the JSON bodies for unknown invoices, unknown routes and wrong
/// methods.
#[tokio::test]
async fn test_error_bodies() {
    let server = TestServer::start().await.expect("Failed to start server");

    // Unknown invoice
    let response = server
        .get("/api/get-invoice/INV-NOPE")
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("body is JSON");
    assert_eq!(body["error"], "Invoice not found");

    // Unknown route
    let response = server
        .get("/api/no-such-endpoint")
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("body is JSON");
    assert_eq!(body["error"], "Not found");
    assert_eq!(body["path"], "/api/no-such-endpoint");

    // Wrong method on a known route
    let response = server
        .get("/api/save-invoice")
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.expect("body is JSON");
    assert_eq!(body["error"], "Method not allowed");

    server.teardown().await.expect("Failed to teardown");
}

/// Test that CORS preflight and cross-origin responses carry the permissive
/// origin header.
#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::start().await.expect("Failed to start server");

    // Browser preflight
    let response = server
        .client()
        .request(reqwest::Method::OPTIONS, server.url("/api/save-invoice"))
        .header("Origin", "http://localhost:5173")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    // Plain cross-origin request
    let response = server
        .client()
        .get(server.url("/api"))
        .header("Origin", "http://localhost:5173")
        .send()
        .await
        .expect("request sends");
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    server.teardown().await.expect("Failed to teardown");
}

/// Test a genuine wallet login and that replaying the same signed message
/// is turned away.
#[tokio::test]
async fn test_wallet_login_and_replay() {
    let server = TestServer::start().await.expect("Failed to start server");
    let login = SignedLogin::generate("localhost:8000").expect("signs");

    let response = server
        .post_json("/api/auth/verify", &login.body)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    let verified: Value = response.json().await.expect("body is JSON");
    assert_eq!(verified["ok"], true);
    assert_eq!(verified["address"], login.address.as_str());
    assert!(!verified["sessionToken"]
        .as_str()
        .expect("session token present")
        .is_empty());

    // Identical body again: the nonce is spent
    let response = server
        .post_json("/api/auth/verify", &login.body)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let replayed: Value = response.json().await.expect("body is JSON");
    assert_eq!(replayed["error"], "Nonce already used");

    server.teardown().await.expect("Failed to teardown");
}

/// Test the login failure modes: stolen message, nonce-less message and
/// missing fields.
#[tokio::test]
async fn test_login_rejections() {
    let server = TestServer::start().await.expect("Failed to start server");

    // A stranger presenting someone else's signed message
    let victim = SignedLogin::generate("localhost:8000").expect("signs");
    let stranger = SignedLogin::generate("localhost:8000").expect("signs");
    let mut stolen = victim.body.clone();
    stolen["address"] = json!(stranger.address);
    let response = server
        .post_json("/api/auth/verify", &stolen)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("body is JSON");
    assert_eq!(body["error"], "Invalid signature");

    // A message with no nonce line never reaches signature checking
    let noncefree = json!({
        "address": victim.address,
        "message": "please let me in",
        "signature": "0xdeadbeef",
    });
    let response = server
        .post_json("/api/auth/verify", &noncefree)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("body is JSON");
    assert!(body["error"]
        .as_str()
        .expect("error message present")
        .contains("nonce"));

    // Missing fields
    let response = server
        .post_json("/api/auth/verify", &json!({}))
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The victim's own login still works: failures above burned nothing
    let response = server
        .post_json("/api/auth/verify", &victim.body)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);

    server.teardown().await.expect("Failed to teardown");
}

/// Test that the sled backend keeps invoices and spent nonces across a
/// server restart.
#[tokio::test]
async fn test_sled_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let login = SignedLogin::generate("localhost:8000").expect("signs");

    // First server: store an invoice and spend a login nonce
    let server = TestServer::start_with_sled(dir.path())
        .await
        .expect("Failed to start server");
    let response = server
        .post_json("/api/save-invoice", &invoice_body("INV-3001"))
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    let response = server
        .post_json("/api/auth/verify", &login.body)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    server.teardown().await.expect("Failed to teardown");

    // Second server on the same directory
    let server = TestServer::start_with_sled(dir.path())
        .await
        .expect("Failed to restart server");

    // The invoice survived
    let response = server
        .get("/api/get-invoice/INV-3001")
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::OK);
    let fetched: Value = response.json().await.expect("body is JSON");
    assert_eq!(fetched["invoice"]["clientName"], "Acme Corp");

    // So did the spent nonce: the replay stays blocked
    let response = server
        .post_json("/api/auth/verify", &login.body)
        .await
        .expect("request sends");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let replayed: Value = response.json().await.expect("body is JSON");
    assert_eq!(replayed["error"], "Nonce already used");

    server.teardown().await.expect("Failed to teardown");
}

/// Test the typed client's fallback resolution: an unreachable base is
/// skipped, while HTTP errors from a live base are answers, not outages.
#[tokio::test]
async fn test_api_client_fallback() {
    let server = TestServer::start().await.expect("Failed to start server");

    // Port 9 (discard) refuses connections immediately
    let client = ApiClient::new(vec![
        "http://127.0.0.1:9".to_string(),
        server.base_url().to_string(),
    ])
    .expect("client builds");

    // Number the invoice the way the web client does
    let number = fresh_invoice_number();
    let draft = InvoiceDraft {
        invoice_number: number.clone(),
        client_name: "Acme Corp".to_string(),
        description: "Retainer".to_string(),
        amount: "99.00".to_string(),
        wallet_address: "0x6666666666666666666666666666666666666666".to_string(),
        ..InvoiceDraft::default()
    };

    let stored = client.save_invoice(&draft).await.expect("saves");
    assert_eq!(stored, number);

    let fetched = client
        .get_invoice(&number)
        .await
        .expect("fetches")
        .expect("present");
    assert_eq!(fetched.client_name, "Acme Corp");
    assert_eq!(fetched.status, InvoiceStatus::Pending);

    let updated = client
        .update_invoice(&number, InvoiceStatus::Paid)
        .await
        .expect("updates");
    assert_eq!(updated.status, InvoiceStatus::Paid);

    // A 404 from the live base is a result, not a reason to fall back
    assert_eq!(client.get_invoice("INV-MISSING").await.expect("fetches"), None);
    let err = client
        .update_invoice("INV-MISSING", InvoiceStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    server.teardown().await.expect("Failed to teardown");
}

/// Test a wallet login through the typed client.
#[tokio::test]
async fn test_api_client_login() {
    let server = TestServer::start().await.expect("Failed to start server");
    let client = ApiClient::new(vec![server.base_url().to_string()]).expect("client builds");

    let login = SignedLogin::generate("localhost:8000").expect("signs");
    let verified = client
        .verify_login(
            login.body["address"].as_str().unwrap(),
            login.body["message"].as_str().unwrap(),
            login.body["signature"].as_str().unwrap(),
        )
        .await
        .expect("verifies");
    assert_eq!(verified.address, login.address);
    assert!(!verified.session_token.is_empty());

    // Second attempt maps the replay onto a validation error
    let err = client
        .verify_login(
            login.body["address"].as_str().unwrap(),
            login.body["message"].as_str().unwrap(),
            login.body["signature"].as_str().unwrap(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    server.teardown().await.expect("Failed to teardown");
}
