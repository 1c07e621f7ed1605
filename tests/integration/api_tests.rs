//! API integration tests against a running server
//!
//! Expects a server on localhost:8080 backed by a database seeded with
//! reader 1 and an available copy whose QR code is `QR-TEST-0001`.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_list_overdue_loans() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowings?status=OVERDUE&page=1&perPage=10", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert!(body["data"]["items"].is_array());
    for loan in body["data"]["items"].as_array().unwrap() {
        assert_eq!(loan["status"], "OVERDUE");
    }
}

#[tokio::test]
#[ignore]
async fn test_borrow_then_return_once() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .json(&json!({
            "qrCode": "QR-TEST-0001",
            "readerId": 1
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["status"], "BORROWED");
    assert_eq!(body["data"]["fineAmount"], 0);
    let loan_id = body["data"]["borrowId"].as_i64().expect("No borrowId");

    let response = client
        .put(format!("{}/borrowings/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["status"], "RETURNED");
    assert_eq!(body["data"]["bookCopy"]["status"], "AVAILABLE");

    // A second return is an invalid transition
    let response = client
        .put(format!("{}/borrowings/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_fine_on_borrowed_loan_rejected() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrowings", BASE_URL))
        .json(&json!({
            "qrCode": "QR-TEST-0001",
            "readerId": 1
        }))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let loan_id = body["data"]["borrowId"].as_i64().expect("No borrowId");

    let response = client
        .put(format!("{}/borrowings/{}/fine", BASE_URL, loan_id))
        .json(&json!({ "fineAmount": 10000 }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);

    // Leave the copy available for the next run
    client
        .put(format!("{}/borrowings/{}/return", BASE_URL, loan_id))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to send request");
}

#[tokio::test]
#[ignore]
async fn test_get_unknown_loan() {
    let client = Client::new();

    let response = client
        .get(format!("{}/borrowings/999999999", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], false);
}
