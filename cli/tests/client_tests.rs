// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `ClearanceClient` against a mock server: identity headers, decoding into
//! domain types, and error bodies surfaced to the user.

use clearance_core::domain::clearance::{ClearanceRecord, StudentId};
use clearance_core::domain::department::OverallStatus;
use clearance_desk::server::{ClearanceClient, Identity};

fn client_for(server: &mockito::ServerGuard, identity: Option<Identity>) -> ClearanceClient {
    let host_with_port = server.host_with_port();
    let (host, port) = host_with_port.split_once(':').unwrap();
    ClearanceClient::new(host, port.parse().unwrap(), identity).unwrap()
}

fn officer() -> Identity {
    Identity {
        id: "lib-officer".to_string(),
        role: "department".to_string(),
        department: Some("library".to_string()),
    }
}

#[tokio::test]
async fn test_get_record_sends_identity_and_decodes() {
    let mut server = mockito::Server::new_async().await;
    let record = ClearanceRecord::initialize(StudentId::new("s-1").unwrap());
    let mock = server
        .mock("GET", "/api/clearances/s-1")
        .match_header("x-actor-id", "lib-officer")
        .match_header("x-actor-role", "department")
        .match_header("x-actor-department", "library")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&record).unwrap())
        .create_async()
        .await;

    let client = client_for(&server, Some(officer()));
    let fetched = client.get_record("s-1").await.unwrap();

    mock.assert_async().await;
    assert_eq!(fetched.student_id.as_str(), "s-1");
    assert_eq!(fetched.overall_status(), OverallStatus::Pending);
}

#[tokio::test]
async fn test_error_body_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/api/clearances/s-1/departments/library")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":"Remarks are required when rejecting","kind":"MissingRemarks"}"#)
        .create_async()
        .await;

    let client = client_for(&server, Some(officer()));
    let err = client
        .set_status("s-1", "library", "rejected", "", true)
        .await
        .unwrap_err()
        .to_string();

    assert!(err.contains("422"), "{}", err);
    assert!(err.contains("MissingRemarks"), "{}", err);
}

#[tokio::test]
async fn test_broadcast_returns_delivered_count() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/mailbox/broadcast")
        .match_header("x-actor-role", "admin")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"delivered":3}"#)
        .create_async()
        .await;

    let admin = Identity {
        id: "registrar".to_string(),
        role: "admin".to_string(),
        department: None,
    };
    let client = client_for(&server, Some(admin));
    let delivered = client.mailbox_broadcast(&[], "Convocation", "Friday 10am").await.unwrap();
    assert_eq!(delivered, 3);
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    // Nothing listens on the discard port
    let client = ClearanceClient::new("127.0.0.1", 9, None).unwrap();
    assert!(client.health().await.is_err());
}

#[tokio::test]
async fn test_path_segments_are_percent_encoded() {
    let mut server = mockito::Server::new_async().await;
    let record = ClearanceRecord::initialize(StudentId::new("2021/CS 7?").unwrap());
    let mock = server
        .mock("GET", "/api/clearances/2021%2FCS%207%3F")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(serde_json::to_string(&record).unwrap())
        .create_async()
        .await;

    let client = client_for(&server, Some(officer()));
    let fetched = client.get_record("2021/CS 7?").await.unwrap();

    mock.assert_async().await;
    assert_eq!(fetched.student_id.as_str(), "2021/CS 7?");
}

#[tokio::test]
async fn test_list_records_sends_filters_as_query() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/api/clearances")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("department".into(), "library".into()),
            mockito::Matcher::UrlEncoded("status".into(), "pending".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let client = client_for(&server, Some(officer()));
    let records = client.list_records(Some("library"), Some("pending"), None).await.unwrap();

    mock.assert_async().await;
    assert!(records.is_empty());
}
