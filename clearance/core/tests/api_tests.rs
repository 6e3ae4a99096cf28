// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP gateway tests: identity headers, role checks, status codes and
//! error kinds, driven through the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use clearance_core::application::StandardClearanceService;
use clearance_core::infrastructure::event_bus::EventBus;
use clearance_core::infrastructure::repositories::InMemoryClearanceRepository;
use clearance_core::presentation::api::app;

fn router() -> Router {
    let event_bus = Arc::new(EventBus::new(64));
    let service = Arc::new(StandardClearanceService::new(
        Arc::new(InMemoryClearanceRepository::new()),
        event_bus.clone(),
    ));
    app(service, event_bus)
}

enum As<'a> {
    Anonymous,
    Student(&'a str),
    Staff(&'a str),
    Admin,
}

fn request(method: &str, uri: &str, who: As<'_>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    builder = match who {
        As::Anonymous => builder,
        As::Student(id) => builder.header("x-actor-id", id).header("x-actor-role", "student"),
        As::Staff(department) => builder
            .header("x-actor-id", format!("{}-staff", department))
            .header("x-actor-role", "department")
            .header("x-actor-department", department),
        As::Admin => builder.header("x-actor-id", "registrar").header("x-actor-role", "admin"),
    };
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health_needs_no_identity() {
    let app = router();
    let (status, body) = send(&app, request("GET", "/health", As::Anonymous, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = router();
    let (status, body) = send(&app, request("GET", "/api/clearances/s-1", As::Anonymous, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "Unauthorized");

    let req = Request::builder()
        .uri("/api/clearances/s-1")
        .header("x-actor-id", "x")
        .header("x-actor-role", "department")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_student_creates_and_reads_own_record() {
    let app = router();

    let (status, body) = send(&app, request("POST", "/api/clearances", As::Student("s-1"), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["studentId"], "s-1");
    assert_eq!(body["overallStatus"], "pending");
    assert_eq!(body["departmentStatuses"]["studentServices"]["status"], "pending");
    assert_eq!(body["overallBadge"]["cssClass"], "status-pending");

    let (status, body) = send(&app, request("POST", "/api/clearances", As::Student("s-1"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "AlreadyExists");

    let (status, _) = send(&app, request("GET", "/api/clearances/s-1", As::Student("s-1"), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, request("GET", "/api/clearances/s-1", As::Student("s-2"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request("POST", "/api/clearances", As::Student("s-2"), Some(json!({ "studentId": "s-1" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_department_updates_only_its_own_status() {
    let app = router();
    send(&app, request("POST", "/api/clearances", As::Student("s-1"), None)).await;

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/api/clearances/s-1/departments/library",
            As::Staff("library"),
            Some(json!({ "status": "rejected", "remarks": "Two books overdue" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overallStatus"], "rejected");
    assert_eq!(body["departmentStatuses"]["library"]["remarks"], "Two books overdue");
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/api/clearances/s-1/departments/fee",
            As::Staff("library"),
            Some(json!({ "status": "cleared" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "Forbidden");
}

#[tokio::test]
async fn test_validation_errors_are_unprocessable_with_kind() {
    let app = router();
    send(&app, request("POST", "/api/clearances", As::Student("s-1"), None)).await;

    let cases = [
        ("/api/clearances/s-1/departments/cafeteria", json!({ "status": "cleared" }), "InvalidDepartmentKind"),
        ("/api/clearances/s-1/departments/fee", json!({ "status": "approved" }), "InvalidStatusValue"),
        ("/api/clearances/s-1/departments/fee", json!({ "status": "rejected" }), "MissingRemarks"),
    ];
    for (uri, body, kind) in cases {
        let (status, response) = send(&app, request("PUT", uri, As::Admin, Some(body))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", kind);
        assert_eq!(response["kind"], kind);
        assert!(response["error"].as_str().is_some());
    }

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/clearances/s-1/messages",
            As::Student("s-1"),
            Some(json!({ "to": "library", "message": "  " })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "EmptyMessage");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/clearances/s-1/messages",
            As::Student("s-1"),
            Some(json!({ "to": "student", "message": "hello me" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "InvalidRecipient");
}

#[tokio::test]
async fn test_unknown_record_is_not_found() {
    let app = router();
    let (status, body) = send(&app, request("GET", "/api/clearances/nobody", As::Admin, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
}

#[tokio::test]
async fn test_reopen_and_listing() {
    let app = router();
    send(&app, request("POST", "/api/clearances", As::Admin, Some(json!({ "studentId": "s-9" })))).await;
    send(
        &app,
        request(
            "PUT",
            "/api/clearances/s-9/departments/hostel",
            As::Staff("hostel"),
            Some(json!({ "status": "notApplicable", "notify": false })),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request("GET", "/api/clearances?department=hostel&status=notApplicable", As::Staff("hostel"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        request("POST", "/api/clearances/s-9/departments/hostel/reopen", As::Staff("hostel"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["departmentStatuses"]["hostel"]["status"], "pending");

    let (status, _) = send(&app, request("GET", "/api/clearances", As::Student("s-9"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, request("GET", "/api/clearances?overall=maybe", As::Admin, None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "InvalidStatusValue");
}

#[tokio::test]
async fn test_department_sees_only_its_conversation() {
    let app = router();
    send(&app, request("POST", "/api/clearances", As::Student("s-1"), None)).await;
    for to in ["library", "transport"] {
        let (status, _) = send(
            &app,
            request(
                "POST",
                "/api/clearances/s-1/messages",
                As::Student("s-1"),
                Some(json!({ "to": to, "message": format!("Question for {}", to) })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, request("GET", "/api/clearances/s-1/messages", As::Staff("library"), None)).await;
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["to"], "library");

    let (_, body) = send(&app, request("GET", "/api/clearances/s-1/messages", As::Student("s-1"), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/clearances/s-1/messages",
            As::Admin,
            Some(json!({ "to": "student", "message": "hi" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_cannot_post_into_another_department_conversation() {
    let app = router();
    send(&app, request("POST", "/api/clearances", As::Student("s-1"), None)).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/clearances/s-1/messages",
            As::Staff("library"),
            Some(json!({ "to": "fee", "message": "Dues are settled" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "InvalidRecipient");

    let (_, body) = send(&app, request("GET", "/api/clearances/s-1/messages", As::Staff("fee"), None)).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/api/clearances/s-1/messages",
            As::Staff("library"),
            Some(json!({ "to": "student", "message": "Return two books" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, body) = send(&app, request("GET", "/api/clearances/s-1/messages", As::Staff("library"), None)).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}
