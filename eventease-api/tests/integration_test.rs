use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use eventease_api::middleware::JwtIdentityProvider;
use eventease_api::{app, state::{AppState, AuthConfig}};
use eventease_core::notify::LogChangeNotifier;
use eventease_core::{Caller, SystemClock};
use eventease_lifecycle::LifecycleRules;
use eventease_store::InMemoryInquiryRepository;
use futures_util::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-secret";

fn test_app() -> Router {
    let clock = Arc::new(SystemClock);
    let repo = Arc::new(InMemoryInquiryRepository::new(clock.clone()));
    let state = AppState::new(
        repo,
        Arc::new(LogChangeNotifier),
        clock,
        LifecycleRules::default(),
        AuthConfig { secret: SECRET.to_string() },
    );
    app(state)
}

fn token(caller: &Caller) -> String {
    JwtIdentityProvider::new(SECRET).issue_token(caller, 600).unwrap()
}

fn client_a() -> String {
    token(&Caller::client("client-a"))
}

fn client_b() -> String {
    token(&Caller::client("client-b"))
}

fn organizer(id: &str, name: &str) -> String {
    token(&Caller::organizer(id, name))
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request(method, uri, bearer, body)).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn wedding() -> Value {
    let event_date = (Utc::now() + chrono::Duration::days(90)).date_naive();
    json!({
        "event_type": "Wedding",
        "event_date": event_date.to_string(),
        "description": "Catering and decoration for 100 guests",
        "location": "221 Baker Street, London",
        "expected_guests": 100,
        "contact": { "name": "Jane Doe", "email": "jane@example.com", "phone": "+44 20 7946 0000" }
    })
}

async fn create_wedding(app: &Router) -> String {
    let (status, body) = send(app, "POST", "/v1/inquiries", Some(&client_a()), Some(wedding())).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_inquiry_quote_accept_flow() {
    let app = test_app();
    let org = organizer("org-1", "Premium Events Ltd");
    let id = create_wedding(&app).await;

    // organizer triage: listed under "new", contact hidden, countdown running
    let (status, listed) = send(&app, "GET", "/v1/inquiries?tab=new", Some(&org), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "new");
    assert!(listed[0]["contact"].is_null());
    assert!(listed[0]["time_remaining_secs"].as_i64().unwrap() > 0);

    let (status, quoted) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/quote", id),
        Some(&org),
        Some(json!({ "amount": "450.00", "currency": "GBP", "message": "incl. catering", "expected_revision": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quoted["status"], "quoted");
    assert_eq!(quoted["organizer_id"], "org-1");
    assert_eq!(quoted["quote"]["amount"], "450.00");
    assert_eq!(quoted["quote"]["message"], "incl. catering");

    let (status, accepted) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/response", id),
        Some(&client_a()),
        Some(json!({ "decision": "accept" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["revision"], 3);

    // contact details are released to the organizer whose quote was accepted
    let (_, seen) = send(&app, "GET", &format!("/v1/inquiries/{}", id), Some(&org), None).await;
    assert_eq!(seen["contact"]["email"], "jane@example.com");
    let (_, rival) = send(
        &app,
        "GET",
        &format!("/v1/inquiries/{}", id),
        Some(&organizer("org-2", "Elite Celebrations")),
        None,
    )
    .await;
    assert!(rival["contact"].is_null());

    let (status, repeated) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/response", id),
        Some(&client_a()),
        Some(json!({ "decision": "decline" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(repeated["code"], "invalid_transition");
}

#[tokio::test]
async fn test_requests_without_valid_token_are_rejected() {
    let app = test_app();
    let (status, body) = send(&app, "GET", "/v1/inquiries", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "authentication_error");

    let (status, _) = send(&app, "GET", "/v1/inquiries", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_error_codes_are_distinguishable() {
    let app = test_app();
    let org = organizer("org-1", "Premium Events Ltd");
    let id = create_wedding(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/quote", id),
        Some(&org),
        Some(json!({ "amount": "0", "currency": "GBP" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, body) = send(&app, "GET", &format!("/v1/inquiries/{}", id), Some(&client_b()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "authorization_error");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/v1/inquiries/{}", uuid::Uuid::new_v4()),
        Some(&client_a()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/inquiries",
        Some(&org),
        Some(wedding()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "authorization_error");

    // the failed quote left the inquiry untouched
    let (_, current) = send(&app, "GET", &format!("/v1/inquiries/{}", id), Some(&client_a()), None).await;
    assert_eq!(current["status"], "new");
    assert_eq!(current["revision"], 1);
}

#[tokio::test]
async fn test_inquiry_without_phone_is_rejected() {
    let app = test_app();
    let mut blank_phone = wedding();
    blank_phone["contact"]["phone"] = json!("  ");

    let (status, body) = send(&app, "POST", "/v1/inquiries", Some(&client_a()), Some(blank_phone)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (_, listed) = send(&app, "GET", "/v1/inquiries", Some(&client_a()), None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_second_organizer_with_stale_view_is_rejected() {
    let app = test_app();
    let id = create_wedding(&app).await;
    let quote = json!({ "amount": "1200", "currency": "EUR", "expected_revision": 1 });

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/quote", id),
        Some(&organizer("org-1", "Premium Events Ltd")),
        Some(quote.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/quote", id),
        Some(&organizer("org-2", "Elite Celebrations")),
        Some(quote),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "stale_state");

    let (_, current) = send(&app, "GET", &format!("/v1/inquiries/{}", id), Some(&client_a()), None).await;
    assert_eq!(current["organizer_id"], "org-1");
}

#[tokio::test]
async fn test_client_cancels_own_inquiry() {
    let app = test_app();
    let id = create_wedding(&app).await;

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/cancel", id),
        Some(&client_b()),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/cancel", id),
        Some(&client_a()),
        Some(json!({ "reason": "Venue fell through" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancellation_reason"], "Venue fell through");
}

#[tokio::test]
async fn test_live_view_streams_snapshot_then_changes() {
    let app = test_app();
    let id = create_wedding(&app).await;

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/v1/live/inquiries/{}", id), Some(&client_a()), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut frames = response.into_body().into_data_stream();

    let mut received = String::new();
    while !received.contains("event: snapshot") {
        let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&frame));
    }
    assert!(received.contains(&id));

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/inquiries/{}/quote", id),
        Some(&organizer("org-1", "Premium Events Ltd")),
        Some(json!({ "amount": "3500", "currency": "GBP" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut received = String::new();
    while !received.contains("event: change") {
        let frame = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&frame));
    }
    assert!(received.contains("\"quoted\""));
}

#[tokio::test]
async fn test_live_view_of_foreign_inquiry_is_refused() {
    let app = test_app();
    let id = create_wedding(&app).await;
    let (status, body) = send(
        &app,
        "GET",
        &format!("/v1/live/inquiries/{}", id),
        Some(&client_b()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "authorization_error");
}

#[tokio::test]
async fn test_description_assist() {
    let app = test_app();
    let (status, body) = send(
        &app,
        "POST",
        "/v1/assist/description",
        Some(&client_a()),
        Some(json!({ "text": "need a dj and   food", "event_type": "Birthday Party" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["enhanced"], true);
    assert!(body["text"].as_str().unwrap().starts_with("Need a dj and food."));

    let (status, body) = send(
        &app,
        "POST",
        "/v1/assist/description",
        Some(&client_a()),
        Some(json!({ "text": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}
