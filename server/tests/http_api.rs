mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use ticket_server::handlers::actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use ticket_server::routes::create_routes;
use ticket_server::state::AppState;
use ticket_server::ticketing::{credential, Actor};

use common::Harness;

fn app(h: &Harness) -> Router {
    create_routes(AppState::new(h.service.clone()))
}

fn request(method: &str, uri: &str, actor: Option<&Actor>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder
            .header(ACTOR_ID_HEADER, actor.user_id.to_string())
            .header(ACTOR_ROLE_HEADER, actor.role.as_str());
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let h = Harness::new();
    let (status, body) = send_json(&app(&h), request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_missing_actor_headers_are_unauthorized() {
    let h = Harness::new();
    let event = h.event("Career Fair", 5).await;
    let uri = format!("/events/{}/bookings", event.id);

    let (status, body) = send_json(&app(&h), request("POST", &uri, None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_unknown_role_is_unauthorized() {
    let h = Harness::new();
    let request = Request::builder()
        .method("POST")
        .uri("/redemptions")
        .header(ACTOR_ID_HEADER, Uuid::new_v4().to_string())
        .header(ACTOR_ROLE_HEADER, "janitor")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "qr_data": "x" }).to_string()))
        .unwrap();

    let (status, _) = send_json(&app(&h), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_attendees_cannot_manage_events_or_scan() {
    let h = Harness::new();
    let app = app(&h);
    let attendee = h.attendee("Nguyen Van An");

    let draft = json!({
        "name": "Hackathon",
        "event_date": "2026-12-01",
        "location": "Lab 3",
        "total_capacity": 20
    });
    let (status, body) =
        send_json(&app, request("POST", "/events", Some(&attendee), Some(draft))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let scan = json!({ "qr_data": "anything" });
    let (status, _) =
        send_json(&app, request("POST", "/redemptions", Some(&attendee), Some(scan))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admins_do_not_book_tickets() {
    let h = Harness::new();
    let event = h.event("Career Fair", 5).await;
    let uri = format!("/events/{}/bookings", event.id);

    let (status, _) = send_json(&app(&h), request("POST", &uri, Some(&h.admin), None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(h.capacity(event.id).await.remaining, 5);
}

#[tokio::test]
async fn test_event_creation_validates_fields() {
    let h = Harness::new();
    let app = app(&h);

    let draft = json!({
        "name": "Hackathon",
        "event_date": "01/12/2026",
        "location": "Lab 3",
        "total_capacity": 20
    });
    let (status, body) =
        send_json(&app, request("POST", "/events", Some(&h.admin), Some(draft))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "event_date");

    let req = request("POST", "/events", Some(&h.admin), Some(json!({ "name": 3 })));
    let (status, body) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let draft = json!({
        "name": "Hackathon",
        "event_date": "2026-12-01",
        "location": "Lab 3",
        "total_capacity": 20
    });
    let (status, body) =
        send_json(&app, request("POST", "/events", Some(&h.admin), Some(draft))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["remaining_capacity"], 20);
}

#[tokio::test]
async fn test_booking_download_and_scan_over_http() {
    let h = Harness::new();
    let app = app(&h);
    let event = h.event("Career Fair", 1).await;
    let attendee = h.attendee("Nguyen Van An");
    let latecomer = h.attendee("Tran Van Bao");
    let staff = Actor::new(Uuid::new_v4(), ticket_server::ticketing::Role::Organizer);
    let bookings_uri = format!("/events/{}/bookings", event.id);

    let (status, body) =
        send_json(&app, request("POST", &bookings_uri, Some(&attendee), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["artifact"]["status"], "stored");
    let code = body["data"]["credential_code"].as_str().unwrap().to_string();

    let (status, body) =
        send_json(&app, request("POST", &bookings_uri, Some(&attendee), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["reason"], "duplicate_booking");

    let (status, body) =
        send_json(&app, request("POST", &bookings_uri, Some(&latecomer), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["reason"], "no_capacity");

    let (status, body) =
        send_json(&app, request("GET", &format!("/bookings/{code}"), Some(&attendee), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_used"], false);

    // Another attendee cannot see someone else's ticket
    let (status, _) =
        send_json(&app, request("GET", &format!("/bookings/{code}"), Some(&latecomer), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/bookings/{code}/artifact"), Some(&attendee), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    let png = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(png.starts_with(b"\x89PNG"));

    let scan = json!({ "qr_data": credential::encode(&code, attendee.user_id, event.id) });
    let (status, body) =
        send_json(&app, request("POST", "/redemptions", Some(&staff), Some(scan.clone()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "redeemed");
    assert_eq!(body["data"]["display"]["holder"]["full_name"], "Nguyen Van An");

    let (status, body) =
        send_json(&app, request("POST", "/redemptions", Some(&staff), Some(scan))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "already_used");

    let garbage = json!({ "qr_data": "not a ticket" });
    let (status, body) =
        send_json(&app, request("POST", "/redemptions", Some(&staff), Some(garbage))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "invalid");
    assert_eq!(body["data"]["reason"], "malformed");
}

#[tokio::test]
async fn test_admin_booking_management_over_http() {
    let h = Harness::new();
    let app = app(&h);
    let event = h.event("Career Fair", 3).await;
    let attendee = h.attendee("Nguyen Van An");
    let receipt = h.service.book_ticket(&attendee, event.id).await.unwrap();
    let uri = format!("/admin/bookings/{}", receipt.booking_id);

    let (status, _) = send_json(&app, request("DELETE", &uri, Some(&attendee), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send_json(&app, request("PATCH", &uri, Some(&h.admin), Some(json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "override");

    let change = json!({ "is_approved": false });
    let (status, body) =
        send_json(&app, request("PATCH", &uri, Some(&h.admin), Some(change))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_approved"], false);

    let (status, _) = send_json(&app, request("DELETE", &uri, Some(&h.admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.capacity(event.id).await.remaining, 3);

    let (status, body) = send_json(&app, request("DELETE", &uri, Some(&h.admin), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_capacity_resize_over_http() {
    let h = Harness::new();
    let app = app(&h);
    let event = h.event("Career Fair", 2).await;
    let attendee = h.attendee("Nguyen Van An");
    h.service.book_ticket(&attendee, event.id).await.unwrap();
    let uri = format!("/events/{}/capacity", event.id);

    let req = request("PUT", &uri, Some(&h.admin), Some(json!({ "total_capacity": 0 })));
    let (status, body) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["details"]["field"], "total_capacity");

    let req = request("PUT", &uri, Some(&h.admin), Some(json!({ "total_capacity": 10 })));
    let (status, body) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "total": 10, "remaining": 9 }));

    let req = request("DELETE", &format!("/events/{}", event.id), Some(&h.admin), None);
    let (status, _) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let req = request("PUT", &uri, Some(&h.admin), Some(json!({ "total_capacity": 10 })));
    let (status, _) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_path_id_uses_error_envelope() {
    let h = Harness::new();
    let app = app(&h);
    let attendee = h.attendee("Nguyen Van An");

    let (status, body) =
        send_json(&app, request("POST", "/events/not-a-uuid/bookings", Some(&attendee), None))
            .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) =
        send_json(&app, request("DELETE", "/admin/bookings/42", Some(&h.admin), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_releasing_a_users_bookings_over_http() {
    let h = Harness::new();
    let app = app(&h);
    let fair = h.event("Career Fair", 3).await;
    let expo = h.event("Tech Expo", 3).await;
    let attendee = h.attendee("Nguyen Van An");
    h.service.book_ticket(&attendee, fair.id).await.unwrap();
    h.service.book_ticket(&attendee, expo.id).await.unwrap();
    let uri = format!("/admin/users/{}/bookings", attendee.user_id);

    let staff = Actor::new(Uuid::new_v4(), ticket_server::ticketing::Role::Organizer);
    let (status, body) = send_json(&app, request("DELETE", &uri, Some(&staff), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = send_json(&app, request("DELETE", &uri, Some(&h.admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["bookings_released"], 2);
    assert_eq!(h.capacity(fair.id).await.remaining, 3);
    assert_eq!(h.capacity(expo.id).await.remaining, 3);
    assert_eq!(h.store.booking_count(), 0);
}
