use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{bookings, events, health_check, redemptions};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events", post(events::create_event))
        .route("/events/:event_id", delete(events::delete_event))
        .route("/events/:event_id/capacity", put(events::resize_capacity))
        .route("/events/:event_id/bookings", post(bookings::book_ticket))
        .route("/bookings/:code", get(bookings::get_booking))
        .route("/bookings/:code/artifact", get(bookings::download_artifact))
        .route(
            "/admin/bookings/:booking_id",
            delete(bookings::cancel_booking).patch(bookings::override_booking),
        )
        .route(
            "/admin/users/:user_id/bookings",
            delete(bookings::release_holder_bookings),
        )
        .route("/redemptions", post(redemptions::redeem))
        .with_state(state)
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
}
