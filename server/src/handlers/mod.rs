use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::Path;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod actor;
pub mod bookings;
pub mod events;
pub mod redemptions;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "ticket-server",
    };

    success(payload, "Health check successful")
}

/// Unwraps a JSON body, turning extractor rejections into the API's
/// validation error envelope.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

/// Same as [`json_body`] for path segments, so a malformed id is answered
/// with the validation envelope instead of axum's plain-text rejection.
fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    path.map(|Path(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}
