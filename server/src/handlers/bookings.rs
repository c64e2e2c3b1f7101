use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::{json_body, path_param};
use crate::models::{Booking, BookingOverride};
use crate::state::AppState;
use crate::ticketing::artifact::ARTIFACT_EXTENSION;
use crate::ticketing::{Actor, ArtifactStatus, Operation};
use crate::utils::error::AppError;
use crate::utils::response::{created, png_attachment, success};

#[derive(Serialize)]
struct ReleasedBookings {
    user_id: Uuid,
    bookings_released: usize,
    bookings: Vec<Booking>,
}

pub async fn book_ticket(
    State(state): State<AppState>,
    actor: Actor,
    event_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::BookTicket)?;
    let event_id = path_param(event_id)?;

    let receipt = state.tickets.book_ticket(&actor, event_id).await?;
    let message = match receipt.artifact {
        ArtifactStatus::Stored => "Ticket booked",
        ArtifactStatus::Missing { .. } => {
            "Ticket booked, the ticket image will be generated on download"
        }
    };
    Ok(created(receipt, message))
}

pub async fn get_booking(
    State(state): State<AppState>,
    actor: Actor,
    code: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::ViewOwnBooking)?;
    let code = path_param(code)?;

    let booking = state.tickets.booking_by_code(&code, actor.user_id).await?;
    Ok(success(booking, "Booking found"))
}

pub async fn download_artifact(
    State(state): State<AppState>,
    actor: Actor,
    code: Result<Path<String>, PathRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::ViewOwnBooking)?;
    let code = path_param(code)?;

    let bytes = state.tickets.artifact_for(&code, actor.user_id).await?;
    Ok(png_attachment(bytes, &format!("{code}.{ARTIFACT_EXTENSION}")))
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    actor: Actor,
    booking_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::CancelBooking)?;
    let booking_id = path_param(booking_id)?;

    let booking = state.tickets.cancel_booking(&actor, booking_id).await?;
    Ok(success(booking, "Booking cancelled"))
}

pub async fn override_booking(
    State(state): State<AppState>,
    actor: Actor,
    booking_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<BookingOverride>, JsonRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::OverrideBooking)?;
    let booking_id = path_param(booking_id)?;
    let change = json_body(body)?;

    let booking = state.tickets.override_booking(&actor, booking_id, change).await?;
    Ok(success(booking, "Booking updated"))
}

pub async fn release_holder_bookings(
    State(state): State<AppState>,
    actor: Actor,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::ReleaseHolderBookings)?;
    let user_id = path_param(user_id)?;

    let released = state.tickets.release_holder_bookings(&actor, user_id).await?;
    Ok(success(
        ReleasedBookings {
            user_id,
            bookings_released: released.len(),
            bookings: released,
        },
        "User bookings released",
    ))
}
