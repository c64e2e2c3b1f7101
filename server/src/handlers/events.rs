use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{json_body, path_param};
use crate::state::AppState;
use crate::ticketing::{Actor, EventDraft, Operation};
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct ResizeRequest {
    pub total_capacity: i64,
}

#[derive(Serialize)]
struct DeletedEvent {
    event_id: Uuid,
    bookings_removed: usize,
}

pub async fn create_event(
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<EventDraft>, JsonRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::CreateEvent)?;
    let draft = json_body(body)?;

    let event = state.tickets.create_event(&actor, draft).await?;
    Ok(created(event, "Event created"))
}

pub async fn delete_event(
    State(state): State<AppState>,
    actor: Actor,
    event_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::DeleteEvent)?;
    let event_id = path_param(event_id)?;

    let bookings_removed = state.tickets.delete_event(&actor, event_id).await?;
    Ok(success(
        DeletedEvent {
            event_id,
            bookings_removed,
        },
        "Event and its bookings deleted",
    ))
}

pub async fn resize_capacity(
    State(state): State<AppState>,
    actor: Actor,
    event_id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ResizeRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::ResizeEvent)?;
    let event_id = path_param(event_id)?;
    let request = json_body(body)?;

    let capacity = state
        .tickets
        .resize_event_capacity(&actor, event_id, request.total_capacity)
        .await?;
    Ok(success(capacity, "Event capacity updated"))
}
