use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use super::json_body;
use crate::state::AppState;
use crate::ticketing::{Actor, Operation, RedemptionStatus};
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// Raw text read from the ticket's QR symbol.
    pub qr_data: String,
}

/// Scans are answered with 200 whatever the outcome; the status field says
/// whether the holder may enter.
pub async fn redeem(
    State(state): State<AppState>,
    actor: Actor,
    body: Result<Json<RedeemRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    actor.authorize(Operation::Redeem)?;
    let request = json_body(body)?;

    let result = state.tickets.redeem(&request.qr_data).await?;
    let message = match result.status {
        RedemptionStatus::Redeemed => "Ticket is valid",
        RedemptionStatus::AlreadyUsed => "Ticket has already been used",
        RedemptionStatus::Invalid(_) => "Ticket is not valid",
    };
    Ok(success(result, message))
}
