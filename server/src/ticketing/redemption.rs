use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::credential;
use super::error::TicketingError;
use super::TicketingService;
use crate::models::{Booking, DisplayFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// The payload could not be decoded.
    Malformed,
    /// No booking matches code, holder and event together.
    NoMatchingBooking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RedemptionStatus {
    Redeemed,
    AlreadyUsed,
    Invalid(InvalidReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedemptionResult {
    #[serde(flatten)]
    pub status: RedemptionStatus,
    pub display: Option<DisplayFields>,
}

impl RedemptionResult {
    fn invalid(reason: InvalidReason) -> Self {
        Self {
            status: RedemptionStatus::Invalid(reason),
            display: None,
        }
    }

    fn for_booking(status: RedemptionStatus, booking: &Booking) -> Self {
        Self {
            status,
            display: Some(booking.display_fields()),
        }
    }
}

impl TicketingService {
    /// Validates a scanned payload and marks the matching ticket used.
    ///
    /// Only one of any number of concurrent scans of the same ticket sees
    /// `Redeemed`; every other scan sees `AlreadyUsed`. A booking cancelled
    /// mid-scan is reported as matching nothing.
    pub async fn redeem(&self, payload: &str) -> Result<RedemptionResult, TicketingError> {
        let claim = match credential::decode(payload) {
            Ok(claim) => claim,
            Err(e) => {
                info!(error = %e, "Rejected scan");
                return Ok(RedemptionResult::invalid(InvalidReason::Malformed));
            }
        };

        let Some(booking) = self
            .store
            .find_redeemable(&claim.credential_code, claim.user_id, claim.event_id)
            .await?
        else {
            warn!(
                user_id = %claim.user_id,
                event_id = %claim.event_id,
                "Scanned credential matches no booking"
            );
            return Ok(RedemptionResult::invalid(InvalidReason::NoMatchingBooking));
        };

        if booking.is_used {
            info!(booking_id = %booking.id, "Ticket already used");
            return Ok(RedemptionResult::for_booking(RedemptionStatus::AlreadyUsed, &booking));
        }

        if self.store.mark_used(booking.id, Utc::now()).await? {
            info!(booking_id = %booking.id, event_id = %booking.event_id, "Ticket redeemed");
            return Ok(RedemptionResult::for_booking(RedemptionStatus::Redeemed, &booking));
        }

        // The flag did not flip: either another scan won or the booking is gone
        match self.store.find_booking(booking.id).await? {
            Some(current) => {
                info!(booking_id = %booking.id, "Ticket redeemed by a concurrent scan");
                Ok(RedemptionResult::for_booking(RedemptionStatus::AlreadyUsed, &current))
            }
            None => {
                warn!(
                    booking_id = %booking.id,
                    event_id = %booking.event_id,
                    "Booking was cancelled while its ticket was being scanned"
                );
                Ok(RedemptionResult::invalid(InvalidReason::NoMatchingBooking))
            }
        }
    }
}
