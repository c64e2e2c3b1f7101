//! Booking orchestration: reserve a place, issue the credential, render the
//! printable ticket.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::access::Actor;
use super::artifact::ArtifactError;
use super::compensation::{CompensationLog, Undo};
use super::credential;
use super::error::{ConflictKind, Resource, TicketingError};
use super::TicketingService;
use crate::models::{Booking, Event, NewBooking, User};
use crate::store::StoreError;

/// Attempts at drawing a credential code that has never been issued.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStage {
    Requested,
    CapacityReserved,
    CredentialIssued,
    ArtifactRendered,
    Committed,
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BookingStage::Requested => "requested",
            BookingStage::CapacityReserved => "capacity_reserved",
            BookingStage::CredentialIssued => "credential_issued",
            BookingStage::ArtifactRendered => "artifact_rendered",
            BookingStage::Committed => "committed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    Stored,
    /// The booking is valid; the image can be regenerated on download.
    Missing { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub booking_id: Uuid,
    pub credential_code: String,
    pub artifact: ArtifactStatus,
}

impl TicketingService {
    /// Books one ticket for the acting user.
    ///
    /// Capacity is reserved before anything is written. If the booking row
    /// cannot be persisted the reservation is released again. A failed
    /// artifact render does not undo the booking.
    pub async fn book_ticket(
        &self,
        actor: &Actor,
        event_id: Uuid,
    ) -> Result<BookingReceipt, TicketingError> {
        let user_id = actor.user_id;
        let mut stage = BookingStage::Requested;
        debug!(%user_id, %event_id, %stage, "Booking requested");

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(TicketingError::NotFound(Resource::User))?;
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(TicketingError::NotFound(Resource::Event))?;
        if self.store.find_booking_for_holder(user_id, event_id).await?.is_some() {
            info!(%user_id, %event_id, "Booking rejected, user already holds a ticket");
            return Err(TicketingError::Conflict(ConflictKind::Duplicate));
        }

        self.ledger.reserve(event_id).await.inspect_err(|e| {
            info!(%user_id, %event_id, error = %e, "Booking rejected at reservation");
        })?;
        let mut compensation = CompensationLog::default();
        compensation.record(Undo::ReleaseSlot(event_id));
        stage = BookingStage::CapacityReserved;
        debug!(%user_id, %event_id, %stage, "Booking advanced");

        let booking = match self.persist_booking(&user, &event).await {
            Ok(booking) => booking,
            Err(e) => {
                warn!(
                    %user_id,
                    %event_id,
                    %stage,
                    error = %e,
                    "Booking could not be persisted, compensating"
                );
                compensation.unwind(self.store.as_ref()).await;
                return Err(e);
            }
        };
        compensation.commit();
        stage = BookingStage::CredentialIssued;
        debug!(booking_id = %booking.id, %stage, "Booking advanced");

        let artifact = self.issue_artifact(&booking).await;
        if artifact == ArtifactStatus::Stored {
            stage = BookingStage::ArtifactRendered;
            debug!(booking_id = %booking.id, %stage, "Booking advanced");
        }

        stage = BookingStage::Committed;
        info!(
            booking_id = %booking.id,
            %user_id,
            %event_id,
            %stage,
            artifact_stored = artifact == ArtifactStatus::Stored,
            "Ticket booked"
        );

        Ok(BookingReceipt {
            booking_id: booking.id,
            credential_code: booking.credential_code,
            artifact,
        })
    }

    /// Looks up a booking by code on behalf of its holder.
    pub async fn booking_by_code(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> Result<Booking, TicketingError> {
        if !credential::is_well_formed_code(code) {
            return Err(TicketingError::NotFound(Resource::Booking));
        }
        self.store
            .find_booking_by_code(code)
            .await?
            .filter(|booking| booking.user_id == user_id)
            .ok_or(TicketingError::NotFound(Resource::Booking))
    }

    /// Returns the ticket image, rendering it again from the snapshots if it
    /// is missing from the artifact store.
    pub async fn artifact_for(&self, code: &str, user_id: Uuid) -> Result<Vec<u8>, TicketingError> {
        let booking = self.booking_by_code(code, user_id).await?;
        if let Some(bytes) = self.artifacts.get(&booking.credential_code).await? {
            return Ok(bytes);
        }

        info!(booking_id = %booking.id, "Ticket artifact missing, regenerating");
        Ok(self.render_and_store(&booking).await?)
    }

    async fn persist_booking(&self, user: &User, event: &Event) -> Result<Booking, TicketingError> {
        for attempt in 1..=MAX_CREDENTIAL_ATTEMPTS {
            let new_booking = NewBooking {
                id: Uuid::new_v4(),
                user_id: user.id,
                event_id: event.id,
                credential_code: credential::generate_code(),
                holder_snapshot: user.holder_snapshot(),
                event_snapshot: event.snapshot(),
            };

            match self.store.insert_booking(new_booking).await {
                Ok(booking) => return Ok(booking),
                Err(StoreError::CredentialTaken(code)) => {
                    warn!(attempt, %code, "Credential code already issued, drawing another");
                }
                Err(StoreError::DuplicateBooking) => {
                    return Err(TicketingError::Conflict(ConflictKind::Duplicate));
                }
                Err(StoreError::MissingEvent) => {
                    return Err(TicketingError::NotFound(Resource::Event));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(TicketingError::Conflict(ConflictKind::CredentialCollision))
    }

    async fn issue_artifact(&self, booking: &Booking) -> ArtifactStatus {
        match self.render_and_store(booking).await {
            Ok(_) => ArtifactStatus::Stored,
            Err(e) => {
                warn!(
                    booking_id = %booking.id,
                    error = %e,
                    "Ticket artifact could not be produced, booking stays valid"
                );
                ArtifactStatus::Missing { reason: e.to_string() }
            }
        }
    }

    pub(crate) async fn render_and_store(
        &self,
        booking: &Booking,
    ) -> Result<Vec<u8>, ArtifactError> {
        let renderer = Arc::clone(&self.renderer);
        let snapshot = booking.clone();
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&snapshot))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))??;

        self.artifacts.put(&booking.credential_code, bytes.clone()).await?;
        Ok(bytes)
    }
}
