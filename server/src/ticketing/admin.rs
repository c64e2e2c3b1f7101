use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::access::Actor;
use super::compensation::{CompensationLog, Undo};
use super::error::{Resource, TicketingError};
use super::TicketingService;
use crate::models::{Booking, BookingOverride, Capacity, Event, NewEvent};

const EVENT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Event fields as submitted by an administrator, not yet validated.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDraft {
    pub name: String,
    pub event_date: String,
    pub location: String,
    pub description: Option<String>,
    pub total_capacity: i64,
}

impl EventDraft {
    fn validate(self) -> Result<NewEvent, TicketingError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(TicketingError::validation("name", "must not be empty"));
        }
        let location = self.location.trim();
        if location.is_empty() {
            return Err(TicketingError::validation("location", "must not be empty"));
        }
        let event_date = NaiveDate::parse_from_str(self.event_date.trim(), EVENT_DATE_FORMAT)
            .map_err(|_| {
                TicketingError::validation("event_date", "expected a date formatted as YYYY-MM-DD")
            })?;
        let total_capacity = i32::try_from(self.total_capacity)
            .ok()
            .filter(|total| *total >= 0)
            .ok_or_else(|| {
                TicketingError::validation("total_capacity", "must be between 0 and 2147483647")
            })?;

        Ok(NewEvent {
            name: name.to_string(),
            event_date,
            location: location.to_string(),
            description: self
                .description
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            total_capacity,
        })
    }
}

impl TicketingService {
    pub async fn create_event(
        &self,
        actor: &Actor,
        draft: EventDraft,
    ) -> Result<Event, TicketingError> {
        let event = draft.validate()?.into_event();
        self.store.insert_event(&event).await?;
        info!(
            event_id = %event.id,
            actor = %actor.user_id,
            total = event.total_capacity,
            "Event created"
        );
        Ok(event)
    }

    /// Deletes the event and every booking for it. Ticket images are removed
    /// afterwards on a best-effort basis.
    pub async fn delete_event(
        &self,
        actor: &Actor,
        event_id: Uuid,
    ) -> Result<usize, TicketingError> {
        let removed = self
            .store
            .delete_event(event_id)
            .await?
            .ok_or(TicketingError::NotFound(Resource::Event))?;

        for booking in &removed {
            self.discard_artifact(booking).await;
        }
        info!(%event_id, actor = %actor.user_id, bookings = removed.len(), "Event deleted");
        Ok(removed.len())
    }

    pub async fn resize_event_capacity(
        &self,
        actor: &Actor,
        event_id: Uuid,
        new_total: i64,
    ) -> Result<Capacity, TicketingError> {
        let capacity = self.ledger.resize(event_id, new_total).await?;
        info!(
            %event_id,
            actor = %actor.user_id,
            total = capacity.total,
            remaining = capacity.remaining,
            "Event capacity resized"
        );
        Ok(capacity)
    }

    /// Deletes a booking. An unused booking gives its place back; if that
    /// fails the booking is restored and the error returned.
    pub async fn cancel_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
    ) -> Result<Booking, TicketingError> {
        let booking = self
            .withdraw_booking(booking_id)
            .await?
            .ok_or(TicketingError::NotFound(Resource::Booking))?;

        info!(
            %booking_id,
            actor = %actor.user_id,
            was_used = booking.is_used,
            "Booking cancelled"
        );
        Ok(booking)
    }

    /// Withdraws every booking a user holds, as when their account is
    /// removed. Each booking is cancelled on its own: unused ones give their
    /// place back, used ones do not. Stops at the first booking that cannot
    /// be withdrawn; the ones already withdrawn stay withdrawn.
    pub async fn release_holder_bookings(
        &self,
        actor: &Actor,
        user_id: Uuid,
    ) -> Result<Vec<Booking>, TicketingError> {
        let held = self.store.find_bookings_for_user(user_id).await?;
        let mut released = Vec::with_capacity(held.len());
        for booking in held {
            // Already gone if an administrator cancelled it concurrently
            if let Some(booking) = self.withdraw_booking(booking.id).await? {
                released.push(booking);
            }
        }

        info!(
            %user_id,
            actor = %actor.user_id,
            bookings = released.len(),
            places_returned = released.iter().filter(|b| !b.is_used).count(),
            "Holder bookings released"
        );
        Ok(released)
    }

    /// Deletes one booking, returns its place if it was never used and drops
    /// its ticket image. `None` when the booking does not exist.
    async fn withdraw_booking(&self, booking_id: Uuid) -> Result<Option<Booking>, TicketingError> {
        let Some(booking) = self.store.delete_booking(booking_id).await? else {
            return Ok(None);
        };

        if !booking.is_used {
            let mut compensation = CompensationLog::default();
            compensation.record(Undo::RestoreBooking(Box::new(booking.clone())));
            if let Err(e) = self.ledger.release(booking.event_id).await {
                warn!(%booking_id, error = %e, "Capacity release failed, compensating");
                let stranded = compensation.unwind(self.store.as_ref()).await;
                if !stranded.is_empty() {
                    error!(
                        %booking_id,
                        event_id = %booking.event_id,
                        credential_code = %booking.credential_code,
                        "Booking is deleted but its place was not returned; \
                         one place of the event is lost until capacity is resized"
                    );
                }
                return Err(e);
            }
            compensation.commit();
        }

        self.discard_artifact(&booking).await;
        Ok(Some(booking))
    }

    /// Administrative escape hatch outside the redemption protocol. Every
    /// change is written to the audit log.
    pub async fn override_booking(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        change: BookingOverride,
    ) -> Result<Booking, TicketingError> {
        if change.is_empty() {
            return Err(TicketingError::validation("override", "no fields to change"));
        }
        let before = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(TicketingError::NotFound(Resource::Booking))?;
        let after = self
            .store
            .apply_override(booking_id, &change)
            .await?
            .ok_or(TicketingError::NotFound(Resource::Booking))?;

        warn!(
            target: "audit",
            %booking_id,
            actor = %actor.user_id,
            role = %actor.role,
            is_used.before = before.is_used,
            is_used.after = after.is_used,
            is_approved.before = before.is_approved,
            is_approved.after = after.is_approved,
            holder_changed = change.holder_snapshot.is_some(),
            event_changed = change.event_snapshot.is_some(),
            "Booking overridden"
        );
        Ok(after)
    }

    async fn discard_artifact(&self, booking: &Booking) {
        if let Err(e) = self.artifacts.remove(&booking.credential_code).await {
            warn!(booking_id = %booking.id, error = %e, "Ticket artifact could not be removed");
        }
    }
}
