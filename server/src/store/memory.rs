use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{CapacityChange, StoreError, StoreResult, TicketStore};
use crate::models::{Booking, BookingOverride, Capacity, Event, NewBooking, User};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    bookings: HashMap<Uuid, Booking>,
    issued_codes: HashSet<String>,
}

impl State {
    /// The rules the database enforces through its foreign key and the
    /// (user, event) uniqueness constraint.
    fn check_insertable(&self, user_id: Uuid, event_id: Uuid) -> StoreResult<()> {
        if !self.events.contains_key(&event_id) {
            return Err(StoreError::MissingEvent);
        }
        let duplicate = self
            .bookings
            .values()
            .any(|existing| existing.user_id == user_id && existing.event_id == event_id);
        if duplicate {
            return Err(StoreError::DuplicateBooking);
        }
        Ok(())
    }
}

/// In-memory store for tests and local runs.
///
/// All state sits behind one mutex, so each method is a single critical
/// section and the conditional writes are atomic.
#[derive(Default)]
pub struct MemoryTicketStore {
    state: Mutex<State>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user. Registration itself lives outside the ticketing core.
    pub fn insert_user(&self, user: User) -> StoreResult<()> {
        self.state()?.users.insert(user.id, user);
        Ok(())
    }

    pub fn booking_count(&self) -> usize {
        self.state().map(|state| state.bookings.len()).unwrap_or(0)
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state()?.users.get(&user_id).cloned())
    }

    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.state()?.events.get(&event_id).cloned())
    }

    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        self.state()?.events.insert(event.id, event.clone());
        Ok(())
    }

    async fn delete_event(&self, event_id: Uuid) -> StoreResult<Option<Vec<Booking>>> {
        let mut state = self.state()?;
        if state.events.remove(&event_id).is_none() {
            return Ok(None);
        }
        let ids: Vec<Uuid> = state
            .bookings
            .values()
            .filter(|booking| booking.event_id == event_id)
            .map(|booking| booking.id)
            .collect();
        let removed = ids
            .iter()
            .filter_map(|id| state.bookings.remove(id))
            .collect();
        Ok(Some(removed))
    }

    async fn reserve_slot(&self, event_id: Uuid) -> StoreResult<CapacityChange> {
        let mut state = self.state()?;
        let Some(event) = state.events.get_mut(&event_id) else {
            return Ok(CapacityChange::EventMissing);
        };
        if event.remaining_capacity <= 0 {
            return Ok(CapacityChange::Exhausted);
        }
        event.remaining_capacity -= 1;
        event.updated_at = Utc::now();
        Ok(CapacityChange::Applied(event.capacity()))
    }

    async fn release_slot(&self, event_id: Uuid) -> StoreResult<CapacityChange> {
        let mut state = self.state()?;
        let Some(event) = state.events.get_mut(&event_id) else {
            return Ok(CapacityChange::EventMissing);
        };
        if event.remaining_capacity >= event.total_capacity {
            return Ok(CapacityChange::AtTotal);
        }
        event.remaining_capacity += 1;
        event.updated_at = Utc::now();
        Ok(CapacityChange::Applied(event.capacity()))
    }

    async fn resize_capacity(&self, event_id: Uuid, new_total: i32) -> StoreResult<CapacityChange> {
        let mut state = self.state()?;
        let Some(event) = state.events.get_mut(&event_id) else {
            return Ok(CapacityChange::EventMissing);
        };
        let sold = event.capacity().sold();
        if new_total < sold {
            return Ok(CapacityChange::BelowSold { sold });
        }
        event.total_capacity = new_total;
        event.remaining_capacity = new_total - sold;
        event.updated_at = Utc::now();
        Ok(CapacityChange::Applied(Capacity {
            total: event.total_capacity,
            remaining: event.remaining_capacity,
        }))
    }

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state()?.bookings.get(&booking_id).cloned())
    }

    async fn find_booking_by_code(&self, code: &str) -> StoreResult<Option<Booking>> {
        Ok(self
            .state()?
            .bookings
            .values()
            .find(|booking| booking.credential_code == code)
            .cloned())
    }

    async fn find_booking_for_holder(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>> {
        Ok(self
            .state()?
            .bookings
            .values()
            .find(|booking| booking.user_id == user_id && booking.event_id == event_id)
            .cloned())
    }

    async fn find_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .state()?
            .bookings
            .values()
            .filter(|booking| booking.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|booking| booking.created_at);
        Ok(bookings)
    }

    async fn find_redeemable(
        &self,
        code: &str,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>> {
        Ok(self
            .state()?
            .bookings
            .values()
            .find(|booking| {
                booking.credential_code == code
                    && booking.user_id == user_id
                    && booking.event_id == event_id
            })
            .cloned())
    }

    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<Booking> {
        let mut state = self.state()?;
        if state.issued_codes.contains(&booking.credential_code) {
            return Err(StoreError::CredentialTaken(booking.credential_code));
        }
        state.check_insertable(booking.user_id, booking.event_id)?;

        let booking = booking.into_booking();
        state.issued_codes.insert(booking.credential_code.clone());
        state.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn restore_booking(&self, booking: &Booking) -> StoreResult<()> {
        let mut state = self.state()?;
        state.check_insertable(booking.user_id, booking.event_id)?;

        state.issued_codes.insert(booking.credential_code.clone());
        state.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn delete_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state()?.bookings.remove(&booking_id))
    }

    async fn mark_used(&self, booking_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut state = self.state()?;
        match state.bookings.get_mut(&booking_id) {
            Some(booking) if !booking.is_used => {
                booking.is_used = true;
                booking.redeemed_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn apply_override(
        &self,
        booking_id: Uuid,
        change: &BookingOverride,
    ) -> StoreResult<Option<Booking>> {
        let mut state = self.state()?;
        let Some(booking) = state.bookings.get_mut(&booking_id) else {
            return Ok(None);
        };
        change.apply_to(booking, Utc::now());
        Ok(Some(booking.clone()))
    }
}
