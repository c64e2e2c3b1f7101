//! Durable storage for events, bookings and the registry of issued
//! credential codes.
//!
//! Every method that changes capacity or the used flag is a single
//! conditional write. Implementations must never split those into a read
//! followed by a separate write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Booking, BookingOverride, Capacity, Event, NewBooking, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryTicketStore;
pub use postgres::PgTicketStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The (user, event) pair already holds a booking.
    #[error("a booking already exists for this user and event")]
    DuplicateBooking,

    /// The credential code was issued before, possibly to a deleted booking.
    #[error("credential code {0} has already been issued")]
    CredentialTaken(String),

    /// The booking names an event that no longer exists.
    #[error("the event of this booking no longer exists")]
    MissingEvent,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a conditional capacity write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityChange {
    Applied(Capacity),
    /// Reserve found no remaining capacity.
    Exhausted,
    /// Release found the event already at full capacity.
    AtTotal,
    /// Resize asked for fewer places than were already sold.
    BelowSold { sold: i32 },
    EventMissing,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;

    async fn find_event(&self, event_id: Uuid) -> StoreResult<Option<Event>>;

    async fn insert_event(&self, event: &Event) -> StoreResult<()>;

    /// Deletes the event together with all of its bookings in one unit.
    /// Returns the removed bookings, or `None` if the event did not exist.
    async fn delete_event(&self, event_id: Uuid) -> StoreResult<Option<Vec<Booking>>>;

    /// Decrements remaining capacity by one if it is positive.
    async fn reserve_slot(&self, event_id: Uuid) -> StoreResult<CapacityChange>;

    /// Increments remaining capacity by one if it is below the total.
    async fn release_slot(&self, event_id: Uuid) -> StoreResult<CapacityChange>;

    /// Sets a new total and recomputes remaining so the sold count holds.
    async fn resize_capacity(&self, event_id: Uuid, new_total: i32) -> StoreResult<CapacityChange>;

    async fn find_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    async fn find_booking_by_code(&self, code: &str) -> StoreResult<Option<Booking>>;

    async fn find_booking_for_holder(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>>;

    /// Every booking held by the user, across all events.
    async fn find_bookings_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// Finds the booking whose code, holder and event all match.
    async fn find_redeemable(
        &self,
        code: &str,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>>;

    /// Records the code as issued and inserts the booking.
    ///
    /// Fails with [`StoreError::DuplicateBooking`] or
    /// [`StoreError::CredentialTaken`] on the respective uniqueness rule, and
    /// with [`StoreError::MissingEvent`] if the event was deleted meanwhile.
    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<Booking>;

    /// Puts a previously deleted booking back unchanged. Its code is already
    /// in the issued registry. Fails with [`StoreError::DuplicateBooking`] if
    /// the holder booked the event again in the meantime.
    async fn restore_booking(&self, booking: &Booking) -> StoreResult<()>;

    async fn delete_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>>;

    /// Sets `is_used` if it is unset. Returns `false` when the booking was
    /// already used or does not exist.
    async fn mark_used(&self, booking_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    async fn apply_override(
        &self,
        booking_id: Uuid,
        change: &BookingOverride,
    ) -> StoreResult<Option<Booking>>;
}
