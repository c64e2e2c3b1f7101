use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Holder details captured when the booking was made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderSnapshot {
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub student_class: Option<String>,
    pub faculty: Option<String>,
    pub email: Option<String>,
}

/// Event details captured when the booking was made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub name: Option<String>,
    pub date: Option<String>,
    pub location: Option<String>,
}

/// One issued ticket.
///
/// `credential_code` and both snapshots never change after creation, except
/// through an audited administrative override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub credential_code: String,
    pub created_at: DateTime<Utc>,
    pub is_approved: bool,
    pub is_used: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub holder_snapshot: HolderSnapshot,
    pub event_snapshot: EventSnapshot,
}

impl Booking {
    pub fn display_fields(&self) -> DisplayFields {
        DisplayFields {
            credential_code: self.credential_code.clone(),
            holder: self.holder_snapshot.clone(),
            event_name: self.event_snapshot.name.clone(),
            event_date: self.event_snapshot.date.clone(),
        }
    }
}

/// A booking as handed to the store for insertion.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub credential_code: String,
    pub holder_snapshot: HolderSnapshot,
    pub event_snapshot: EventSnapshot,
}

impl NewBooking {
    pub fn into_booking(self) -> Booking {
        Booking {
            id: self.id,
            user_id: self.user_id,
            event_id: self.event_id,
            credential_code: self.credential_code,
            created_at: Utc::now(),
            is_approved: true,
            is_used: false,
            redeemed_at: None,
            holder_snapshot: self.holder_snapshot,
            event_snapshot: self.event_snapshot,
        }
    }
}

/// Administrative changes to a booking. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingOverride {
    pub is_used: Option<bool>,
    pub is_approved: Option<bool>,
    pub holder_snapshot: Option<HolderSnapshot>,
    pub event_snapshot: Option<EventSnapshot>,
}

impl BookingOverride {
    pub fn is_empty(&self) -> bool {
        self.is_used.is_none()
            && self.is_approved.is_none()
            && self.holder_snapshot.is_none()
            && self.event_snapshot.is_none()
    }

    /// Applies the override in place. Clearing `is_used` also clears the
    /// redemption timestamp.
    pub fn apply_to(&self, booking: &mut Booking, now: DateTime<Utc>) {
        if let Some(is_used) = self.is_used {
            booking.redeemed_at = match (is_used, booking.redeemed_at) {
                (true, Some(at)) => Some(at),
                (true, None) => Some(now),
                (false, _) => None,
            };
            booking.is_used = is_used;
        }
        if let Some(is_approved) = self.is_approved {
            booking.is_approved = is_approved;
        }
        if let Some(holder) = &self.holder_snapshot {
            booking.holder_snapshot = holder.clone();
        }
        if let Some(event) = &self.event_snapshot {
            booking.event_snapshot = event.clone();
        }
    }
}

/// What gate staff see after a scan. Built from the snapshots, never from
/// live records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFields {
    pub credential_code: String,
    pub holder: HolderSnapshot,
    pub event_name: Option<String>,
    pub event_date: Option<String>,
}
