//! Roles and the operations each of them may perform.
//!
//! The caller's identity is resolved once at the request boundary and passed
//! into the core as an [`Actor`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::TicketingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Organizer,
    Attendee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Attendee => "attendee",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "organizer" => Ok(Role::Organizer),
            "attendee" => Ok(Role::Attendee),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    BookTicket,
    ViewOwnBooking,
    Redeem,
    CancelBooking,
    OverrideBooking,
    CreateEvent,
    DeleteEvent,
    ResizeEvent,
    ReleaseHolderBookings,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::BookTicket => "book tickets",
            Operation::ViewOwnBooking => "view bookings",
            Operation::Redeem => "redeem tickets",
            Operation::CancelBooking => "cancel bookings",
            Operation::OverrideBooking => "override bookings",
            Operation::CreateEvent => "create events",
            Operation::DeleteEvent => "delete events",
            Operation::ResizeEvent => "resize events",
            Operation::ReleaseHolderBookings => "release a user's bookings",
        })
    }
}

pub fn can_perform(role: Role, operation: Operation) -> bool {
    match operation {
        Operation::BookTicket | Operation::ViewOwnBooking => role == Role::Attendee,
        Operation::Redeem
        | Operation::CancelBooking
        | Operation::OverrideBooking
        | Operation::CreateEvent
        | Operation::DeleteEvent
        | Operation::ResizeEvent => matches!(role, Role::Admin | Role::Organizer),
        Operation::ReleaseHolderBookings => role == Role::Admin,
    }
}

/// The authenticated caller of a core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn authorize(&self, operation: Operation) -> Result<(), TicketingError> {
        if can_perform(self.role, operation) {
            Ok(())
        } else {
            Err(TicketingError::Forbidden {
                role: self.role,
                operation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendees_book_and_staff_redeem() {
        assert!(can_perform(Role::Attendee, Operation::BookTicket));
        assert!(can_perform(Role::Attendee, Operation::ViewOwnBooking));
        assert!(!can_perform(Role::Attendee, Operation::Redeem));
        assert!(!can_perform(Role::Attendee, Operation::CancelBooking));

        for staff in [Role::Admin, Role::Organizer] {
            assert!(can_perform(staff, Operation::Redeem));
            assert!(can_perform(staff, Operation::ResizeEvent));
            assert!(can_perform(staff, Operation::OverrideBooking));
            assert!(!can_perform(staff, Operation::BookTicket));
        }
    }

    #[test]
    fn test_only_admins_release_a_users_bookings() {
        assert!(can_perform(Role::Admin, Operation::ReleaseHolderBookings));
        assert!(!can_perform(Role::Organizer, Operation::ReleaseHolderBookings));
        assert!(!can_perform(Role::Attendee, Operation::ReleaseHolderBookings));
    }

    #[test]
    fn test_role_parsing_is_case_insensitive() {
        assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" organizer ".parse::<Role>(), Ok(Role::Organizer));
        assert_eq!(
            "superuser".parse::<Role>(),
            Err(UnknownRole("superuser".to_string()))
        );
    }

    #[test]
    fn test_authorize_reports_role_and_operation() {
        let actor = Actor::new(Uuid::new_v4(), Role::Attendee);
        let err = actor.authorize(Operation::DeleteEvent).unwrap_err();
        assert_eq!(err.to_string(), "role attendee may not delete events");
    }
}
