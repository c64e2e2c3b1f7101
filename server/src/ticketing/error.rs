use std::fmt;

use thiserror::Error;

use super::access::{Operation, Role};
use super::artifact::ArtifactError;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Event,
    User,
    Booking,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Event => "event",
            Resource::User => "user",
            Resource::Booking => "booking",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// The user already holds a booking for the event.
    Duplicate,
    NoCapacity,
    /// Credential generation kept colliding with issued codes.
    CredentialCollision,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::Duplicate => "duplicate_booking",
            ConflictKind::NoCapacity => "no_capacity",
            ConflictKind::CredentialCollision => "credential_collision",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::Duplicate => "a booking already exists for this user and event",
            ConflictKind::NoCapacity => "the event has no remaining capacity",
            ConflictKind::CredentialCollision => "could not issue a unique credential code",
        })
    }
}

#[derive(Debug, Error)]
pub enum TicketingError {
    #[error("{0} not found")]
    NotFound(Resource),

    #[error("{0}")]
    Conflict(ConflictKind),

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("role {role} may not {operation}")]
    Forbidden { role: Role, operation: Operation },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl TicketingError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        TicketingError::Validation {
            field,
            message: message.into(),
        }
    }
}
