use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::error::{ConflictKind, Resource, TicketingError};
use crate::models::Capacity;
use crate::store::{CapacityChange, StoreError, TicketStore};

/// Per-event capacity accounting on top of the store's conditional writes.
#[derive(Clone)]
pub struct CapacityLedger {
    store: Arc<dyn TicketStore>,
}

impl CapacityLedger {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Takes one place. Never succeeds for two callers competing for the
    /// last one.
    pub async fn reserve(&self, event_id: Uuid) -> Result<Capacity, TicketingError> {
        match self.store.reserve_slot(event_id).await? {
            CapacityChange::Applied(capacity) => {
                debug!(%event_id, remaining = capacity.remaining, "Reserved capacity");
                Ok(capacity)
            }
            CapacityChange::EventMissing => Err(TicketingError::NotFound(Resource::Event)),
            _ => Err(TicketingError::Conflict(ConflictKind::NoCapacity)),
        }
    }

    /// Gives one place back. Returns `None` when the event was already at
    /// full capacity and nothing changed.
    pub async fn release(&self, event_id: Uuid) -> Result<Option<Capacity>, TicketingError> {
        match self.store.release_slot(event_id).await? {
            CapacityChange::Applied(capacity) => {
                debug!(%event_id, remaining = capacity.remaining, "Released capacity");
                Ok(Some(capacity))
            }
            CapacityChange::EventMissing => Err(TicketingError::NotFound(Resource::Event)),
            _ => {
                warn!(%event_id, "Release ignored, event already at full capacity");
                Ok(None)
            }
        }
    }

    /// Changes the total while keeping the number of places already sold.
    pub async fn resize(&self, event_id: Uuid, new_total: i64) -> Result<Capacity, TicketingError> {
        let new_total = i32::try_from(new_total)
            .ok()
            .filter(|total| *total >= 0)
            .ok_or_else(|| {
                TicketingError::validation("total_capacity", "must be between 0 and 2147483647")
            })?;

        match self.store.resize_capacity(event_id, new_total).await? {
            CapacityChange::Applied(capacity) => {
                debug!(
                    %event_id,
                    total = capacity.total,
                    remaining = capacity.remaining,
                    "Resized capacity"
                );
                Ok(capacity)
            }
            CapacityChange::BelowSold { sold } => Err(TicketingError::validation(
                "total_capacity",
                format!("cannot be lower than the {sold} places already sold"),
            )),
            CapacityChange::EventMissing => Err(TicketingError::NotFound(Resource::Event)),
            other => Err(TicketingError::Storage(StoreError::Unavailable(format!(
                "unexpected resize outcome {other:?}"
            )))),
        }
    }
}
