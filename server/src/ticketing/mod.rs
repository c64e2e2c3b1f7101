//! Booking and redemption core.
//!
//! [`TicketingService`] is the only entry point request handlers use. Each
//! operation takes the acting caller explicitly; authorization has already
//! been decided by the caller through [`access::Actor::authorize`].

use std::sync::Arc;

pub mod access;
mod admin;
pub mod artifact;
pub mod booking;
mod compensation;
pub mod credential;
pub mod error;
pub mod ledger;
pub mod redemption;

pub use access::{can_perform, Actor, Operation, Role};
pub use admin::EventDraft;
pub use artifact::{
    ArtifactError, ArtifactRenderer, ArtifactStore, FsArtifactStore, MemoryArtifactStore,
};
pub use booking::{ArtifactStatus, BookingReceipt, BookingStage};
pub use error::{ConflictKind, Resource, TicketingError};
pub use ledger::CapacityLedger;
pub use redemption::{InvalidReason, RedemptionResult, RedemptionStatus};

use crate::store::TicketStore;

#[derive(Clone)]
pub struct TicketingService {
    store: Arc<dyn TicketStore>,
    artifacts: Arc<dyn ArtifactStore>,
    renderer: Arc<ArtifactRenderer>,
    ledger: CapacityLedger,
}

impl TicketingService {
    pub fn new(
        store: Arc<dyn TicketStore>,
        artifacts: Arc<dyn ArtifactStore>,
        renderer: ArtifactRenderer,
    ) -> Self {
        Self {
            ledger: CapacityLedger::new(store.clone()),
            store,
            artifacts,
            renderer: Arc::new(renderer),
        }
    }

    pub fn store(&self) -> &Arc<dyn TicketStore> {
        &self.store
    }

    pub fn ledger(&self) -> &CapacityLedger {
        &self.ledger
    }
}
