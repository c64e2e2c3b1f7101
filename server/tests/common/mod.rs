#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use ticket_server::models::{Capacity, Event, User};
use ticket_server::store::{MemoryTicketStore, TicketStore};
use ticket_server::ticketing::{
    Actor, ArtifactRenderer, EventDraft, MemoryArtifactStore, Role, TicketingService,
};

pub struct Harness {
    pub store: Arc<MemoryTicketStore>,
    pub artifacts: Arc<MemoryArtifactStore>,
    pub service: TicketingService,
    pub admin: Actor,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryTicketStore::new());
        let artifacts = Arc::new(MemoryArtifactStore::new());
        let service =
            TicketingService::new(store.clone(), artifacts.clone(), ArtifactRenderer::new());
        Self {
            store,
            artifacts,
            service,
            admin: Actor::new(Uuid::new_v4(), Role::Admin),
        }
    }

    /// Registers a user and returns them acting as an attendee.
    pub fn attendee(&self, name: &str) -> Actor {
        let user = User::new(name.to_lowercase().replace(' ', ".")).with_full_name(name);
        let id = user.id;
        self.store.insert_user(user).unwrap();
        Actor::new(id, Role::Attendee)
    }

    pub async fn event(&self, name: &str, capacity: i64) -> Event {
        self.service
            .create_event(
                &self.admin,
                EventDraft {
                    name: name.to_string(),
                    event_date: "2026-11-20".to_string(),
                    location: "Main Hall".to_string(),
                    description: None,
                    total_capacity: capacity,
                },
            )
            .await
            .unwrap()
    }

    pub async fn capacity(&self, event_id: Uuid) -> Capacity {
        self.store.find_event(event_id).await.unwrap().unwrap().capacity()
    }
}
