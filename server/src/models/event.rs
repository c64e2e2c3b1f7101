use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::booking::EventSnapshot;

/// Date format used for the snapshot and the printed ticket.
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub location: String,
    pub description: Option<String>,
    pub total_capacity: i32,
    pub remaining_capacity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn capacity(&self) -> Capacity {
        Capacity {
            total: self.total_capacity,
            remaining: self.remaining_capacity,
        }
    }

    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            name: Some(self.name.clone()),
            date: Some(self.event_date.format(DISPLAY_DATE_FORMAT).to_string()),
            location: Some(self.location.clone()),
        }
    }
}

/// A validated event ready to be stored. Remaining capacity starts at the
/// total.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub event_date: NaiveDate,
    pub location: String,
    pub description: Option<String>,
    pub total_capacity: i32,
}

impl NewEvent {
    pub fn into_event(self) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            name: self.name,
            event_date: self.event_date,
            location: self.location,
            description: self.description,
            total_capacity: self.total_capacity,
            remaining_capacity: self.total_capacity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Capacity counters of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub total: i32,
    pub remaining: i32,
}

impl Capacity {
    pub fn sold(&self) -> i32 {
        self.total - self.remaining
    }
}
