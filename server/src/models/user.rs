use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::booking::HolderSnapshot;

/// A registered account. Owned by the registration flow; the ticketing core
/// only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub full_name: Option<String>,
    pub student_id: Option<String>,
    pub student_class: Option<String>,
    pub faculty: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            full_name: None,
            student_id: None,
            student_class: None,
            faculty: None,
            email: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn holder_snapshot(&self) -> HolderSnapshot {
        HolderSnapshot {
            full_name: self.full_name.clone(),
            student_id: self.student_id.clone(),
            student_class: self.student_class.clone(),
            faculty: self.faculty.clone(),
            email: self.email.clone(),
        }
    }
}
