use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::recipe::Phase;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Paused => "Paused",
            SessionStatus::Completed => "Completed",
        }
    }
}

/// The session's position within the two-phase step sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Cursor {
    pub phase: Phase,
    pub index: usize,
}

impl Cursor {
    pub fn new(phase: Phase, index: usize) -> Self {
        Self { phase, index }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CookingSession {
    pub id: String,
    pub recipe_id: String,
    pub cursor: Cursor,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CookingSession {
    pub fn new(recipe_id: String, cursor: Cursor) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recipe_id,
            cursor,
            status: SessionStatus::Active,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}
