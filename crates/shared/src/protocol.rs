use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ClassificationItem, Direction, ItemId, Role};

/// A committed judgment. Immutable once created; `submission_id` is stable
/// across retries of the same commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeResult {
    pub submission_id: Uuid,
    pub item_id: ItemId,
    pub direction: Direction,
    pub committed_at: DateTime<Utc>,
}

impl SwipeResult {
    pub fn new(item_id: ItemId, direction: Direction) -> Self {
        Self {
            submission_id: Uuid::new_v4(),
            item_id,
            direction,
            committed_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextBatchResponse {
    pub items: Vec<ClassificationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub item_id: ItemId,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressResponse {
    pub completed: u64,
    pub remaining: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub role: Role,
}
