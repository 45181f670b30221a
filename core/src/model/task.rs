use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row key assigned by the backing store on insert.
/// Never minted locally and never reused, so it is safe to match
/// optimistic rows against feed events by this alone.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub important: bool,

    // Assigned by the store alongside the id; list order is ascending
    // created_at, so we never reorder locally.
    pub created_at: DateTime<Utc>,

    pub image_url: Option<String>,
}

/// What the client sends on insert. Id and created_at come back
/// from the store with the created row.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub text: String,
    pub image_url: Option<String>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }

    pub fn with_image(text: impl Into<String>, image_url: String) -> Self {
        Self {
            text: text.into(),
            image_url: Some(image_url),
        }
    }
}
