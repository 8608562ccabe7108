//! Action queue task types.

use serde::Serialize;

/// What kind of action a task suggests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Nudge a lead the user never followed up with.
    Followup,
    /// Review an AI-generated draft before it goes anywhere.
    Review,
    /// Send a hand-written draft that is still sitting in the outbox.
    Send,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Followup => write!(f, "followup"),
            Self::Review => write!(f, "review"),
            Self::Send => write!(f, "send"),
        }
    }
}

/// Task urgency. Ordering for the final sort comes from [`rank`].
///
/// [`rank`]: TaskPriority::rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

impl TaskPriority {
    /// Sort key: lower ranks first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

/// One entry in the action queue. Constructed fresh on every request and
/// never stored.
#[derive(Debug, Clone, Serialize)]
pub struct ActionTask {
    /// Synthetic id: `"<kind>-<sourceId>"`.
    pub id: String,
    pub kind: TaskKind,
    pub title: String,
    pub description: String,
    pub lead_id: Option<String>,
    pub message_id: Option<String>,
    pub priority: TaskPriority,
}

impl ActionTask {
    pub fn new(kind: TaskKind, source_id: &str, title: &str, description: &str) -> Self {
        Self {
            id: format!("{kind}-{source_id}"),
            kind,
            title: title.to_string(),
            description: description.to_string(),
            lead_id: None,
            message_id: None,
            priority: TaskPriority::Medium,
        }
    }

    pub fn with_lead(mut self, lead_id: Option<String>) -> Self {
        self.lead_id = lead_id;
        self
    }

    pub fn with_message(mut self, message_id: &str) -> Self {
        self.message_id = Some(message_id.to_string());
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }
}
