//! Task data model: independently closable sub-units of a ticket

use crate::error::require_text;
use crate::ticket::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A task row. Ids are unique across all tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub ticket_id: i64,
    pub assignee_id: i64,
    pub title: String,
    pub description: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_at < now
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    #[serde(default)]
    pub id: Option<i64>,
    pub ticket_id: i64,
    pub assignee_id: i64,
    pub title: String,
    pub description: String,
    /// Defaults to creation time plus the parent ticket's SLA window
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(
        ticket_id: i64,
        assignee_id: i64,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            ticket_id,
            assignee_id,
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_due_at(mut self, due_at: DateTime<Utc>) -> Self {
        self.due_at = Some(due_at);
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        require_text(&self.title, "title")?;
        require_text(&self.description, "description")
    }
}
