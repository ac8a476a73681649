//! Ticket data model for tix
//!
//! Tickets own their tasks and comments by foreign key only; the aggregated
//! view lives in [`TicketDetail`].

use crate::comment::Comment;
use crate::error::require_text;
use crate::task::Task;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status shared by tickets and tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, Hash)]
pub enum Status {
    #[default]
    Open,
    Closed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Closed => "Closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Status::Open)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Status::Closed)
    }
}

impl std::str::FromStr for Status {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(Status::Open),
            "closed" => Ok(Status::Closed),
            _ => Err(crate::Error::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket priority (a.k.a. severity), ordered from least to most urgent
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Severe,
}

impl Priority {
    /// Fixed ordering, lowest first
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Severe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Severe => "SEVERE",
        }
    }

    /// Position in [`Priority::ALL`]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Service-level window: how long work at this priority may stay open.
    /// Used to derive default task due dates.
    pub fn sla(&self) -> Duration {
        match self {
            Priority::Low => Duration::days(14),
            Priority::Medium => Duration::days(7),
            Priority::High => Duration::hours(48),
            Priority::Severe => Duration::hours(12),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            "SEVERE" => Ok(Priority::Severe),
            _ => Err(crate::Error::InvalidPriority(s.to_string())),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticket row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,

    /// User working the ticket
    pub assignee_id: i64,

    /// User who raised the ticket
    pub requestor_id: i64,

    pub title: String,

    pub description: String,

    pub status: Status,

    pub priority: Priority,

    pub created_at: DateTime<Utc>,

    /// Set if and only if `status` is Closed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} [{}] [{}] {}",
            self.id, self.priority, self.status, self.title
        )
    }
}

/// Input for creating a ticket
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTicket {
    /// Explicit id; assigned by the store when absent
    #[serde(default)]
    pub id: Option<i64>,

    pub assignee_id: i64,

    /// Defaults to the assignee when absent
    #[serde(default)]
    pub requestor_id: Option<i64>,

    pub title: String,

    pub description: String,

    /// Defaults to LOW
    #[serde(default)]
    pub priority: Option<Priority>,

    /// Defaults to now; set by bulk import to preserve history
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewTicket {
    pub fn new(assignee_id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
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

    pub fn with_requestor(mut self, requestor_id: i64) -> Self {
        self.requestor_id = Some(requestor_id);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
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

/// A ticket with a preview of its tasks and comments
#[derive(Debug, Clone, Serialize)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub tasks: Vec<Task>,
    pub comments: Vec<Comment>,
}

#[cfg(test)]
#[path = "ticket_tests.rs"]
mod tests;
