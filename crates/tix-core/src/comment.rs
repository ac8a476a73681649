//! Comment data model

use crate::error::require_text;
use crate::ticket::{Priority, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A free-text annotation on a ticket.
///
/// `created_at` is refreshed when the body is edited, so an edited comment
/// sorts as the newest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub ticket_id: i64,
    pub author_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a comment
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewComment {
    pub ticket_id: i64,
    pub author_id: i64,
    pub body: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewComment {
    pub fn new(ticket_id: i64, author_id: i64, body: impl Into<String>) -> Self {
        Self {
            ticket_id,
            author_id,
            body: body.into(),
            created_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn validate(&self) -> crate::Result<()> {
        require_text(&self.body, "body")
    }
}

/// A comment joined with the ticket it belongs to and that ticket's assignee
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentWithTicket {
    #[serde(flatten)]
    pub comment: Comment,
    pub ticket_title: String,
    pub ticket_description: String,
    pub ticket_status: Status,
    pub ticket_priority: Priority,
    pub ticket_created_at: DateTime<Utc>,
    pub assignee_name: String,
}
