//! Composed ticket views
//!
//! [`TicketFilter`] selects rows in SQL; the user and severity views add an
//! optional status filter on top of the fetched rows.

use chrono::{DateTime, Duration, Utc};
use rusqlite::types::Value;
use tracing::debug;

use crate::Result;
use crate::db::{Database, fetch_comments, fetch_tasks, fetch_ticket, format_timestamp};
use crate::error::Error;
use crate::ticket::{Priority, Status, Ticket, TicketDetail};

/// Number of tasks and comments included in a ticket detail view
pub const DETAIL_PREVIEW_LIMIT: usize = 5;

/// Default number of entries in the recent-comments views
pub const RECENT_COMMENTS_LIMIT: usize = 10;

/// Row selection for [`Database::list_tickets`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TicketFilter {
    #[default]
    All,
    Status(Status),
    Assignee(i64),
    Severity(Priority),
    /// Created strictly after `now - days`
    CreatedWithinDays(u32),
    /// Created at or before `now - days`
    CreatedBeforeDays(u32),
    /// Case-insensitive substring of the title or the description
    Search(String),
}

impl TicketFilter {
    /// Build a ` WHERE ...` clause (empty for [`TicketFilter::All`]) and its
    /// positional parameters.
    pub(crate) fn sql_condition(&self, now: DateTime<Utc>) -> (String, Vec<Value>) {
        match self {
            TicketFilter::All => (String::new(), Vec::new()),
            TicketFilter::Status(status) => (
                " WHERE status = ?1".to_string(),
                vec![Value::Text(status.as_str().to_string())],
            ),
            TicketFilter::Assignee(user_id) => (
                " WHERE assignee_id = ?1".to_string(),
                vec![Value::Integer(*user_id)],
            ),
            TicketFilter::Severity(priority) => (
                " WHERE priority = ?1".to_string(),
                vec![Value::Text(priority.as_str().to_string())],
            ),
            TicketFilter::CreatedWithinDays(days) => (
                " WHERE created_at > ?1".to_string(),
                vec![Value::Text(cutoff(now, *days))],
            ),
            TicketFilter::CreatedBeforeDays(days) => (
                " WHERE created_at <= ?1".to_string(),
                vec![Value::Text(cutoff(now, *days))],
            ),
            TicketFilter::Search(text) => (
                " WHERE instr(fold_case(title), ?1) > 0 OR instr(fold_case(description), ?1) > 0"
                    .to_string(),
                vec![Value::Text(text.to_lowercase())],
            ),
        }
    }
}

/// `now - days`, clamped to the earliest representable instant when the
/// subtraction overflows.
fn cutoff(now: DateTime<Utc>, days: u32) -> String {
    let at = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    format_timestamp(&at)
}

/// Parse a severity argument.
///
/// Named values (`LOW`, `MEDIUM`, `HIGH`, `SEVERE`, any case) are always
/// accepted. A numeric index into that ordering is a legacy form and only
/// honoured when `allow_index` is set.
pub fn parse_severity(input: &str, allow_index: bool) -> Result<Priority> {
    match input.parse::<Priority>() {
        Ok(priority) => Ok(priority),
        Err(err) if allow_index => input
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(Priority::from_index)
            .ok_or(err),
        Err(err) => Err(err),
    }
}

/// Keep the tickets whose status equals `status`, compared case-insensitively.
///
/// A value that is neither Open nor Closed is rejected with a validation
/// error rather than silently yielding an empty list.
fn retain_status(mut tickets: Vec<Ticket>, status: Option<&str>) -> Result<Vec<Ticket>> {
    if let Some(status) = status {
        let status: Status = status.parse()?;
        tickets.retain(|t| t.status == status);
    }
    Ok(tickets)
}

impl Database {
    /// Tickets assigned to `user_id`, optionally narrowed to one status.
    pub fn tickets_for_user(&self, user_id: i64, status: Option<&str>) -> Result<Vec<Ticket>> {
        let tickets = retain_status(
            self.list_tickets(&TicketFilter::Assignee(user_id))?,
            status,
        )?;
        debug!(user_id, count = tickets.len(), "tickets for user");
        Ok(tickets)
    }

    /// Tickets at `severity`, optionally narrowed to one status.
    pub fn tickets_by_severity(
        &self,
        severity: Priority,
        status: Option<&str>,
    ) -> Result<Vec<Ticket>> {
        let tickets = retain_status(
            self.list_tickets(&TicketFilter::Severity(severity))?,
            status,
        )?;
        debug!(%severity, count = tickets.len(), "tickets by severity");
        Ok(tickets)
    }

    /// Free-text search over title and description.
    pub fn search_tickets(&self, text: &str) -> Result<Vec<Ticket>> {
        if text.trim().is_empty() {
            return Err(Error::Validation("search text must not be empty".into()));
        }
        self.list_tickets(&TicketFilter::Search(text.to_string()))
    }

    /// A ticket with its first [`DETAIL_PREVIEW_LIMIT`] tasks and comments.
    pub fn ticket_detail(&self, ticket_id: i64) -> Result<TicketDetail> {
        self.ticket_detail_with_limit(ticket_id, DETAIL_PREVIEW_LIMIT)
    }

    /// A ticket with its first `limit` tasks and first `limit` comments.
    /// Longer collections are truncated.
    pub fn ticket_detail_with_limit(&self, ticket_id: i64, limit: usize) -> Result<TicketDetail> {
        let ticket = fetch_ticket(&self.conn, ticket_id)?;
        let tasks = fetch_tasks(&self.conn, ticket_id, Some(limit))?;
        let comments = fetch_comments(&self.conn, ticket_id, Some(limit))?;
        Ok(TicketDetail {
            ticket,
            tasks,
            comments,
        })
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
