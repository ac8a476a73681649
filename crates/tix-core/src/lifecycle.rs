//! Ticket lifecycle rules
//!
//! A ticket moves from Open to Closed exactly once. The move is allowed only
//! when the ticket has at least one comment and no open tasks. The guard is
//! evaluated and the status written inside one `IMMEDIATE` transaction, so a
//! task or comment written by another connection cannot land between the
//! check and the update.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{info, warn};

use crate::Result;
use crate::db::{Database, fetch_ticket, format_timestamp, now};
use crate::error::Error;
use crate::ticket::{Status, Ticket};

/// Why a ticket could not be closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "open_tasks")]
pub enum ClosureBlocked {
    AlreadyClosed,
    NoComments,
    OpenTasks(u32),
    NoCommentsAndOpenTasks(u32),
}

fn open_tasks_phrase(count: u32) -> String {
    if count == 1 {
        "1 open task remains".to_string()
    } else {
        format!("{count} open tasks remain")
    }
}

impl std::fmt::Display for ClosureBlocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClosureBlocked::AlreadyClosed => write!(f, "ticket is already closed"),
            ClosureBlocked::NoComments => write!(f, "ticket has no comments"),
            ClosureBlocked::OpenTasks(n) => write!(f, "{}", open_tasks_phrase(*n)),
            ClosureBlocked::NoCommentsAndOpenTasks(n) => {
                write!(f, "ticket has no comments and {}", open_tasks_phrase(*n))
            }
        }
    }
}

/// Snapshot of the facts the closure guard looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureCheck {
    pub ticket_id: i64,
    pub status: Status,
    pub comment_count: u32,
    pub open_task_count: u32,
}

impl ClosureCheck {
    /// Gather the guard inputs for one ticket.
    pub(crate) fn load(conn: &Connection, ticket_id: i64) -> Result<Self> {
        let ticket = fetch_ticket(conn, ticket_id)?;
        let (comment_count, open_task_count): (u32, u32) = conn.query_row(
            "SELECT
                 (SELECT COUNT(*) FROM comments WHERE ticket_id = ?1),
                 (SELECT COUNT(*) FROM tasks WHERE ticket_id = ?1 AND status != ?2)",
            params![ticket_id, Status::Closed.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(Self {
            ticket_id,
            status: ticket.status,
            comment_count,
            open_task_count,
        })
    }

    /// `Ok` when the ticket may move to Closed.
    pub fn evaluate(&self) -> std::result::Result<(), ClosureBlocked> {
        if self.status.is_closed() {
            return Err(ClosureBlocked::AlreadyClosed);
        }
        match (self.comment_count, self.open_task_count) {
            (0, 0) => Err(ClosureBlocked::NoComments),
            (0, n) => Err(ClosureBlocked::NoCommentsAndOpenTasks(n)),
            (_, 0) => Ok(()),
            (_, n) => Err(ClosureBlocked::OpenTasks(n)),
        }
    }

    pub fn can_close(&self) -> bool {
        self.evaluate().is_ok()
    }
}

impl Database {
    /// Read-only preview of the closure guard for a ticket.
    pub fn closure_check(&self, ticket_id: i64) -> Result<ClosureCheck> {
        ClosureCheck::load(&self.conn, ticket_id)
    }

    /// Close a ticket now, if the closure guard allows it.
    pub fn close_ticket(&mut self, ticket_id: i64) -> Result<Ticket> {
        self.close_ticket_at(ticket_id, now())
    }

    /// Close a ticket with an explicit closure timestamp, if the closure guard
    /// allows it. On failure the ticket is left untouched.
    pub fn close_ticket_at(&mut self, ticket_id: i64, closed_at: DateTime<Utc>) -> Result<Ticket> {
        let tx = self.write_tx()?;
        let check = ClosureCheck::load(&tx, ticket_id)?;

        if let Err(reason) = check.evaluate() {
            warn!(ticket_id, %reason, "ticket closure rejected");
            return Err(Error::PreconditionFailed { ticket_id, reason });
        }

        tx.execute(
            "UPDATE tickets SET status = ?1, closed_at = ?2 WHERE id = ?3",
            params![
                Status::Closed.as_str(),
                format_timestamp(&closed_at),
                ticket_id
            ],
        )?;
        let ticket = fetch_ticket(&tx, ticket_id)?;
        tx.commit()?;

        info!(
            ticket_id,
            comments = check.comment_count,
            "closed ticket"
        );
        Ok(ticket)
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
