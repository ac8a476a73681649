//! SQLite-backed data access layer
//!
//! [`Database`] wraps a single connection. Reads borrow it shared; writes
//! borrow it mutably and run inside an `IMMEDIATE` transaction so the
//! existence checks they make cannot go stale before the row is written.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{
    Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params, params_from_iter,
};
use std::path::Path;
use tracing::{debug, info};

use crate::Result;
use crate::comment::{Comment, CommentWithTicket, NewComment};
use crate::error::{Entity, Error, require_text};
use crate::query::TicketFilter;
use crate::schema;
use crate::task::{NewTask, Task};
use crate::ticket::{NewTicket, Status, Ticket};
use crate::user::{NewUser, User, UserUpdate};

const TICKET_COLUMNS: &str =
    "id, assignee_id, requestor_id, title, description, status, priority, created_at, closed_at";
const TASK_COLUMNS: &str =
    "id, ticket_id, assignee_id, title, description, status, created_at, due_at, closed_at";
const COMMENT_COLUMNS: &str = "id, ticket_id, author_id, body, created_at";

/// Current time, truncated to the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Render a timestamp in the fixed-width form used by every timestamp column.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

/// Parse a text column through the type's `FromStr`.
fn parse_column<T>(row: &Row<'_>, column: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = Error>,
{
    let value: String = row.get(column)?;
    value.parse().map_err(|e| conversion_error(column, e))
}

fn timestamp_column(row: &Row<'_>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn optional_timestamp_column(
    row: &Row<'_>,
    column: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(column)?;
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| conversion_error(column, e))
        })
        .transpose()
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    Ok(Ticket {
        id: row.get(0)?,
        assignee_id: row.get(1)?,
        requestor_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: parse_column(row, 5)?,
        priority: parse_column(row, 6)?,
        created_at: timestamp_column(row, 7)?,
        closed_at: optional_timestamp_column(row, 8)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        assignee_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: parse_column(row, 5)?,
        created_at: timestamp_column(row, 6)?,
        due_at: timestamp_column(row, 7)?,
        closed_at: optional_timestamp_column(row, 8)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        author_id: row.get(2)?,
        body: row.get(3)?,
        created_at: timestamp_column(row, 4)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

fn table_of(entity: Entity) -> &'static str {
    match entity {
        Entity::User => "users",
        Entity::Ticket => "tickets",
        Entity::Task => "tasks",
        Entity::Comment => "comments",
    }
}

/// SQLite's `LIMIT -1` means "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX))
}

pub(crate) fn exists(conn: &Connection, entity: Entity, id: i64) -> Result<bool> {
    let sql = format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
        table_of(entity)
    );
    Ok(conn.query_row(&sql, params![id], |row| row.get(0))?)
}

pub(crate) fn require(conn: &Connection, entity: Entity, id: i64) -> Result<()> {
    if exists(conn, entity, id)? {
        Ok(())
    } else {
        Err(Error::not_found(entity, id))
    }
}

fn reject_duplicate(conn: &Connection, entity: Entity, id: Option<i64>) -> Result<()> {
    if let Some(id) = id
        && exists(conn, entity, id)?
    {
        return Err(Error::Conflict { entity, id });
    }
    Ok(())
}

pub(crate) fn fetch_user(conn: &Connection, id: i64) -> Result<User> {
    conn.query_row(
        "SELECT id, name, email FROM users WHERE id = ?1",
        params![id],
        user_from_row,
    )
    .optional()?
    .ok_or_else(|| Error::not_found(Entity::User, id))
}

pub(crate) fn fetch_ticket(conn: &Connection, id: i64) -> Result<Ticket> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1");
    conn.query_row(&sql, params![id], ticket_from_row)
        .optional()?
        .ok_or_else(|| Error::not_found(Entity::Ticket, id))
}

pub(crate) fn fetch_task(conn: &Connection, id: i64) -> Result<Task> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    conn.query_row(&sql, params![id], task_from_row)
        .optional()?
        .ok_or_else(|| Error::not_found(Entity::Task, id))
}

pub(crate) fn fetch_comment(conn: &Connection, id: i64) -> Result<Comment> {
    let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1");
    conn.query_row(&sql, params![id], comment_from_row)
        .optional()?
        .ok_or_else(|| Error::not_found(Entity::Comment, id))
}

/// Tasks of a ticket in creation order, optionally only the first `limit`.
pub(crate) fn fetch_tasks(
    conn: &Connection,
    ticket_id: i64,
    limit: Option<usize>,
) -> Result<Vec<Task>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE ticket_id = ?1 ORDER BY id LIMIT ?2");
    let mut stmt = conn.prepare(&sql)?;
    let tasks = stmt
        .query_map(params![ticket_id, sql_limit(limit)], task_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tasks)
}

/// Comments of a ticket in creation order, optionally only the first `limit`.
pub(crate) fn fetch_comments(
    conn: &Connection,
    ticket_id: i64,
    limit: Option<usize>,
) -> Result<Vec<Comment>> {
    let sql = format!(
        "SELECT {COMMENT_COLUMNS} FROM comments WHERE ticket_id = ?1 ORDER BY id LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let comments = stmt
        .query_map(params![ticket_id, sql_limit(limit)], comment_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(comments)
}

/// Install `fold_case(text)`, a Unicode-aware lowercase used by the search
/// filter. SQLite's own `lower()` and `LIKE` only fold ASCII.
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

/// SQLite database connection with ticket tracker operations.
pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;",
        )?;
        register_functions(&conn)?;
        schema::create_tables(&conn)?;
        debug!(path = %path.display(), "opened ticket database");
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_functions(&conn)?;
        schema::create_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Begin a write transaction holding the database write lock.
    pub(crate) fn write_tx(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    // Users

    pub fn create_user(&mut self, input: NewUser) -> Result<User> {
        input.validate()?;
        let tx = self.write_tx()?;
        reject_duplicate(&tx, Entity::User, input.id)?;

        tx.execute(
            "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3)",
            params![input.id, input.name, input.email],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(user_id = id, "created user");
        Ok(User {
            id,
            name: input.name,
            email: input.email,
        })
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        fetch_user(&self.conn, id)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    pub fn update_user(&mut self, id: i64, update: UserUpdate) -> Result<User> {
        update.validate()?;
        let tx = self.write_tx()?;
        let affected = tx.execute(
            "UPDATE users SET name = COALESCE(?1, name), email = COALESCE(?2, email)
             WHERE id = ?3",
            params![update.name, update.email, id],
        )?;
        if affected == 0 {
            return Err(Error::not_found(Entity::User, id));
        }
        let user = fetch_user(&tx, id)?;
        tx.commit()?;

        debug!(user_id = id, "updated user");
        Ok(user)
    }

    // Tickets

    /// Create a ticket in the Open state.
    ///
    /// The requestor defaults to the assignee and the priority to LOW. Both
    /// users must exist, and an explicit id must not be taken.
    pub fn create_ticket(&mut self, input: NewTicket) -> Result<Ticket> {
        input.validate()?;
        let requestor_id = input.requestor_id.unwrap_or(input.assignee_id);
        let priority = input.priority.unwrap_or_default();
        let created_at = input.created_at.unwrap_or_else(now);

        let tx = self.write_tx()?;
        require(&tx, Entity::User, input.assignee_id)?;
        require(&tx, Entity::User, requestor_id)?;
        reject_duplicate(&tx, Entity::Ticket, input.id)?;

        tx.execute(
            "INSERT INTO tickets (id, assignee_id, requestor_id, title, description,
             status, priority, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                input.id,
                input.assignee_id,
                requestor_id,
                input.title,
                input.description,
                Status::Open.as_str(),
                priority.as_str(),
                format_timestamp(&created_at),
            ],
        )?;
        let ticket = fetch_ticket(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        info!(ticket_id = ticket.id, %priority, "created ticket");
        Ok(ticket)
    }

    pub fn get_ticket(&self, id: i64) -> Result<Ticket> {
        fetch_ticket(&self.conn, id)
    }

    /// Tickets matching `filter`, ordered by id.
    pub fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        let (condition, values) = filter.sql_condition(now());
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets{condition} ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let tickets = stmt
            .query_map(params_from_iter(values.iter()), ticket_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(?filter, count = tickets.len(), "listed tickets");
        Ok(tickets)
    }

    // Tasks

    /// Create an Open task under an Open ticket.
    ///
    /// Without an explicit due date the task is due one SLA window of the
    /// ticket's priority after its creation.
    pub fn create_task(&mut self, input: NewTask) -> Result<Task> {
        input.validate()?;
        let tx = self.write_tx()?;
        let ticket = fetch_ticket(&tx, input.ticket_id)?;
        require(&tx, Entity::User, input.assignee_id)?;
        reject_duplicate(&tx, Entity::Task, input.id)?;
        if ticket.is_closed() {
            return Err(Error::Validation(format!(
                "ticket {} is closed and cannot take new tasks",
                ticket.id
            )));
        }

        let created_at = input.created_at.unwrap_or_else(now);
        let due_at = input
            .due_at
            .unwrap_or_else(|| created_at + ticket.priority.sla());

        tx.execute(
            "INSERT INTO tasks (id, ticket_id, assignee_id, title, description, status,
             created_at, due_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                input.id,
                input.ticket_id,
                input.assignee_id,
                input.title,
                input.description,
                Status::Open.as_str(),
                format_timestamp(&created_at),
                format_timestamp(&due_at),
            ],
        )?;
        let task = fetch_task(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        debug!(task_id = task.id, ticket_id = task.ticket_id, "created task");
        Ok(task)
    }

    pub fn get_task(&self, id: i64) -> Result<Task> {
        fetch_task(&self.conn, id)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    pub fn tasks_for_ticket(&self, ticket_id: i64) -> Result<Vec<Task>> {
        require(&self.conn, Entity::Ticket, ticket_id)?;
        fetch_tasks(&self.conn, ticket_id, None)
    }

    /// Mark a task Closed at `closed_at`.
    ///
    /// Closing an already closed task overwrites its closure timestamp and is
    /// not an error.
    pub fn close_task(&mut self, id: i64, closed_at: DateTime<Utc>) -> Result<Task> {
        let tx = self.write_tx()?;
        let affected = tx.execute(
            "UPDATE tasks SET status = ?1, closed_at = ?2 WHERE id = ?3",
            params![Status::Closed.as_str(), format_timestamp(&closed_at), id],
        )?;
        if affected == 0 {
            return Err(Error::not_found(Entity::Task, id));
        }
        let task = fetch_task(&tx, id)?;
        tx.commit()?;

        info!(task_id = id, ticket_id = task.ticket_id, "closed task");
        Ok(task)
    }

    // Comments

    pub fn add_comment(&mut self, input: NewComment) -> Result<Comment> {
        input.validate()?;
        let tx = self.write_tx()?;
        require(&tx, Entity::Ticket, input.ticket_id)?;
        require(&tx, Entity::User, input.author_id)?;

        let created_at = input.created_at.unwrap_or_else(now);
        tx.execute(
            "INSERT INTO comments (ticket_id, author_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                input.ticket_id,
                input.author_id,
                input.body,
                format_timestamp(&created_at),
            ],
        )?;
        let comment = fetch_comment(&tx, tx.last_insert_rowid())?;
        tx.commit()?;

        debug!(
            comment_id = comment.id,
            ticket_id = comment.ticket_id,
            "added comment"
        );
        Ok(comment)
    }

    pub fn get_comment(&self, id: i64) -> Result<Comment> {
        fetch_comment(&self.conn, id)
    }

    pub fn comments_for_ticket(&self, ticket_id: i64) -> Result<Vec<Comment>> {
        require(&self.conn, Entity::Ticket, ticket_id)?;
        fetch_comments(&self.conn, ticket_id, None)
    }

    /// Replace a comment's body. The creation timestamp is reset to now, which
    /// moves the comment to the top of the recent-comments views.
    pub fn update_comment(&mut self, id: i64, body: &str) -> Result<Comment> {
        require_text(body, "body")?;
        let tx = self.write_tx()?;
        let affected = tx.execute(
            "UPDATE comments SET body = ?1, created_at = ?2 WHERE id = ?3",
            params![body, format_timestamp(&now()), id],
        )?;
        if affected == 0 {
            return Err(Error::not_found(Entity::Comment, id));
        }
        let comment = fetch_comment(&tx, id)?;
        tx.commit()?;

        debug!(comment_id = id, "updated comment");
        Ok(comment)
    }

    /// Newest comments across all tickets, with ticket context and the
    /// ticket assignee's name.
    pub fn recent_comments_with_ticket(&self, limit: usize) -> Result<Vec<CommentWithTicket>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.ticket_id, c.author_id, c.body, c.created_at,
                    t.title, t.description, t.status, t.priority, t.created_at, u.name
             FROM comments c
             JOIN tickets t ON t.id = c.ticket_id
             JOIN users u ON u.id = t.assignee_id
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT ?1",
        )?;
        let comments = stmt
            .query_map(params![sql_limit(Some(limit))], |row| {
                Ok(CommentWithTicket {
                    comment: comment_from_row(row)?,
                    ticket_title: row.get(5)?,
                    ticket_description: row.get(6)?,
                    ticket_status: parse_column(row, 7)?,
                    ticket_priority: parse_column(row, 8)?,
                    ticket_created_at: timestamp_column(row, 9)?,
                    assignee_name: row.get(10)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }

    /// Newest comments written by a user.
    pub fn recent_comments_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<Comment>> {
        require(&self.conn, Entity::User, user_id)?;
        let sql = format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE author_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let comments = stmt
            .query_map(params![user_id, sql_limit(Some(limit))], comment_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comments)
    }
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
