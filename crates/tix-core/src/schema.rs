//! SQL schema for the ticket store
//!
//! Four tables, surrogate integer keys, declared foreign keys. Timestamps are
//! RFC 3339 UTC text with fixed microsecond precision, so comparing them as
//! strings orders them chronologically.

use rusqlite::Connection;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT
);

CREATE TABLE IF NOT EXISTS tickets (
    id INTEGER PRIMARY KEY,
    assignee_id INTEGER NOT NULL,
    requestor_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Open' CHECK (status IN ('Open', 'Closed')),
    priority TEXT NOT NULL DEFAULT 'LOW'
        CHECK (priority IN ('LOW', 'MEDIUM', 'HIGH', 'SEVERE')),
    created_at TEXT NOT NULL,
    closed_at TEXT,
    CHECK ((status = 'Closed') = (closed_at IS NOT NULL)),
    FOREIGN KEY (assignee_id) REFERENCES users(id),
    FOREIGN KEY (requestor_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY,
    ticket_id INTEGER NOT NULL,
    assignee_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'Open' CHECK (status IN ('Open', 'Closed')),
    created_at TEXT NOT NULL,
    due_at TEXT NOT NULL,
    closed_at TEXT,
    CHECK ((status = 'Closed') = (closed_at IS NOT NULL)),
    FOREIGN KEY (ticket_id) REFERENCES tickets(id),
    FOREIGN KEY (assignee_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY,
    ticket_id INTEGER NOT NULL,
    author_id INTEGER NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (ticket_id) REFERENCES tickets(id),
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_tickets_assignee ON tickets(assignee_id);
CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
CREATE INDEX IF NOT EXISTS idx_tickets_priority ON tickets(priority);
CREATE INDEX IF NOT EXISTS idx_tasks_ticket ON tasks(ticket_id);
CREATE INDEX IF NOT EXISTS idx_comments_ticket ON comments(ticket_id);
CREATE INDEX IF NOT EXISTS idx_comments_author ON comments(author_id);
CREATE INDEX IF NOT EXISTS idx_comments_created ON comments(created_at DESC);
"#;

/// Create the tables if they do not exist yet.
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)
}
