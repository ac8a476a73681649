//! tix-core: Core library for the tix ticket tracker
//!
//! Provides the relational schema, the data access layer, the ticket
//! lifecycle rules and the composed query views. Storage is a single SQLite
//! database; every operation goes through an explicitly constructed
//! [`Database`] handle.

pub mod comment;
pub mod config;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod query;
pub mod schema;
pub mod seed;
pub mod task;
pub mod ticket;
pub mod user;

pub use comment::{Comment, CommentWithTicket, NewComment};
pub use config::{Config, QueryConfig};
pub use db::Database;
pub use error::{Entity, Error, ErrorKind};
pub use lifecycle::{ClosureBlocked, ClosureCheck};
pub use query::{TicketFilter, parse_severity};
pub use seed::{SeedData, SeedReport};
pub use task::{NewTask, Task};
pub use ticket::{NewTicket, Priority, Status, Ticket, TicketDetail};
pub use user::{NewUser, User, UserUpdate};

/// Result type for tix operations
pub type Result<T> = std::result::Result<T, Error>;
