//! tix - ticket tracker CLI
//!
//! Works directly on the SQLite database named in the tix config.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tix_core::{Config, TicketFilter, parse_severity};

mod commands;

#[derive(Parser)]
#[command(name = "tix")]
#[command(about = "Ticket tracker with tasks, comments and closure rules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to $TIX_CONFIG, then the user config dir)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file and create the database
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Import users and tickets from JSON
    Seed {
        /// Combined `{ "users": [...], "tickets": [...] }` document
        #[arg(required_unless_present_all = ["users", "tickets"])]
        file: Option<PathBuf>,

        /// Users array, used together with --tickets
        #[arg(long, requires = "tickets", conflicts_with = "file")]
        users: Option<PathBuf>,

        /// Tickets array, used together with --users
        #[arg(long, requires = "users", conflicts_with = "file")]
        tickets: Option<PathBuf>,
    },

    /// List tickets
    List {
        #[command(flatten)]
        filter: ListFilter,
    },

    /// Show a ticket with its tasks and comments
    Show {
        /// Ticket ID
        id: i64,
    },

    /// Close a ticket (needs a comment and no open tasks)
    Close {
        /// Ticket ID
        id: i64,
    },

    /// Close a task
    TaskClose {
        /// Task ID
        id: i64,

        /// Closure time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Comment on a ticket
    Comment {
        /// Ticket ID
        ticket: i64,

        /// Author user ID
        author: i64,

        /// Comment text
        body: String,
    },

    /// Show the newest comments across all tickets
    Latest {
        /// Number of comments (defaults to the configured limit)
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the effective configuration
    Config,
}

/// At most one ticket filter
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct ListFilter {
    /// Open or Closed
    #[arg(short, long)]
    status: Option<String>,

    /// Assignee user ID
    #[arg(short, long)]
    assignee: Option<i64>,

    /// LOW, MEDIUM, HIGH or SEVERE
    #[arg(long)]
    severity: Option<String>,

    /// Text in title or description
    #[arg(long)]
    search: Option<String>,

    /// Created within the last N days
    #[arg(long, value_name = "DAYS")]
    within_days: Option<u32>,

    /// Created N or more days ago
    #[arg(long, value_name = "DAYS")]
    before_days: Option<u32>,
}

impl ListFilter {
    fn into_filter(self, legacy_severity_index: bool) -> Result<TicketFilter> {
        let filter = if let Some(status) = self.status {
            TicketFilter::Status(status.parse()?)
        } else if let Some(user_id) = self.assignee {
            TicketFilter::Assignee(user_id)
        } else if let Some(severity) = self.severity {
            TicketFilter::Severity(parse_severity(&severity, legacy_severity_index)?)
        } else if let Some(text) = self.search {
            TicketFilter::Search(text)
        } else if let Some(days) = self.within_days {
            TicketFilter::CreatedWithinDays(days)
        } else if let Some(days) = self.before_days {
            TicketFilter::CreatedBeforeDays(days)
        } else {
            TicketFilter::All
        };
        Ok(filter)
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Init { force } => commands::init(&config, cli.config.as_deref(), force),
        Commands::Seed {
            file,
            users,
            tickets,
        } => commands::seed(&config, file, users.zip(tickets), cli.json),
        Commands::List { filter } => {
            let filter = filter.into_filter(config.queries.legacy_severity_index)?;
            commands::list(&config, &filter, cli.json)
        }
        Commands::Show { id } => commands::show(&config, id, cli.json),
        Commands::Close { id } => commands::close(&config, id, cli.json),
        Commands::TaskClose { id, at } => commands::task_close(&config, id, at, cli.json),
        Commands::Comment {
            ticket,
            author,
            body,
        } => commands::comment(&config, ticket, author, &body, cli.json),
        Commands::Latest { limit } => commands::latest(&config, limit, cli.json),
        Commands::Config => commands::config_show(&config, cli.config.as_deref(), cli.json),
    }
}
