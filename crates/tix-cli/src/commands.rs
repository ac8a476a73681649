//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};
use tix_core::{Config, Database, NewComment, Priority, SeedData, Status, Ticket, TicketFilter};

fn open(config: &Config) -> Result<Database> {
    Database::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.database_path.display()
        )
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn colored_status(status: Status) -> colored::ColoredString {
    match status {
        Status::Open => "Open".white(),
        Status::Closed => "Closed".green(),
    }
}

fn colored_priority(priority: Priority) -> colored::ColoredString {
    match priority {
        Priority::Low => "LOW".dimmed(),
        Priority::Medium => "MEDIUM".blue(),
        Priority::High => "HIGH".yellow(),
        Priority::Severe => "SEVERE".red().bold(),
    }
}

fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

pub fn init(config: &Config, explicit: Option<&Path>, force: bool) -> Result<()> {
    let config_path = Config::locate(explicit)
        .ok_or_else(|| anyhow::anyhow!("No config directory available; pass --config"))?;

    if config_path.exists() && !force {
        println!(
            "{} Config already exists at {}",
            "•".yellow(),
            config_path.display()
        );
    } else {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, Config::default_with_comments())?;
        println!(
            "{} Wrote config to {}",
            "✓".green(),
            config_path.display()
        );
    }

    open(config)?;
    println!(
        "{} Database ready at {}",
        "✓".green(),
        config.database_path.display()
    );
    Ok(())
}

pub fn seed(
    config: &Config,
    file: Option<PathBuf>,
    split: Option<(PathBuf, PathBuf)>,
    json: bool,
) -> Result<()> {
    let data = match (file, split) {
        (Some(path), _) => SeedData::from_path(&path)
            .with_context(|| format!("Failed to read seed file {}", path.display()))?,
        (None, Some((users, tickets))) => SeedData::from_split_json(
            &std::fs::read_to_string(&users)
                .with_context(|| format!("Failed to read {}", users.display()))?,
            &std::fs::read_to_string(&tickets)
                .with_context(|| format!("Failed to read {}", tickets.display()))?,
        )?,
        (None, None) => anyhow::bail!("Nothing to import: pass a file or --users and --tickets"),
    };

    let mut db = open(config)?;
    let report = data.import(&mut db)?;

    if json {
        return print_json(&report);
    }

    println!(
        "{} Imported {} users, {} tickets, {} tasks, {} comments",
        "✓".green(),
        report.users,
        report.tickets,
        report.tasks,
        report.comments
    );
    println!("  Closed tickets: {}", report.closed_tickets);
    for rejected in &report.rejected_closures {
        println!(
            "  {} ticket {} left open: {}",
            "!".yellow(),
            rejected.ticket_id,
            rejected.reason
        );
    }
    Ok(())
}

fn ticket_table(tickets: &[Ticket]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Priority", "Status", "Assignee", "Created", "Title"].map(String::from));
    for ticket in tickets {
        builder.push_record([
            ticket.id.to_string(),
            ticket.priority.to_string(),
            ticket.status.to_string(),
            ticket.assignee_id.to_string(),
            format_time(&ticket.created_at),
            ticket.title.clone(),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

pub fn list(config: &Config, filter: &TicketFilter, json: bool) -> Result<()> {
    let db = open(config)?;
    let tickets = db.list_tickets(filter)?;

    if json {
        print_json(&tickets)
    } else if tickets.is_empty() {
        println!("No tickets found");
        Ok(())
    } else {
        println!("{}", ticket_table(&tickets));
        Ok(())
    }
}

pub fn show(config: &Config, id: i64, json: bool) -> Result<()> {
    let db = open(config)?;
    let detail = db.ticket_detail_with_limit(id, config.queries.detail_preview_limit)?;

    if json {
        return print_json(&detail);
    }

    let ticket = &detail.ticket;
    let assignee = db.get_user(ticket.assignee_id)?;
    let requestor = db.get_user(ticket.requestor_id)?;

    println!(
        "{} {}",
        format!("#{}", ticket.id).cyan().bold(),
        ticket.title.bold()
    );
    println!();
    println!("Status:    {}", colored_status(ticket.status));
    println!("Priority:  {}", colored_priority(ticket.priority));
    println!("Assignee:  {} ({})", assignee.name, assignee.id);
    println!("Requestor: {} ({})", requestor.name, requestor.id);
    println!("Created:   {}", format_time(&ticket.created_at));
    if let Some(closed_at) = &ticket.closed_at {
        println!("Closed:    {}", format_time(closed_at));
    }

    println!();
    println!("{}", "Description:".bold());
    println!("{}", ticket.description);

    if !detail.tasks.is_empty() {
        let now = tix_core::db::now();
        println!();
        println!("{}", "Tasks:".bold());
        for task in &detail.tasks {
            let due = format!("due {}", format_time(&task.due_at));
            let due = if task.is_overdue(now) {
                due.red()
            } else {
                due.normal()
            };
            println!(
                "  {} [{}] {} ({})",
                task.id.to_string().cyan(),
                colored_status(task.status),
                task.title,
                due
            );
        }
    }

    if !detail.comments.is_empty() {
        println!();
        println!("{}", "Comments:".bold());
        for comment in &detail.comments {
            println!(
                "  {} user {}: {}",
                format_time(&comment.created_at).dimmed(),
                comment.author_id,
                comment.body
            );
        }
    }

    Ok(())
}

pub fn close(config: &Config, id: i64, json: bool) -> Result<()> {
    let mut db = open(config)?;
    let ticket = db.close_ticket(id)?;

    if json {
        print_json(&ticket)
    } else {
        println!("{} Closed ticket {}", "✓".green(), id);
        Ok(())
    }
}

pub fn task_close(
    config: &Config,
    id: i64,
    at: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let mut db = open(config)?;
    let task = db.close_task(id, at.unwrap_or_else(tix_core::db::now))?;

    if json {
        print_json(&task)
    } else {
        println!(
            "{} Closed task {} on ticket {}",
            "✓".green(),
            task.id,
            task.ticket_id
        );
        Ok(())
    }
}

pub fn comment(config: &Config, ticket_id: i64, author_id: i64, body: &str, json: bool) -> Result<()> {
    let mut db = open(config)?;
    let comment = db.add_comment(NewComment::new(ticket_id, author_id, body))?;

    if json {
        print_json(&comment)
    } else {
        println!(
            "{} Added comment {} to ticket {}",
            "✓".green(),
            comment.id,
            ticket_id
        );
        Ok(())
    }
}

pub fn latest(config: &Config, limit: Option<usize>, json: bool) -> Result<()> {
    let db = open(config)?;
    let limit = limit.unwrap_or(config.queries.recent_comments_limit);
    let comments = db.recent_comments_with_ticket(limit)?;

    if json {
        return print_json(&comments);
    }
    if comments.is_empty() {
        println!("No comments found");
        return Ok(());
    }

    for entry in &comments {
        println!(
            "{} {} [{}] {} (assignee: {})",
            format_time(&entry.comment.created_at).dimmed(),
            format!("#{}", entry.comment.ticket_id).cyan(),
            colored_status(entry.ticket_status),
            entry.ticket_title,
            entry.assignee_name
        );
        println!("    user {}: {}", entry.comment.author_id, entry.comment.body);
    }
    Ok(())
}

pub fn config_show(config: &Config, explicit: Option<&Path>, json: bool) -> Result<()> {
    if json {
        return print_json(config);
    }

    match Config::locate(explicit) {
        Some(path) if path.exists() => println!("# {}", path.display()),
        Some(path) => println!("# {} (not present, using defaults)", path.display()),
        None => println!("# no config file, using defaults"),
    }
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ticket(id: i64, title: &str) -> Ticket {
        Ticket {
            id,
            assignee_id: 1,
            requestor_id: 1,
            title: title.to_string(),
            description: "d".to_string(),
            status: Status::Open,
            priority: Priority::High,
            created_at: Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap(),
            closed_at: None,
        }
    }

    #[test]
    fn table_lists_one_row_per_ticket() {
        let table = ticket_table(&[ticket(1, "Login error"), ticket(2, "Typo")]);
        assert!(table.contains("Login error"));
        assert!(table.contains("Typo"));
        assert!(table.contains("2024-04-01 10:00"));
        assert!(table.contains("HIGH"));
    }
}
