use super::*;
use crate::comment::NewComment;
use crate::error::ErrorKind;
use crate::task::NewTask;
use crate::ticket::NewTicket;
use crate::user::NewUser;
use chrono::Utc;

/// Two users, six tickets with mixed priorities, statuses and ages.
fn seeded() -> Database {
    let mut db = Database::open_in_memory().unwrap();
    db.create_user(NewUser::new("Alice").with_id(1)).unwrap();
    db.create_user(NewUser::new("Bob").with_id(2)).unwrap();

    let now = Utc::now();
    let tickets = [
        (1, 1, "Login error", "Users see a 500", Priority::High, 1),
        (2, 1, "Slow dashboard", "Takes an ERROR-prone path", Priority::Low, 10),
        (3, 2, "Typo on homepage", "Minor copy fix", Priority::Low, 2),
        (4, 2, "Disk full", "Server out of space", Priority::Severe, 30),
        (5, 1, "Feature request", "Dark mode", Priority::Medium, 3),
        (6, 2, "100% CPU", "Runaway process", Priority::High, 8),
    ];
    for (id, assignee, title, description, priority, age_days) in tickets {
        db.create_ticket(
            NewTicket::new(assignee, title, description)
                .with_id(id)
                .with_priority(priority)
                .with_created_at(now - Duration::days(age_days)),
        )
        .unwrap();
    }

    for id in [1, 4] {
        db.add_comment(NewComment::new(id, 1, "resolved")).unwrap();
        db.close_ticket(id).unwrap();
    }
    db
}

fn ids(tickets: &[Ticket]) -> Vec<i64> {
    tickets.iter().map(|t| t.id).collect()
}

#[test]
fn all_filter_returns_every_ticket_in_id_order() {
    let db = seeded();
    assert_eq!(
        ids(&db.list_tickets(&TicketFilter::All).unwrap()),
        vec![1, 2, 3, 4, 5, 6]
    );
}

#[test]
fn status_filter_partitions_tickets() {
    let db = seeded();
    let open = db.list_tickets(&TicketFilter::Status(Status::Open)).unwrap();
    let closed = db
        .list_tickets(&TicketFilter::Status(Status::Closed))
        .unwrap();

    assert_eq!(ids(&open), vec![2, 3, 5, 6]);
    assert_eq!(ids(&closed), vec![1, 4]);
    assert!(open.iter().all(|t| t.status == Status::Open));
    assert!(closed.iter().all(|t| t.closed_at.is_some()));
}

#[test]
fn severity_filter_matches_priority_exactly() {
    let db = seeded();
    let high = db
        .list_tickets(&TicketFilter::Severity(Priority::High))
        .unwrap();
    assert_eq!(ids(&high), vec![1, 6]);
}

#[test]
fn assignee_filter() {
    let db = seeded();
    assert_eq!(
        ids(&db.list_tickets(&TicketFilter::Assignee(2)).unwrap()),
        vec![3, 4, 6]
    );
}

#[test]
fn recency_filters_split_on_cutoff() {
    let db = seeded();
    let recent = db
        .list_tickets(&TicketFilter::CreatedWithinDays(7))
        .unwrap();
    let older = db
        .list_tickets(&TicketFilter::CreatedBeforeDays(7))
        .unwrap();
    assert_eq!(ids(&recent), vec![1, 3, 5]);
    assert_eq!(ids(&older), vec![2, 4, 6]);
}

#[test]
fn recency_filters_saturate_on_huge_day_counts() {
    let db = seeded();
    assert_eq!(
        ids(&db.list_tickets(&TicketFilter::CreatedWithinDays(u32::MAX)).unwrap()),
        vec![1, 2, 3, 4, 5, 6]
    );
    assert!(db
        .list_tickets(&TicketFilter::CreatedBeforeDays(u32::MAX))
        .unwrap()
        .is_empty());
}

#[test]
fn search_folds_non_ascii_case() {
    let mut db = seeded();
    db.create_ticket(NewTicket::new(1, "Érror d'accès", "Portail bloqué").with_id(7))
        .unwrap();
    assert_eq!(ids(&db.search_tickets("ÉRROR").unwrap()), vec![7]);
    assert_eq!(ids(&db.search_tickets("BLOQUÉ").unwrap()), vec![7]);
}

#[test]
fn search_is_case_insensitive_over_title_and_description() {
    let db = seeded();
    let hits = db.search_tickets("error").unwrap();
    assert_eq!(ids(&hits), vec![1, 2]);
    for ticket in db.list_tickets(&TicketFilter::All).unwrap() {
        let matches = ticket.title.to_lowercase().contains("error")
            || ticket.description.to_lowercase().contains("error");
        assert_eq!(matches, hits.contains(&ticket));
    }
}

#[test]
fn search_treats_wildcards_literally() {
    let db = seeded();
    assert_eq!(ids(&db.search_tickets("100%").unwrap()), vec![6]);
    assert!(db.search_tickets("_").unwrap().is_empty());
}

#[test]
fn blank_search_is_rejected() {
    let db = seeded();
    assert_eq!(
        db.search_tickets("  ").unwrap_err().kind(),
        ErrorKind::Validation
    );
}

#[test]
fn tickets_for_user_with_status_filter_ignores_case() {
    let db = seeded();
    assert_eq!(ids(&db.tickets_for_user(1, None).unwrap()), vec![1, 2, 5]);
    assert_eq!(
        ids(&db.tickets_for_user(1, Some("OPEN")).unwrap()),
        vec![2, 5]
    );
    assert_eq!(
        ids(&db.tickets_for_user(1, Some("closed")).unwrap()),
        vec![1]
    );
    assert!(db.tickets_for_user(1, Some("pending")).is_err());
}

#[test]
fn tickets_by_severity_with_status_filter() {
    let db = seeded();
    assert_eq!(
        ids(&db.tickets_by_severity(Priority::High, Some("open")).unwrap()),
        vec![6]
    );
    assert_eq!(
        ids(&db.tickets_by_severity(Priority::Severe, None).unwrap()),
        vec![4]
    );
}

#[test]
fn severity_index_is_a_opt_in_shim() {
    assert_eq!(parse_severity("high", false).unwrap(), Priority::High);
    assert!(parse_severity("2", false).is_err());
    assert_eq!(parse_severity("2", true).unwrap(), Priority::High);
    assert_eq!(parse_severity("0", true).unwrap(), Priority::Low);
    assert!(parse_severity("4", true).is_err());
}

#[test]
fn detail_truncates_tasks_and_comments() {
    let mut db = seeded();
    for i in 0..7 {
        db.create_task(NewTask::new(2, 1, format!("task {i}"), "work"))
            .unwrap();
        db.add_comment(NewComment::new(2, 2, format!("comment {i}")))
            .unwrap();
    }

    let detail = db.ticket_detail(2).unwrap();
    assert_eq!(detail.ticket.id, 2);
    assert_eq!(detail.tasks.len(), DETAIL_PREVIEW_LIMIT);
    assert_eq!(detail.comments.len(), DETAIL_PREVIEW_LIMIT);
    assert_eq!(detail.tasks[0].title, "task 0");
    assert_eq!(detail.comments[4].body, "comment 4");

    let wide = db.ticket_detail_with_limit(2, 50).unwrap();
    assert_eq!(wide.tasks.len(), 7);
}

#[test]
fn detail_of_missing_ticket_is_not_found() {
    let db = seeded();
    assert_eq!(
        db.ticket_detail(999).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn detail_serializes_ticket_fields_at_top_level() {
    let db = seeded();
    let value = serde_json::to_value(db.ticket_detail(1).unwrap()).unwrap();
    assert_eq!(value["id"], 1);
    assert_eq!(value["status"], "Closed");
    assert_eq!(value["priority"], "HIGH");
    assert_eq!(value["comments"].as_array().map(Vec::len), Some(1));
}
