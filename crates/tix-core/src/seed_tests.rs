use super::*;
use crate::error::ErrorKind;
use crate::query::TicketFilter;

const SAMPLE: &str = r#"{
  "users": [
    { "id": 1, "name": "Emma Smith", "firstName": "Emma", "lastName": "Smith" },
    { "id": 2, "name": "James Lee" }
  ],
  "tickets": [
    {
      "id": 1,
      "assigned_to": 1,
      "requestor": 2,
      "title": "Ticket 1",
      "description": "Description of Ticket 1",
      "status": "Closed",
      "priority": "HIGH",
      "creation_date": "2024-04-01T10:00:00.000Z",
      "closure_date": "2024-04-02T10:00:00.000Z",
      "comments": [
        { "user_id": 2, "content": "Comment 1 for Ticket 1", "datetime": "2024-04-01T12:00:00.000Z" }
      ],
      "tasks": [
        {
          "id": 1,
          "assigned_to": 2,
          "description": "Task 1 for Ticket 1",
          "status": "Open",
          "creation_date": "2024-04-01T10:00:00.000Z",
          "due_date": "2024-04-03T10:00:00.000Z",
          "closure_date": null
        }
      ]
    },
    {
      "id": 2,
      "assigned_to": 2,
      "requestor": 1,
      "title": "Ticket 2",
      "description": "Description of Ticket 2",
      "status": "Open",
      "priority": "SEVERE",
      "creation_date": "2024-04-05T10:00:00.000Z",
      "closure_date": null,
      "comments": [],
      "tasks": [
        {
          "id": 1,
          "assigned_to": 1,
          "description": "Task 1 for Ticket 2",
          "status": "Open",
          "creation_date": "2024-04-05T10:00:00.000Z",
          "due_date": "2024-04-05T20:00:00.000Z",
          "closure_date": null
        }
      ]
    },
    {
      "id": 3,
      "assigned_to": 1,
      "requestor": 1,
      "title": "Ticket 3",
      "description": "Description of Ticket 3",
      "status": "Closed",
      "priority": "LOW",
      "creation_date": "2024-04-06T10:00:00.000Z",
      "closure_date": "2024-04-07T10:00:00.000Z",
      "comments": [],
      "tasks": []
    }
  ]
}"#;

#[test]
fn import_creates_everything_through_create_operations() {
    let mut db = Database::open_in_memory().unwrap();
    let report = SeedData::from_json(SAMPLE)
        .unwrap()
        .import(&mut db)
        .unwrap();

    assert_eq!(report.users, 2);
    assert_eq!(report.tickets, 3);
    assert_eq!(report.tasks, 2);
    assert_eq!(report.comments, 1);
    assert_eq!(db.list_users().unwrap().len(), 2);
    assert_eq!(db.list_tasks().unwrap().len(), 2);
}

#[test]
fn closed_seed_ticket_closes_its_tasks_first() {
    let mut db = Database::open_in_memory().unwrap();
    SeedData::from_json(SAMPLE)
        .unwrap()
        .import(&mut db)
        .unwrap();

    let ticket = db.get_ticket(1).unwrap();
    assert_eq!(ticket.status, Status::Closed);
    assert_eq!(
        ticket.closed_at.map(|t| t.to_rfc3339()),
        Some("2024-04-02T10:00:00+00:00".to_string())
    );
    assert_eq!(ticket.priority, Priority::High);
    assert_eq!(ticket.requestor_id, 2);

    let tasks = db.tasks_for_ticket(1).unwrap();
    assert!(tasks.iter().all(|t| t.status == Status::Closed));
    assert!(tasks.iter().all(|t| t.closed_at == ticket.closed_at));
    assert_eq!(tasks[0].title, "Task 1 for Ticket 1");
}

#[test]
fn closure_rejected_by_the_rules_is_reported() {
    let mut db = Database::open_in_memory().unwrap();
    let report = SeedData::from_json(SAMPLE)
        .unwrap()
        .import(&mut db)
        .unwrap();

    assert_eq!(report.closed_tickets, 1);
    assert_eq!(
        report.rejected_closures,
        vec![RejectedClosure {
            ticket_id: 3,
            reason: ClosureBlocked::NoComments
        }]
    );
    assert_eq!(db.get_ticket(3).unwrap().status, Status::Open);
}

#[test]
fn seed_history_is_preserved() {
    let mut db = Database::open_in_memory().unwrap();
    SeedData::from_json(SAMPLE)
        .unwrap()
        .import(&mut db)
        .unwrap();

    let open = db
        .list_tickets(&TicketFilter::Status(Status::Open))
        .unwrap();
    assert_eq!(open.len(), 2);
    let tasks = db.tasks_for_ticket(2).unwrap();
    assert_eq!(tasks[0].due_at.to_rfc3339(), "2024-04-05T20:00:00+00:00");
}

#[test]
fn unknown_assignee_stops_the_import() {
    let mut db = Database::open_in_memory().unwrap();
    let data = SeedData::from_json(
        r#"{ "users": [{ "id": 1, "name": "A" }],
             "tickets": [{ "assigned_to": 5, "title": "T", "description": "D" }] }"#,
    )
    .unwrap();

    let err = data.import(&mut db).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(db.list_tickets(&TicketFilter::All).unwrap().is_empty());
}

#[test]
fn split_documents_are_accepted() {
    let data = SeedData::from_split_json(
        r#"[{ "id": 1, "name": "A" }]"#,
        r#"[{ "id": 9, "assigned_to": 1, "requestor": 1, "title": "T", "description": "D" }]"#,
    )
    .unwrap();
    assert_eq!(data.users.len(), 1);
    assert_eq!(data.tickets[0].id, Some(9));
    assert_eq!(data.tickets[0].priority, Priority::Low);
}

#[test]
fn malformed_json_is_reported() {
    let err = SeedData::from_json("{ not json").unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}
