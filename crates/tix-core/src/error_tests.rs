use super::*;

#[test]
fn kind_groups_parse_failures_with_validation() {
    assert_eq!(
        Error::InvalidStatus("pending".into()).kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        Error::InvalidPriority("urgent".into()).kind(),
        ErrorKind::Validation
    );
    assert_eq!(Error::Config("bad".into()).kind(), ErrorKind::Validation);
}

#[test]
fn kind_of_lookup_and_conflict_errors() {
    assert_eq!(
        Error::not_found(Entity::Ticket, 7).kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        Error::Conflict {
            entity: Entity::User,
            id: 1
        }
        .kind(),
        ErrorKind::Conflict
    );
}

#[test]
fn storage_errors_are_classified_as_storage() {
    let err = Error::from(rusqlite::Error::QueryReturnedNoRows);
    assert_eq!(err.kind(), ErrorKind::Storage);
}

#[test]
fn precondition_message_names_the_unmet_condition() {
    let err = Error::PreconditionFailed {
        ticket_id: 200,
        reason: ClosureBlocked::OpenTasks(1),
    };
    assert_eq!(
        err.to_string(),
        "Cannot close ticket 200: 1 open task remains"
    );
}

#[test]
fn not_found_message_names_entity_and_id() {
    let err = Error::not_found(Entity::Comment, 42);
    assert_eq!(err.to_string(), "Comment not found: 42");
}

#[test]
fn required_reports_missing_field() {
    let err = required::<i64>(None, "assignee_id").unwrap_err();
    assert!(matches!(err, Error::Validation(ref msg) if msg.contains("assignee_id")));
    assert_eq!(required(Some(3), "assignee_id").unwrap(), 3);
}

#[test]
fn require_text_rejects_blank() {
    assert!(require_text("   ", "title").is_err());
    assert!(require_text("T", "title").is_ok());
}
