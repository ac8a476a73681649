use super::*;
use crate::comment::NewComment;
use crate::error::ErrorKind;
use crate::task::NewTask;
use crate::ticket::NewTicket;
use crate::user::NewUser;
use std::sync::{Arc, Barrier};

fn db_with_ticket(ticket_id: i64) -> Database {
    let mut db = Database::open_in_memory().unwrap();
    db.create_user(NewUser::new("Alice").with_id(1)).unwrap();
    db.create_ticket(NewTicket::new(1, "T", "D").with_id(ticket_id))
        .unwrap();
    db
}

fn precondition_reason(err: Error) -> ClosureBlocked {
    match err {
        Error::PreconditionFailed { reason, .. } => reason,
        other => panic!("expected PreconditionFailed, got {other:?}"),
    }
}

#[test]
fn evaluate_covers_every_combination() {
    let check = |status, comment_count, open_task_count| ClosureCheck {
        ticket_id: 1,
        status,
        comment_count,
        open_task_count,
    };

    assert_eq!(check(Status::Open, 1, 0).evaluate(), Ok(()));
    assert_eq!(
        check(Status::Open, 0, 0).evaluate(),
        Err(ClosureBlocked::NoComments)
    );
    assert_eq!(
        check(Status::Open, 3, 2).evaluate(),
        Err(ClosureBlocked::OpenTasks(2))
    );
    assert_eq!(
        check(Status::Open, 0, 1).evaluate(),
        Err(ClosureBlocked::NoCommentsAndOpenTasks(1))
    );
    assert_eq!(
        check(Status::Closed, 1, 0).evaluate(),
        Err(ClosureBlocked::AlreadyClosed)
    );
}

#[test]
fn blocked_reasons_read_naturally() {
    assert_eq!(ClosureBlocked::OpenTasks(1).to_string(), "1 open task remains");
    assert_eq!(
        ClosureBlocked::OpenTasks(3).to_string(),
        "3 open tasks remain"
    );
    assert_eq!(
        ClosureBlocked::NoCommentsAndOpenTasks(2).to_string(),
        "ticket has no comments and 2 open tasks remain"
    );
}

#[test]
fn ticket_without_comments_cannot_close_until_commented() {
    let mut db = db_with_ticket(100);
    let ticket = db.get_ticket(100).unwrap();
    assert_eq!(ticket.status, Status::Open);
    assert_eq!(ticket.priority, crate::ticket::Priority::Low);

    let err = db.close_ticket(100).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionFailed);
    assert_eq!(precondition_reason(err), ClosureBlocked::NoComments);
    let unchanged = db.get_ticket(100).unwrap();
    assert_eq!(unchanged.status, Status::Open);
    assert!(unchanged.closed_at.is_none());

    db.add_comment(NewComment::new(100, 1, "Looked into it"))
        .unwrap();
    let closed = db.close_ticket(100).unwrap();
    assert_eq!(closed.status, Status::Closed);
    assert!(closed.closed_at.is_some());
    assert_eq!(db.get_ticket(100).unwrap(), closed);
}

#[test]
fn open_task_blocks_closure_until_closed() {
    let mut db = db_with_ticket(200);
    let task = db
        .create_task(NewTask::new(200, 1, "Fix", "Apply patch"))
        .unwrap();
    db.add_comment(NewComment::new(200, 1, "Patch ready")).unwrap();

    let err = db.close_ticket(200).unwrap_err();
    assert_eq!(err.to_string(), "Cannot close ticket 200: 1 open task remains");
    assert_eq!(db.get_ticket(200).unwrap().status, Status::Open);

    db.close_task(task.id, now()).unwrap();
    let closed = db.close_ticket(200).unwrap();
    assert_eq!(closed.status, Status::Closed);
}

#[test]
fn closing_twice_is_rejected_and_keeps_first_timestamp() {
    let mut db = db_with_ticket(1);
    db.add_comment(NewComment::new(1, 1, "done")).unwrap();
    let first = db.close_ticket(1).unwrap();

    let err = db.close_ticket(1).unwrap_err();
    assert_eq!(precondition_reason(err), ClosureBlocked::AlreadyClosed);
    assert_eq!(db.get_ticket(1).unwrap().closed_at, first.closed_at);
}

#[test]
fn close_missing_ticket_is_not_found() {
    let mut db = db_with_ticket(1);
    assert_eq!(db.close_ticket(404).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn closure_check_reports_counts() {
    let mut db = db_with_ticket(1);
    let task = db.create_task(NewTask::new(1, 1, "a", "a")).unwrap();
    db.create_task(NewTask::new(1, 1, "b", "b")).unwrap();
    db.close_task(task.id, now()).unwrap();
    db.add_comment(NewComment::new(1, 1, "x")).unwrap();
    db.add_comment(NewComment::new(1, 1, "y")).unwrap();

    let check = db.closure_check(1).unwrap();
    assert_eq!(check.comment_count, 2);
    assert_eq!(check.open_task_count, 1);
    assert!(!check.can_close());
}

#[test]
fn closed_ticket_rejects_new_tasks() {
    let mut db = db_with_ticket(1);
    db.add_comment(NewComment::new(1, 1, "done")).unwrap();
    db.close_ticket(1).unwrap();

    let err = db.create_task(NewTask::new(1, 1, "late", "late")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn explicit_closure_timestamp_is_stored() {
    use chrono::TimeZone;

    let mut db = db_with_ticket(1);
    db.add_comment(NewComment::new(1, 1, "done")).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap();
    let closed = db.close_ticket_at(1, at).unwrap();
    assert_eq!(closed.closed_at, Some(at));
}

#[test]
fn concurrent_closures_on_shared_file_close_once() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("tix.db");
    {
        let mut db = Database::open(&path).unwrap();
        db.create_user(NewUser::new("Alice").with_id(1)).unwrap();
        db.create_ticket(NewTicket::new(1, "T", "D").with_id(1))
            .unwrap();
        db.add_comment(NewComment::new(1, 1, "ready")).unwrap();
    }

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let mut db = Database::open(&path).unwrap();
                barrier.wait();
                db.close_ticket(1)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in results.into_iter().filter_map(|r| r.err()) {
        assert_eq!(precondition_reason(result), ClosureBlocked::AlreadyClosed);
    }
}

#[test]
fn task_closed_by_another_handle_is_seen_by_the_guard() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("tix.db");
    let mut writer = Database::open(&path).unwrap();
    writer.create_user(NewUser::new("Alice").with_id(1)).unwrap();
    writer
        .create_ticket(NewTicket::new(1, "T", "D").with_id(1))
        .unwrap();
    let task = writer.create_task(NewTask::new(1, 1, "a", "a")).unwrap();
    writer.add_comment(NewComment::new(1, 1, "c")).unwrap();

    let mut closer = Database::open(&path).unwrap();
    assert!(closer.close_ticket(1).is_err());

    writer.close_task(task.id, now()).unwrap();
    assert!(closer.close_ticket(1).is_ok());
}
