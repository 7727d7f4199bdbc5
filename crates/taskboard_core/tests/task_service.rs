use chrono::NaiveDate;
use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    AssignmentAction, Conflict, EntityKind, NewUser, ServiceError, SqliteStore, TaskDraft,
    TaskService, TaskStatus, UnknownIdPolicy, UserService, ValidationError,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn seed_users(conn: &Connection, count: usize) -> Vec<i64> {
    let users = UserService::new(SqliteStore::try_new(conn).unwrap());
    (0..count)
        .map(|index| {
            users
                .create(&NewUser::new(
                    format!("First{index}"),
                    format!("Last{index}"),
                    format!("user{index}@example.com"),
                ))
                .unwrap()
                .id
        })
        .collect()
}

#[test]
fn create_assigns_requested_users() {
    let conn = open_db_in_memory().unwrap();
    let user_ids = seed_users(&conn, 3);
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());

    let draft = TaskDraft::new("Write release notes", "for 1.0")
        .with_deadline(day(2099, 6, 1))
        .with_users([user_ids[2], user_ids[0]]);
    let created = service.create(&draft).unwrap();

    assert_eq!(created.status, TaskStatus::Todo);
    assert_eq!(created.deadline, Some(day(2099, 6, 1)));
    assert_eq!(created.user_ids(), vec![user_ids[0], user_ids[2]]);

    let reloaded = service.find_by_id(created.id).unwrap();
    assert_eq!(reloaded, created);
}

#[test]
fn create_rejects_duplicate_title_without_persisting() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());

    service
        .create(&TaskDraft::new("Same title", "first"))
        .unwrap();
    let err = service
        .create(&TaskDraft::new("Same title", "second"))
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Conflict(Conflict::DuplicateKey {
            entity: EntityKind::Task,
            ref key
        }) if key == "Same title"
    ));
    assert_eq!(service.count().unwrap(), 1);
    assert_eq!(
        service.find_by_title("Same title").unwrap().description,
        "first"
    );
}

#[test]
fn create_requires_future_deadline_and_text() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());
    let today = day(2030, 1, 15);

    let due_today = TaskDraft::new("Due today", "x").with_deadline(today);
    assert!(matches!(
        service.create_on(&due_today, today),
        Err(ServiceError::Validation(
            ValidationError::DeadlineNotInFuture { .. }
        ))
    ));

    let blank = TaskDraft::new("Blank description", "   ");
    assert!(matches!(
        service.create_on(&blank, today),
        Err(ServiceError::Validation(ValidationError::BlankField(
            "description"
        )))
    ));

    assert_eq!(service.count().unwrap(), 0);
}

#[test]
fn create_with_unknown_user_rolls_back_under_reject_policy() {
    let conn = open_db_in_memory().unwrap();
    let user_ids = seed_users(&conn, 1);
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());

    let draft = TaskDraft::new("Orphan", "x").with_users([user_ids[0], 404]);
    let err = service.create(&draft).unwrap_err();

    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: EntityKind::User,
            id: 404
        }
    ));
    assert_eq!(service.count().unwrap(), 0);
    assert!(service.find_by_title("Orphan").unwrap_err().is_not_found());
}

#[test]
fn skip_policy_drops_unknown_users() {
    let conn = open_db_in_memory().unwrap();
    let user_ids = seed_users(&conn, 1);
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap())
        .with_unknown_id_policy(UnknownIdPolicy::Skip);

    let draft = TaskDraft::new("Lenient", "x").with_users([user_ids[0], 404]);
    let created = service.create(&draft).unwrap();

    assert_eq!(created.user_ids(), vec![user_ids[0]]);
}

#[test]
fn update_reconciles_assignment_set() {
    let conn = open_db_in_memory().unwrap();
    let u = seed_users(&conn, 4);
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());
    let users = UserService::new(SqliteStore::try_new(&conn).unwrap());

    let created = service
        .create(&TaskDraft::new("Plan", "sprint").with_users([u[0], u[1], u[2]]))
        .unwrap();

    let updated = service
        .update(
            created.id,
            &TaskDraft::new("Plan", "sprint 2")
                .with_status(TaskStatus::InProgress)
                .with_users([u[1], u[2], u[3]]),
        )
        .unwrap();
    assert_eq!(updated.user_ids(), vec![u[1], u[2], u[3]]);
    assert_eq!(updated.description, "sprint 2");
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert!(users.find_by_id(u[0]).unwrap().tasks.is_empty());
    assert_eq!(users.find_by_id(u[3]).unwrap().task_ids(), vec![created.id]);

    let untouched = service
        .update(created.id, &TaskDraft::new("Plan", "sprint 3"))
        .unwrap();
    assert_eq!(untouched.user_ids(), vec![u[1], u[2], u[3]]);

    let cleared = service
        .update(created.id, &TaskDraft::new("Plan", "done").with_users([]))
        .unwrap();
    assert!(cleared.users.is_empty());
}

#[test]
fn update_allows_past_deadline_and_own_title() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());
    let created = service.create(&TaskDraft::new("Audit", "q1")).unwrap();

    let updated = service
        .update(
            created.id,
            &TaskDraft::new("Audit", "q1 overdue").with_deadline(day(2001, 1, 1)),
        )
        .unwrap();

    assert_eq!(updated.deadline, Some(day(2001, 1, 1)));
}

#[test]
fn update_title_conflict_leaves_state_unchanged() {
    let conn = open_db_in_memory().unwrap();
    let u = seed_users(&conn, 2);
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());

    service.create(&TaskDraft::new("Taken", "a")).unwrap();
    let target = service
        .create(&TaskDraft::new("Mine", "b").with_users([u[0]]))
        .unwrap();

    let err = service
        .update(
            target.id,
            &TaskDraft::new("Taken", "changed").with_users([u[1]]),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Conflict(Conflict::DuplicateKey { .. })
    ));
    assert_eq!(service.find_by_id(target.id).unwrap(), target);
}

#[test]
fn update_missing_task_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());

    let err = service
        .update(77, &TaskDraft::new("Ghost", "x"))
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: EntityKind::Task,
            id: 77
        }
    ));
}

#[test]
fn change_status_allows_any_transition() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());
    let created = service.create(&TaskDraft::new("Flip", "x")).unwrap();

    for status in [TaskStatus::Done, TaskStatus::Todo, TaskStatus::InProgress] {
        assert_eq!(
            service.change_status(created.id, status).unwrap().status,
            status
        );
    }
    assert!(service
        .change_status(created.id + 1, TaskStatus::Done)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn single_assignment_follows_state_machine() {
    let conn = open_db_in_memory().unwrap();
    let u = seed_users(&conn, 1);
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());
    let task = service.create(&TaskDraft::new("Pair", "x")).unwrap();

    let added = service
        .modify_user_assignment(task.id, u[0], AssignmentAction::Add)
        .unwrap();
    assert_eq!(added.user_ids(), vec![u[0]]);

    let again = service
        .modify_user_assignment(task.id, u[0], AssignmentAction::Add)
        .unwrap_err();
    assert!(matches!(
        again,
        ServiceError::Conflict(Conflict::AlreadyAttached { .. })
    ));
    assert_eq!(service.find_by_id(task.id).unwrap().user_ids(), vec![u[0]]);

    let removed = service
        .modify_user_assignment(task.id, u[0], AssignmentAction::Remove)
        .unwrap();
    assert!(removed.users.is_empty());

    let missing_link = service
        .modify_user_assignment(task.id, u[0], AssignmentAction::Remove)
        .unwrap_err();
    assert!(matches!(
        missing_link,
        ServiceError::Conflict(Conflict::NotAttached { .. })
    ));

    let missing_user = service
        .modify_user_assignment(task.id, 999, AssignmentAction::Add)
        .unwrap_err();
    assert!(matches!(
        missing_user,
        ServiceError::NotFound {
            entity: EntityKind::User,
            id: 999
        }
    ));
}

#[test]
fn delete_severs_every_assignment() {
    let conn = open_db_in_memory().unwrap();
    let u = seed_users(&conn, 2);
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());
    let users = UserService::new(SqliteStore::try_new(&conn).unwrap());
    let task = service
        .create(&TaskDraft::new("Doomed", "x").with_users([u[0], u[1]]))
        .unwrap();

    service.delete(task.id).unwrap();

    assert!(service.find_by_id(task.id).unwrap_err().is_not_found());
    for user_id in u {
        assert!(users.find_by_id(user_id).unwrap().tasks.is_empty());
    }
    assert!(service.delete(task.id).unwrap_err().is_not_found());
}

#[test]
fn find_by_title_reports_missing_key() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(SqliteStore::try_new(&conn).unwrap());

    let err = service.find_by_title("nope").unwrap_err();

    assert!(matches!(
        err,
        ServiceError::NotFoundByKey {
            entity: EntityKind::Task,
            ref key
        } if key == "nope"
    ));
}
