use taskdeck_core::db::open_db_in_memory;
use taskdeck_core::{
    Job, JobService, ListService, ListServiceError, LoadOutcome, PositionKey, RebalancePolicy,
    SqliteJobRepository, SqlitePositionRepository, SqliteTaskRepository, Task, TaskId,
    TaskService,
};
use uuid::Uuid;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

fn create_job(conn: &rusqlite::Connection) -> Job {
    let service = JobService::new(SqliteJobRepository::try_new(conn).unwrap());
    service.create_job("Ordering job").unwrap()
}

fn create_task(conn: &rusqlite::Connection, job: &Job, title: &str) -> Task {
    let service = TaskService::new(SqliteTaskRepository::try_new(conn).unwrap());
    service.create_task(job.uuid, title).unwrap()
}

fn list_service(conn: &rusqlite::Connection) -> ListService<SqlitePositionRepository<'_>> {
    ListService::new(SqlitePositionRepository::try_new(conn).unwrap())
}

fn reload_sequence(conn: &rusqlite::Connection, job: &Job) -> Vec<TaskId> {
    // A fresh service simulates the app reopening the job list.
    let mut fresh = list_service(conn);
    fresh.load_job(job.uuid).unwrap()
}

#[test]
fn append_to_empty_list_then_reload_returns_it() {
    let conn = setup();
    let job = create_job(&conn);
    let task = create_task(&conn, &job, "X");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, task.uuid).unwrap();
    assert_eq!(lists.sequence(job.uuid), vec![task.uuid]);
    assert_eq!(reload_sequence(&conn, &job), vec![task.uuid]);
}

#[test]
fn insert_after_lands_between_anchor_and_successor() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let c = create_task(&conn, &job, "C");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();
    lists.insert_after(job.uuid, c.uuid, Some(a.uuid)).unwrap();

    assert_eq!(lists.sequence(job.uuid), vec![a.uuid, c.uuid, b.uuid]);

    let key_a = lists.key_of(job.uuid, a.uuid).unwrap();
    let key_b = lists.key_of(job.uuid, b.uuid).unwrap();
    let key_c = lists.key_of(job.uuid, c.uuid).unwrap();
    assert!(key_a < key_c && key_c < key_b);
}

#[test]
fn stacked_inserts_after_same_anchor_land_newest_first() {
    // Inserting after A always targets the slot directly behind A, so the
    // newest insertion sits closest to the anchor.
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let c1 = create_task(&conn, &job, "C1");
    let c2 = create_task(&conn, &job, "C2");
    let c3 = create_task(&conn, &job, "C3");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();
    for task in [&c1, &c2, &c3] {
        lists.insert_after(job.uuid, task.uuid, Some(a.uuid)).unwrap();
    }

    let expected = vec![a.uuid, c3.uuid, c2.uuid, c1.uuid, b.uuid];
    assert_eq!(lists.sequence(job.uuid), expected);
    assert_eq!(reload_sequence(&conn, &job), expected);
}

#[test]
fn append_at_bottom_then_reload() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let x = create_task(&conn, &job, "X");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();
    lists.append(job.uuid, x.uuid).unwrap();

    let expected = vec![a.uuid, b.uuid, x.uuid];
    assert_eq!(lists.sequence(job.uuid), expected);
    assert_eq!(reload_sequence(&conn, &job), expected);
}

#[test]
fn hundred_inserts_at_one_boundary_preserve_order() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();

    let mut expected = vec![a.uuid, b.uuid];
    for index in 0..100 {
        let task = create_task(&conn, &job, &format!("wedge-{index}"));
        lists.insert_after(job.uuid, task.uuid, Some(a.uuid)).unwrap();
        expected.insert(1, task.uuid);
        assert_eq!(lists.sequence(job.uuid), expected, "after insert {index}");
    }

    assert_eq!(reload_sequence(&conn, &job), expected);
}

#[test]
fn insert_at_head_goes_before_current_first() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let head = create_task(&conn, &job, "head");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, a.uuid).unwrap();
    lists.insert_after(job.uuid, head.uuid, None).unwrap();

    assert_eq!(lists.sequence(job.uuid), vec![head.uuid, a.uuid]);
}

#[test]
fn move_after_reassigns_a_fresh_key() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let c = create_task(&conn, &job, "C");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();
    lists.append(job.uuid, c.uuid).unwrap();

    let old_key = lists.key_of(job.uuid, c.uuid).unwrap().clone();
    let new_key = lists.move_after(job.uuid, c.uuid, Some(a.uuid)).unwrap();

    assert_ne!(old_key, new_key);
    assert_eq!(lists.sequence(job.uuid), vec![a.uuid, c.uuid, b.uuid]);
    assert_eq!(reload_sequence(&conn, &job), vec![a.uuid, c.uuid, b.uuid]);
}

#[test]
fn move_to_head_with_none_anchor() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let mut lists = list_service(&conn);

    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();
    lists.move_after(job.uuid, b.uuid, None).unwrap();

    assert_eq!(lists.sequence(job.uuid), vec![b.uuid, a.uuid]);
}

#[test]
fn move_rejects_self_anchor_and_unknown_anchor() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let mut lists = list_service(&conn);
    lists.append(job.uuid, a.uuid).unwrap();

    let err = lists
        .move_after(job.uuid, a.uuid, Some(a.uuid))
        .unwrap_err();
    assert!(matches!(err, ListServiceError::SelfAnchor(id) if id == a.uuid));

    let ghost = Uuid::new_v4();
    let err = lists.move_after(job.uuid, a.uuid, Some(ghost)).unwrap_err();
    assert!(matches!(err, ListServiceError::AnchorNotFound(id) if id == ghost));

    // The failed move must leave the order intact.
    assert_eq!(lists.sequence(job.uuid), vec![a.uuid]);
}

#[test]
fn insert_after_unknown_anchor_is_rejected() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let mut lists = list_service(&conn);

    let ghost = Uuid::new_v4();
    let err = lists
        .insert_after(job.uuid, a.uuid, Some(ghost))
        .unwrap_err();
    assert!(matches!(err, ListServiceError::AnchorNotFound(id) if id == ghost));
    assert!(lists.sequence(job.uuid).is_empty());
}

#[test]
fn reload_matches_after_mixed_history() {
    let conn = setup();
    let job = create_job(&conn);
    let mut lists = list_service(&conn);

    let tasks: Vec<Task> = (0..8)
        .map(|index| create_task(&conn, &job, &format!("task-{index}")))
        .collect();

    for task in &tasks[..5] {
        lists.append(job.uuid, task.uuid).unwrap();
    }
    lists
        .insert_after(job.uuid, tasks[5].uuid, Some(tasks[1].uuid))
        .unwrap();
    lists
        .insert_after(job.uuid, tasks[6].uuid, None)
        .unwrap();
    lists
        .move_after(job.uuid, tasks[0].uuid, Some(tasks[4].uuid))
        .unwrap();
    lists.remove(job.uuid, tasks[2].uuid).unwrap();
    lists.append(job.uuid, tasks[7].uuid).unwrap();

    let in_memory = lists.sequence(job.uuid);
    assert_eq!(reload_sequence(&conn, &job), in_memory);

    // Loading twice in a row is idempotent.
    let mut fresh = list_service(&conn);
    let first = fresh.load_job(job.uuid).unwrap();
    let second = fresh.load_job(job.uuid).unwrap();
    assert_eq!(first, second);
}

#[test]
fn failed_write_rolls_back_the_in_memory_insert() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let blocked = create_task(&conn, &job, "blocked");
    let mut lists = list_service(&conn);
    lists.append(job.uuid, a.uuid).unwrap();

    conn.execute_batch(&format!(
        "CREATE TRIGGER task_positions_fail_insert_test
         BEFORE INSERT ON task_positions
         WHEN NEW.task_uuid = '{}'
         BEGIN
             SELECT RAISE(ABORT, 'forced write failure');
         END;",
        blocked.uuid
    ))
    .unwrap();

    let err = lists.append(job.uuid, blocked.uuid).unwrap_err();
    assert!(matches!(err, ListServiceError::Store(_)));

    // In-memory order must match the last successfully persisted state.
    assert_eq!(lists.sequence(job.uuid), vec![a.uuid]);
    assert_eq!(reload_sequence(&conn, &job), vec![a.uuid]);
}

#[test]
fn failed_write_rolls_back_the_in_memory_move() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let mut lists = list_service(&conn);
    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();
    let key_before = lists.key_of(job.uuid, b.uuid).unwrap().clone();

    conn.execute_batch(&format!(
        "CREATE TRIGGER task_positions_fail_update_test
         BEFORE UPDATE OF position ON task_positions
         WHEN NEW.task_uuid = '{}'
         BEGIN
             SELECT RAISE(ABORT, 'forced move failure');
         END;",
        b.uuid
    ))
    .unwrap();

    let err = lists.move_after(job.uuid, b.uuid, None).unwrap_err();
    assert!(matches!(err, ListServiceError::Store(_)));

    assert_eq!(lists.sequence(job.uuid), vec![a.uuid, b.uuid]);
    assert_eq!(lists.key_of(job.uuid, b.uuid), Some(&key_before));
}

#[test]
fn rebalance_rewrites_short_keys_and_keeps_order() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let mut lists = list_service(&conn);
    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();

    // Pile keys up at one boundary, then rebalance explicitly.
    for index in 0..40 {
        let task = create_task(&conn, &job, &format!("wedge-{index}"));
        lists.insert_after(job.uuid, task.uuid, Some(a.uuid)).unwrap();
    }
    let before = lists.sequence(job.uuid);

    let rewritten = lists.rebalance(job.uuid).unwrap();
    assert_eq!(rewritten, before.len());
    assert_eq!(lists.sequence(job.uuid), before);
    assert_eq!(reload_sequence(&conn, &job), before);

    for task in &before {
        let key = lists.key_of(job.uuid, *task).unwrap();
        assert!(key.digits() <= 2, "rebalanced key `{key}` should be short");
    }
}

#[test]
fn key_growth_triggers_automatic_rebalance() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let policy = RebalancePolicy { max_key_digits: 6 };
    let mut lists = ListService::with_policy(
        SqlitePositionRepository::try_new(&conn).unwrap(),
        policy,
    );
    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();

    let mut expected = vec![a.uuid, b.uuid];
    for index in 0..60 {
        let task = create_task(&conn, &job, &format!("wedge-{index}"));
        lists.insert_after(job.uuid, task.uuid, Some(a.uuid)).unwrap();
        expected.insert(1, task.uuid);
    }

    assert_eq!(lists.sequence(job.uuid), expected);
    assert_eq!(reload_sequence(&conn, &job), expected);

    // The policy keeps every key within a small multiple of the bound.
    for task in &expected {
        let key = lists.key_of(job.uuid, *task).unwrap();
        assert!(
            key.digits() <= policy.max_key_digits + 1,
            "key `{key}` exceeded the rebalance bound"
        );
    }
}

#[test]
fn failed_rebalance_changes_nothing() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let mut lists = list_service(&conn);
    lists.append(job.uuid, a.uuid).unwrap();
    lists.append(job.uuid, b.uuid).unwrap();

    let keys_before: Vec<PositionKey> = [a.uuid, b.uuid]
        .iter()
        .map(|task| lists.key_of(job.uuid, *task).unwrap().clone())
        .collect();

    conn.execute_batch(
        "CREATE TRIGGER task_positions_fail_delete_test
         BEFORE DELETE ON task_positions
         BEGIN
             SELECT RAISE(ABORT, 'forced rebalance failure');
         END;",
    )
    .unwrap();

    let err = lists.rebalance(job.uuid).unwrap_err();
    assert!(matches!(err, ListServiceError::Store(_)));

    // Neither memory nor storage may hold a partially rebalanced list.
    assert_eq!(lists.sequence(job.uuid), vec![a.uuid, b.uuid]);
    let keys_after: Vec<PositionKey> = [a.uuid, b.uuid]
        .iter()
        .map(|task| lists.key_of(job.uuid, *task).unwrap().clone())
        .collect();
    assert_eq!(keys_before, keys_after);

    conn.execute_batch("DROP TRIGGER task_positions_fail_delete_test;")
        .unwrap();
    assert_eq!(reload_sequence(&conn, &job), vec![a.uuid, b.uuid]);
}

#[test]
fn stale_load_is_discarded() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let mut lists = list_service(&conn);
    lists.append(job.uuid, a.uuid).unwrap();

    let stale = lists.begin_load(job.uuid);
    let newer = lists.begin_load(job.uuid);

    // The stale load resolves last-started-wins: its (empty) result must
    // not clobber the order claimed by the newer load.
    let outcome = lists.complete_load(stale, Vec::new()).unwrap();
    assert_eq!(outcome, LoadOutcome::Superseded);
    assert_eq!(lists.sequence(job.uuid), vec![a.uuid]);

    let pairs = vec![(a.uuid, lists.key_of(job.uuid, a.uuid).unwrap().clone())];
    let outcome = lists.complete_load(newer, pairs).unwrap();
    assert_eq!(outcome, LoadOutcome::Applied);
    assert_eq!(lists.sequence(job.uuid), vec![a.uuid]);
}

#[test]
fn load_rejects_tied_keys_as_corrupt() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let b = create_task(&conn, &job, "B");
    let mut lists = list_service(&conn);

    let tied = PositionKey::parse("i").unwrap();
    let ticket = lists.begin_load(job.uuid);
    let err = lists
        .complete_load(ticket, vec![(a.uuid, tied.clone()), (b.uuid, tied)])
        .unwrap_err();
    assert!(matches!(err, ListServiceError::CorruptOrder(_)));
}

#[test]
fn duplicate_insert_of_same_task_is_rejected() {
    let conn = setup();
    let job = create_job(&conn);
    let a = create_task(&conn, &job, "A");
    let mut lists = list_service(&conn);
    lists.append(job.uuid, a.uuid).unwrap();

    let err = lists.append(job.uuid, a.uuid).unwrap_err();
    assert!(matches!(err, ListServiceError::DuplicateTask(id) if id == a.uuid));
    assert_eq!(lists.sequence(job.uuid), vec![a.uuid]);
}
