mod support;

use support::{at, done, home, pending, snapshot};
use taskkeep::model::{archival_id, sort_tasks, Snapshot, TaskRecord, TaskStatus};
use taskkeep::reconcile::reconcile;

#[test]
fn rollover_archives_completion_and_marks_live_task_recurring() {
    let previous = snapshot(vec![done("t1", "Pay rent", at(0))]);
    let fresh = snapshot(vec![pending("t1", "Pay rent")]);
    let detected = at(7200);

    let result = reconcile(&previous, &fresh, detected);

    assert_eq!(result.rollovers.len(), 1);
    let event = &result.rollovers[0];
    let expected_id = archival_id("t1", detected);
    assert_eq!(event.source_task.id, expected_id);
    assert_eq!(event.original_id(), "t1");
    assert_eq!(event.source_task.completed_at, Some(at(0)));
    assert!(event.replacement_task.is_recurring);

    let archived = result.merged.get(&expected_id).expect("archival record");
    assert!(archived.is_archived);
    assert!(archived.is_recurring);
    assert_eq!(archived.status, TaskStatus::Completed);

    let live = result.merged.get("t1").expect("live record");
    assert_eq!(live.status, TaskStatus::NeedsAction);
    assert!(live.is_recurring);
    assert!(!live.is_archived);
}

#[test]
fn reconciling_a_snapshot_with_itself_is_identity() {
    let archival = done("t1", "Pay rent", at(0)).archival_copy(at(50));
    let mut state = snapshot(vec![
        archival.clone(),
        pending("t1", "Pay rent").with_recurring(true),
        done("t2", "Call mum", at(10)),
        pending("t3", "Buy milk").with_due(at(86_400)),
    ]);
    state.pending_archive.insert(archival.id.clone());

    let result = reconcile(&state, &state, at(100));

    assert!(result.rollovers.is_empty());
    assert_eq!(result.merged, state);
}

#[test]
fn reconciling_with_same_remote_again_changes_nothing() {
    let previous = snapshot(vec![
        done("t1", "Pay rent", at(0)),
        done("t2", "Call mum", at(10)),
        pending("t3", "Buy milk"),
    ]);
    let fresh = snapshot(vec![
        pending("t1", "Pay rent"),
        done("t2", "Call mum", at(10)),
        pending("t3", "Buy milk"),
        pending("t4", "New chore"),
    ]);

    let first = reconcile(&previous, &fresh, at(100));
    let second = reconcile(&first.merged, &fresh, at(200));

    assert_eq!(first.rollovers.len(), 1);
    assert!(second.rollovers.is_empty());
    assert_eq!(second.merged, first.merged);
}

#[test]
fn completed_tasks_missing_remotely_are_retained_as_archived() {
    let previous = snapshot(vec![done("t1", "Old report", at(0)), pending("t2", "Abandoned")]);
    let fresh = snapshot(Vec::new());

    let result = reconcile(&previous, &fresh, at(100));

    let kept = result.merged.get("t1").expect("completed task kept");
    assert!(kept.is_archived);
    assert!(!result.merged.contains("t2"));
    assert!(result.rollovers.is_empty());
}

#[test]
fn archival_records_survive_every_later_run() {
    let previous = snapshot(vec![done("t1", "Pay rent", at(0))]);
    let first = reconcile(&previous, &snapshot(vec![pending("t1", "Pay rent")]), at(100));
    let archived_id = first.rollovers[0].source_task.id.clone();

    let mut merged = first.merged;
    for step in 0..3 {
        merged = reconcile(&merged, &snapshot(Vec::new()), at(200 + step)).merged;
    }

    assert!(merged.contains(&archived_id));
    assert!(!merged.contains("t1"));
}

#[test]
fn recurring_flag_survives_remote_updates() {
    let previous = snapshot(vec![pending("t1", "Pay rent").with_recurring(true)]);
    let mut renamed = pending("t1", "Pay the rent");
    renamed.updated_at = at(9000);
    let fresh = snapshot(vec![renamed]);

    let merged = reconcile(&previous, &fresh, at(9100)).merged;
    let live = merged.get("t1").unwrap();
    assert_eq!(live.title, "Pay the rent");
    assert!(live.is_recurring);
}

#[test]
fn empty_previous_takes_remote_as_is() {
    let fresh = snapshot(vec![done("t1", "Done", at(0)), pending("t2", "Open")]);
    let result = reconcile(&Snapshot::empty(), &fresh, at(100));

    assert!(result.rollovers.is_empty());
    assert_eq!(result.merged.tasks, fresh.tasks);
    assert_eq!(result.merged.lists.get("home"), Some(&home()));
}

#[test]
fn presentation_order_is_newest_first() {
    let a = done("a", "A", at(0));
    let b = done("b", "B", at(200));
    let mut c = TaskRecord::needs_action("c", "C", &home(), at(100));
    c.completed_at = None;

    let mut tasks = vec![a, b, c];
    sort_tasks(&mut tasks);
    let ids: Vec<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(ids, ["b", "c", "a"]);
}
