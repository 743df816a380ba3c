use std::collections::HashSet;

use proptest::prelude::*;
use proptest::test_runner::Config;
use serde_json::json;
use taskmaster::task::{
    find_dependency_issues, find_next_task, is_task_dependent_on, validate_and_fix, Document,
    Metadata, Priority, Subtask, SubtaskDraft, Task, TaskRef, TaskStatus, TaskStore,
};
use taskmaster::Error;

fn status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Blocked),
        Just(TaskStatus::Deferred),
    ]
}

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::High), Just(Priority::Medium), Just(Priority::Low)]
}

fn subtasks() -> impl Strategy<Value = Vec<Subtask>> {
    prop::collection::vec((status(), prop::collection::vec(0_u64..6, 0..3)), 0..4).prop_map(
        |subs| {
            subs.into_iter()
                .enumerate()
                .map(|(i, (status, deps))| {
                    Subtask::new(i as u64 + 1, format!("Subtask {}", i + 1))
                        .with_status(status)
                        .with_dependencies(deps)
                })
                .collect()
        },
    )
}

/// Task lists with ids `1..=n` and arbitrary, possibly invalid, edges.
/// With `acyclic` every task only depends on lower ids.
fn task_lists(max: usize, acyclic: bool) -> impl Strategy<Value = Vec<Task>> {
    (1..=max).prop_flat_map(move |n| {
        let fields = (
            status(),
            priority(),
            prop::collection::vec(0_u64..(n as u64 + 3), 0..4),
            subtasks(),
        );
        prop::collection::vec(fields, n).prop_map(move |fields| {
            fields
                .into_iter()
                .enumerate()
                .map(|(i, (status, priority, deps, subtasks))| {
                    let id = i as u64 + 1;
                    let deps = if acyclic {
                        deps.into_iter().filter(|d| *d >= 1 && *d < id).collect()
                    } else {
                        deps
                    };
                    Task::new(id, format!("Task {}", id))
                        .with_status(status)
                        .with_priority(priority)
                        .with_dependencies(deps)
                        .with_subtasks(subtasks)
                })
                .collect()
        })
    })
}

fn store_of(tasks: Vec<Task>) -> TaskStore {
    TaskStore::from_document(Document::new(tasks, Metadata::default()), "tasks.json")
}

fn ids_are_unique(tasks: &[Task]) -> bool {
    let mut seen = HashSet::new();
    tasks.iter().all(|t| seen.insert(t.id))
        && tasks.iter().all(|t| {
            let mut subs = HashSet::new();
            t.subtasks.iter().all(|s| subs.insert(s.id))
        })
}

proptest! {
    #![proptest_config(Config::with_cases(128))]

    #[test]
    fn dependency_repair_is_idempotent(mut tasks in task_lists(8, false)) {
        validate_and_fix(&mut tasks);
        prop_assert!(find_dependency_issues(&tasks).is_empty());

        let repaired = tasks.clone();
        prop_assert!(validate_and_fix(&mut tasks).is_clean());
        prop_assert_eq!(tasks, repaired);
    }

    #[test]
    fn next_task_is_ready_and_ranked_first(tasks in task_lists(8, false)) {
        let done: HashSet<u64> = tasks.iter().filter(|t| t.status.is_done()).map(|t| t.id).collect();
        let ready = |t: &Task| t.status.is_workable() && t.dependencies.iter().all(|d| done.contains(d));
        let rank = |t: &Task| (std::cmp::Reverse(t.priority.weight()), t.dependencies.len(), t.id);

        match find_next_task(&tasks) {
            Some(next) => {
                prop_assert!(ready(next));
                for other in tasks.iter().filter(|t| ready(t)) {
                    prop_assert!(rank(next) <= rank(other));
                }
            }
            None => prop_assert!(!tasks.iter().any(|t| ready(t))),
        }

        let first = find_next_task(&tasks).map(|t| t.id);
        prop_assert_eq!(find_next_task(&tasks).map(|t| t.id), first);
    }

    #[test]
    fn mutators_keep_ids_unique(
        tasks in task_lists(6, true),
        parent in 1_u64..7,
        moved in 1_u64..7,
        sub in 1_u64..4,
    ) {
        let mut store = store_of(tasks);
        store.insert_task(Task::new(0, "Inserted"));
        prop_assert!(ids_are_unique(store.tasks()));

        let _ = store.promote_subtask_to_task(&TaskRef::Subtask { parent, sub }, true);
        prop_assert!(ids_are_unique(store.tasks()));

        let _ = store.demote_task_to_subtask(parent, moved);
        prop_assert!(ids_are_unique(store.tasks()));

        let _ = store.add_subtask(parent, SubtaskDraft::new("Added"));
        prop_assert!(ids_are_unique(store.tasks()));
    }

    #[test]
    fn update_preserves_identity_status_and_subtasks(
        tasks in task_lists(5, false),
        pick in 0_usize..5,
        title in "[a-z ]{1,20}",
    ) {
        let mut store = store_of(tasks);
        let id = store.tasks()[pick % store.tasks().len()].id;
        let before = store.task(id).unwrap().clone();

        let patch = json!({
            "id": id + 100,
            "title": title.clone(),
            "status": "done",
            "subtasks": [],
        });
        let after = store.update_task(id, &patch).unwrap().clone();

        prop_assert_eq!(after.id, before.id);
        prop_assert_eq!(after.status, before.status);
        prop_assert_eq!(after.subtasks, before.subtasks);
        prop_assert_eq!(after.title, title);
    }

    #[test]
    fn demote_never_links_related_tasks(
        tasks in task_lists(6, true),
        parent in 1_u64..7,
        moved in 1_u64..7,
    ) {
        let mut store = store_of(tasks);
        let before = store.tasks().to_vec();
        let related = is_task_dependent_on(&before, parent, moved)
            || is_task_dependent_on(&before, moved, parent);

        match store.demote_task_to_subtask(parent, moved) {
            Ok(TaskRef::Subtask { parent: owner, sub }) => {
                prop_assert!(!related);
                prop_assert!(parent != moved);
                prop_assert_eq!(owner, parent);
                prop_assert!(store.tasks().iter().all(|t| t.id != moved));
                prop_assert!(store.tasks().iter().all(|t| !t.dependencies.contains(&moved)));

                let title = format!("Task {}", moved);
                let old_subs = &before.iter().find(|t| t.id == parent).unwrap().subtasks;
                let new_subs = &store.task(parent).unwrap().subtasks;
                prop_assert_eq!(new_subs.len(), old_subs.len() + 1);
                prop_assert_eq!(new_subs.iter().filter(|s| s.title == title).count(), 1);
                prop_assert_eq!(&new_subs.iter().find(|s| s.id == sub).unwrap().title, &title);
            }
            Ok(other) => prop_assert!(false, "demotion returned a task ref: {}", other),
            Err(Error::StructuralViolation(_)) | Err(Error::NotFound(_)) => {
                prop_assert_eq!(store.tasks(), before.as_slice());
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    #[test]
    fn promote_leaves_one_representation(
        tasks in task_lists(6, true),
        parent in 1_u64..7,
        sub in 1_u64..4,
    ) {
        let mut store = store_of(tasks);
        let before = store.tasks().to_vec();
        let target = TaskRef::Subtask { parent, sub };

        match store.promote_subtask_to_task(&target, true) {
            Ok(new_id) => {
                let old_parent = before.iter().find(|t| t.id == parent).unwrap();
                let title = old_parent.subtask(sub).unwrap().title.clone();

                prop_assert_eq!(store.tasks().len(), before.len() + 1);
                prop_assert!(before.iter().all(|t| t.id != new_id));
                prop_assert!(store.task(parent).unwrap().subtask(sub).is_none());
                prop_assert_eq!(
                    store.task(parent).unwrap().subtasks.len(),
                    old_parent.subtasks.len() - 1
                );

                let promoted = store.task(new_id).unwrap();
                prop_assert_eq!(&promoted.title, &title);
                prop_assert!(promoted.dependencies.contains(&parent));
                prop_assert!(ids_are_unique(store.tasks()));
            }
            Err(Error::StructuralViolation(_)) | Err(Error::NotFound(_)) => {
                prop_assert_eq!(store.tasks(), before.as_slice());
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
