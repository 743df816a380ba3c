//! Task graph store.
//!
//! Owns the in-memory [`Document`] for one command invocation and enforces
//! the structural invariants:
//! - task ids are unique across the document, assigned as `max + 1`
//! - subtask ids are unique within their parent, assigned as `max + 1`
//! - a mutation that fails leaves the document unchanged
//!
//! Multi-step mutations (batch status changes, promote, demote) are staged
//! on a copy of the task list and swapped in only when every step succeeded.

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::dependencies::{self, DependencyRepairs};
use super::document::{read_json, write_json};
use super::{Document, Subtask, SubtaskDraft, Task, TaskRef, TaskStatus};
use crate::error::{Error, Result};

/// Outcome of a single status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub target: TaskRef,
    pub previous: TaskStatus,
    pub status: TaskStatus,
    /// Subtasks marked done along with their parent.
    pub cascaded: usize,
    /// A subtask completion finished every sibling while the parent is still
    /// open. Advisory only; the parent is not touched.
    pub all_siblings_done: bool,
}

pub struct TaskStore {
    document: Document,
    path: PathBuf,
}

impl TaskStore {
    /// Load the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document: Document = read_json(path)?;
        tracing::info!(
            "Loaded {} tasks from {}",
            document.tasks.len(),
            path.display()
        );
        Ok(Self::from_document(document, path))
    }

    pub fn from_document(document: Document, path: impl Into<PathBuf>) -> Self {
        Self {
            document,
            path: path.into(),
        }
    }

    /// Write the whole document back to its path.
    pub fn save(&self) -> Result<()> {
        write_json(&self.path, &self.document)?;
        tracing::info!(
            "Wrote {} tasks to {}",
            self.document.tasks.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn tasks(&self) -> &[Task] {
        &self.document.tasks
    }

    pub fn task(&self, id: u64) -> Result<&Task> {
        self.document
            .task(id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))
    }

    fn task_mut(&mut self, id: u64) -> Result<&mut Task> {
        self.document
            .task_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", id)))
    }

    /// Highest task id + 1, or 1 for an empty document.
    pub fn next_task_id(&self) -> u64 {
        next_id(&self.document.tasks)
    }

    /// Append `task` under a fresh id and return that id.
    pub fn insert_task(&mut self, mut task: Task) -> u64 {
        let id = self.next_task_id();
        task.id = id;
        self.document.tasks.push(task);
        tracing::debug!("Inserted task {}", id);
        id
    }

    /// Shallow-merge `patch` over task `id`.
    ///
    /// `id`, `status` and `subtasks` always keep their existing values, so a
    /// generated patch can never revert progress.
    pub fn update_task(&mut self, id: u64, patch: &Value) -> Result<&Task> {
        let existing = self.task(id)?.clone();
        let Value::Object(fields) = patch else {
            return Err(Error::malformed(
                format!("update for task {} is not an object", id),
                patch.to_string(),
            ));
        };

        let mut merged = serde_json::to_value(&existing)
            .map_err(|e| Error::malformed(e.to_string(), patch.to_string()))?;
        if let Value::Object(target) = &mut merged {
            for (key, value) in fields {
                if matches!(key.as_str(), "id" | "status" | "subtasks") {
                    continue;
                }
                target.insert(key.clone(), value.clone());
            }
        }

        let mut updated: Task = serde_json::from_value(merged).map_err(|e| {
            Error::malformed(
                format!("update for task {} does not fit a task record: {}", id, e),
                patch.to_string(),
            )
        })?;
        updated.id = existing.id;
        updated.status = existing.status;
        updated.subtasks = existing.subtasks;

        let slot = self.task_mut(id)?;
        *slot = updated;
        tracing::debug!("Updated task {}", id);
        Ok(&*slot)
    }

    /// Set the status of a task or subtask.
    ///
    /// Marking a task done also marks each of its unfinished subtasks done.
    pub fn set_status(&mut self, target: &TaskRef, status: TaskStatus) -> Result<StatusChange> {
        apply_status(&mut self.document.tasks, target, status)
    }

    /// Apply one status to a comma-separated list of refs such as `"1,2.3"`.
    ///
    /// Either every ref is updated or none is.
    pub fn set_status_many(&mut self, refs: &str, status: TaskStatus) -> Result<Vec<StatusChange>> {
        let targets = TaskRef::parse_list(refs)?;
        if targets.is_empty() {
            return Err(Error::InvalidInput("no task ids given".into()));
        }

        let mut staged = self.document.tasks.clone();
        let changes = targets
            .iter()
            .map(|target| apply_status(&mut staged, target, status))
            .collect::<Result<Vec<_>>>()?;

        self.document.tasks = staged;
        Ok(changes)
    }

    /// Append generated subtasks to a task.
    ///
    /// Fails without changes if any id collides with an existing or another
    /// incoming subtask.
    pub fn attach_subtasks(&mut self, task_id: u64, subtasks: Vec<Subtask>) -> Result<usize> {
        let task = self.task_mut(task_id)?;

        let mut ids: Vec<u64> = task.subtasks.iter().map(|s| s.id).collect();
        for sub in &subtasks {
            if ids.contains(&sub.id) {
                return Err(Error::StructuralViolation(format!(
                    "Subtask id {}.{} already exists",
                    task_id, sub.id
                )));
            }
            ids.push(sub.id);
        }

        let count = subtasks.len();
        task.subtasks.extend(subtasks);
        tracing::info!("Attached {} subtasks to task {}", count, task_id);
        Ok(count)
    }

    /// Create a new subtask under `parent` from user-supplied fields.
    pub fn add_subtask(&mut self, parent: u64, draft: SubtaskDraft) -> Result<TaskRef> {
        let task = self.task_mut(parent)?;
        let sub = task.next_subtask_id();
        task.subtasks.push(draft.into_subtask(sub));
        tracing::info!("Created new subtask {}.{}", parent, sub);
        Ok(TaskRef::Subtask { parent, sub })
    }

    /// Delete a subtask and return it.
    ///
    /// Sibling edges pointing at it are dropped so they cannot be misread as
    /// task ids later.
    pub fn remove_subtask(&mut self, target: &TaskRef) -> Result<Subtask> {
        let (parent, sub) = subtask_parts(target)?;
        let task = self.task_mut(parent)?;
        let removed = take_subtask(task, sub)?;
        retarget_sibling_edges(task, sub, None);
        tracing::info!("Subtask {}.{} deleted", parent, sub);
        Ok(removed)
    }

    /// Remove every subtask of each listed task. Returns how many tasks were
    /// cleared; unknown ids are skipped with a warning.
    pub fn clear_subtasks(&mut self, ids: &[u64]) -> usize {
        let mut cleared = 0;
        for id in ids {
            match self.document.task_mut(*id) {
                None => tracing::warn!("Task {} not found", id),
                Some(task) if task.subtasks.is_empty() => {
                    tracing::info!("Task {} has no subtasks to clear", id)
                }
                Some(task) => {
                    tracing::info!("Cleared {} subtasks from task {}", task.subtasks.len(), id);
                    task.subtasks.clear();
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// Turn subtask `parent.sub` into a new top-level task and return its id.
    ///
    /// The new task takes the parent's priority. Edges to siblings cannot be
    /// expressed between tasks and are dropped; with
    /// `inherit_dependency_on_parent` the parent becomes a dependency instead.
    /// Siblings that depended on the subtask now depend on the new task.
    ///
    /// Rejected when the carried-over dependencies lead back to the new task
    /// through those retargeted sibling edges.
    pub fn promote_subtask_to_task(
        &mut self,
        target: &TaskRef,
        inherit_dependency_on_parent: bool,
    ) -> Result<u64> {
        let (parent_id, sub_id) = subtask_parts(target)?;
        let mut staged = self.document.tasks.clone();
        let new_id = next_id(&staged);

        let parent = staged
            .iter_mut()
            .find(|t| t.id == parent_id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", parent_id)))?;
        let subtask = take_subtask(parent, sub_id)?;
        let priority = parent.priority;

        let mut task = subtask.into_task(new_id);
        task.priority = priority;
        task.dependencies.retain(|dep| {
            let local = parent.subtask(*dep).is_some();
            if local {
                tracing::warn!(
                    "Dropping sibling dependency {}.{} from promoted task {}",
                    parent_id,
                    dep,
                    new_id
                );
            }
            !local
        });
        retarget_sibling_edges(parent, sub_id, Some(new_id));
        staged.push(task);

        if dependencies::is_task_dependent_on(&staged, new_id, new_id) {
            return Err(Error::StructuralViolation(format!(
                "Converting subtask {} would create a circular dependency",
                target
            )));
        }

        // Added after the guard: the former parent still owns the siblings
        // that now wait on the new task.
        if inherit_dependency_on_parent {
            if let Some(task) = staged.iter_mut().find(|t| t.id == new_id) {
                if !task.dependencies.contains(&parent_id) {
                    task.dependencies.push(parent_id);
                }
            }
        }

        self.document.tasks = staged;
        tracing::info!("Created new task {} from subtask {}", new_id, target);
        Ok(new_id)
    }

    /// Move top-level task `task_id` under `parent_id` as a new subtask.
    ///
    /// Rejected when the two tasks already reach each other through
    /// dependencies or parentage, or when the task owns subtasks of its own.
    /// Edges from other tasks to the moved task are dropped.
    pub fn demote_task_to_subtask(&mut self, parent_id: u64, task_id: u64) -> Result<TaskRef> {
        if parent_id == task_id {
            return Err(Error::StructuralViolation(
                "Cannot make a task a subtask of itself".into(),
            ));
        }
        self.task(parent_id)?;
        let moved = self.task(task_id)?;
        if !moved.subtasks.is_empty() {
            return Err(Error::StructuralViolation(format!(
                "Task {} has its own subtasks and cannot become a subtask",
                task_id
            )));
        }

        let tasks = &self.document.tasks;
        if dependencies::is_task_dependent_on(tasks, parent_id, task_id)
            || dependencies::is_task_dependent_on(tasks, task_id, parent_id)
        {
            return Err(Error::StructuralViolation(format!(
                "Cannot create circular dependency: tasks {} and {} already depend on each other",
                parent_id, task_id
            )));
        }

        let mut staged = tasks.clone();
        let index = staged
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", task_id)))?;
        let task = staged.remove(index);
        drop_task_edges(&mut staged, task_id);

        let parent = staged
            .iter_mut()
            .find(|t| t.id == parent_id)
            .ok_or_else(|| Error::NotFound(format!("Task {}", parent_id)))?;
        let sub = parent.next_subtask_id();
        parent.subtasks.push(Subtask::from_task(task, sub));

        self.document.tasks = staged;
        tracing::info!("Converted task {} to subtask {}.{}", task_id, parent_id, sub);
        Ok(TaskRef::Subtask {
            parent: parent_id,
            sub,
        })
    }

    /// Drop invalid dependency edges across the whole document.
    pub fn repair_dependencies(&mut self) -> DependencyRepairs {
        dependencies::validate_and_fix(&mut self.document.tasks)
    }
}

fn next_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

fn subtask_parts(target: &TaskRef) -> Result<(u64, u64)> {
    match target {
        TaskRef::Subtask { parent, sub } => Ok((*parent, *sub)),
        TaskRef::Task(id) => Err(Error::InvalidInput(format!(
            "'{}' is not a subtask id; expected \"parentId.subtaskId\"",
            id
        ))),
    }
}

fn take_subtask(task: &mut Task, sub: u64) -> Result<Subtask> {
    let index = task
        .subtasks
        .iter()
        .position(|s| s.id == sub)
        .ok_or_else(|| Error::NotFound(format!("Subtask {}.{}", task.id, sub)))?;
    Ok(task.subtasks.remove(index))
}

/// Point sibling edges at `old` to `new`, or drop them when `new` is `None`
/// or would itself be read as a sibling.
fn retarget_sibling_edges(task: &mut Task, old: u64, new: Option<u64>) {
    let sibling_ids: Vec<u64> = task.subtasks.iter().map(|s| s.id).collect();
    let new = new.filter(|id| !sibling_ids.contains(id));

    for sibling in task.subtasks.iter_mut() {
        let mut rewritten = Vec::with_capacity(sibling.dependencies.len());
        for dep in sibling.dependencies.drain(..) {
            match (dep == old, new) {
                (false, _) => rewritten.push(dep),
                (true, Some(id)) if !rewritten.contains(&id) => rewritten.push(id),
                (true, _) => {}
            }
        }
        sibling.dependencies = rewritten;
    }
}

/// Remove edges to a task id that no longer exists.
fn drop_task_edges(tasks: &mut [Task], removed: u64) {
    for task in tasks.iter_mut() {
        task.dependencies.retain(|d| *d != removed);
        let sibling_ids: Vec<u64> = task.subtasks.iter().map(|s| s.id).collect();
        for sub in task.subtasks.iter_mut() {
            sub.dependencies
                .retain(|d| *d != removed || sibling_ids.contains(d));
        }
    }
}

fn apply_status(tasks: &mut [Task], target: &TaskRef, status: TaskStatus) -> Result<StatusChange> {
    match *target {
        TaskRef::Task(id) => {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| Error::NotFound(format!("Task {}", id)))?;
            let previous = task.status;
            task.status = status;

            let mut cascaded = 0;
            if status.is_done() {
                for sub in task.subtasks.iter_mut().filter(|s| !s.status.is_done()) {
                    sub.status = status;
                    cascaded += 1;
                }
                if cascaded > 0 {
                    tracing::info!("Also marking {} subtasks as '{}'", cascaded, status);
                }
            }

            tracing::info!(
                "Updated task {} status from '{}' to '{}'",
                id,
                previous,
                status
            );
            Ok(StatusChange {
                target: *target,
                previous,
                status,
                cascaded,
                all_siblings_done: false,
            })
        }
        TaskRef::Subtask { parent, sub } => {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == parent)
                .ok_or_else(|| Error::NotFound(format!("Parent task {}", parent)))?;
            let subtask = task
                .subtask_mut(sub)
                .ok_or_else(|| Error::NotFound(format!("Subtask {}.{}", parent, sub)))?;
            let previous = subtask.status;
            subtask.status = status;

            let all_siblings_done =
                status.is_done() && task.all_subtasks_done() && !task.status.is_done();
            tracing::info!(
                "Updated subtask {}.{} status from '{}' to '{}'",
                parent,
                sub,
                previous,
                status
            );
            if all_siblings_done {
                tracing::info!(
                    "All subtasks of task {} are now done; consider marking it done",
                    parent
                );
            }

            Ok(StatusChange {
                target: *target,
                previous,
                status,
                cascaded: 0,
                all_siblings_done,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use serde_json::json;

    fn task(id: u64, deps: Vec<u64>) -> Task {
        Task::new(id, format!("Task {}", id)).with_dependencies(deps)
    }

    fn store(tasks: Vec<Task>) -> TaskStore {
        TaskStore::from_document(Document::new(tasks, Default::default()), "tasks.json")
    }

    fn with_subtasks(mut task: Task, n: u64) -> Task {
        task.subtasks = (1..=n).map(|i| Subtask::new(i, format!("s{}", i))).collect();
        task
    }

    #[test]
    fn test_insert_assigns_max_plus_one() {
        let mut store = store(vec![task(1, vec![]), task(5, vec![])]);
        assert_eq!(store.insert_task(Task::new(0, "new")), 6);
        assert_eq!(store.next_task_id(), 7);

        let mut empty = self::store(vec![]);
        assert_eq!(empty.insert_task(Task::new(99, "first")), 1);
    }

    #[test]
    fn test_update_preserves_status_and_subtasks() {
        let original = with_subtasks(task(1, vec![]), 2).with_status(TaskStatus::InProgress);
        let mut store = store(vec![original.clone()]);

        let patch = json!({
            "id": 7,
            "title": "Renamed",
            "status": "pending",
            "subtasks": [],
            "priority": "high"
        });
        let updated = store.update_task(1, &patch).unwrap();

        assert_eq!(updated.id, 1);
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.status, TaskStatus::InProgress);
        assert_eq!(updated.subtasks, original.subtasks);
        assert_eq!(updated.description, original.description);
    }

    #[test]
    fn test_update_rejects_ill_typed_patch() {
        let mut store = store(vec![task(1, vec![])]);
        let err = store.update_task(1, &json!({"dependencies": "two"})).unwrap_err();
        assert!(matches!(err, Error::MalformedOutput { .. }));
        assert!(matches!(
            store.update_task(3, &json!({})),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_done_cascades_to_subtasks() {
        let mut store = store(vec![with_subtasks(task(1, vec![]), 2)]);
        let change = store.set_status(&TaskRef::Task(1), TaskStatus::Done).unwrap();

        assert_eq!(change.cascaded, 2);
        assert!(store.tasks()[0]
            .subtasks
            .iter()
            .all(|s| s.status == TaskStatus::Done));
    }

    #[test]
    fn test_subtask_done_leaves_parent_alone() {
        let mut store = store(vec![with_subtasks(task(1, vec![]), 2)]);

        let first = store
            .set_status(&"1.1".parse().unwrap(), TaskStatus::Done)
            .unwrap();
        assert!(!first.all_siblings_done);

        let second = store
            .set_status(&"1.2".parse().unwrap(), TaskStatus::Done)
            .unwrap();
        assert!(second.all_siblings_done);
        assert_eq!(store.tasks()[0].status, TaskStatus::Pending);
    }

    #[test]
    fn test_set_status_many_is_all_or_nothing() {
        let mut store = store(vec![task(1, vec![]), with_subtasks(task(2, vec![]), 1)]);
        let before = store.document().clone();

        assert!(matches!(
            store.set_status_many("1,2.9", TaskStatus::Done),
            Err(Error::NotFound(_))
        ));
        assert_eq!(store.document(), &before);

        let changes = store.set_status_many("1, 2.1", TaskStatus::Done).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(store.tasks()[0].status, TaskStatus::Done);
    }

    #[test]
    fn test_attach_rejects_colliding_ids() {
        let mut store = store(vec![with_subtasks(task(1, vec![]), 2)]);
        let err = store
            .attach_subtasks(1, vec![Subtask::new(3, "a"), Subtask::new(2, "b")])
            .unwrap_err();
        assert!(matches!(err, Error::StructuralViolation(_)));
        assert_eq!(store.tasks()[0].subtasks.len(), 2);

        assert_eq!(
            store
                .attach_subtasks(1, vec![Subtask::new(3, "a"), Subtask::new(4, "b")])
                .unwrap(),
            2
        );
    }

    #[test]
    fn test_add_and_remove_subtask() {
        let mut store = store(vec![with_subtasks(task(1, vec![]), 2)]);
        let added = store.add_subtask(1, SubtaskDraft::new("third")).unwrap();
        assert_eq!(added, TaskRef::Subtask { parent: 1, sub: 3 });

        let dependent = Subtask::new(4, "depends on 1.2").with_dependencies(vec![2]);
        store.attach_subtasks(1, vec![dependent]).unwrap();

        let removed = store.remove_subtask(&"1.2".parse().unwrap()).unwrap();
        assert_eq!(removed.id, 2);
        let remaining = &store.tasks()[0].subtasks;
        assert_eq!(remaining.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 3, 4]);
        assert!(remaining[2].dependencies.is_empty());

        assert!(matches!(
            store.remove_subtask(&TaskRef::Task(1)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_clear_subtasks_skips_missing() {
        let mut store = store(vec![with_subtasks(task(1, vec![]), 2), task(2, vec![])]);
        assert_eq!(store.clear_subtasks(&[1, 2, 9]), 1);
        assert!(store.tasks()[0].subtasks.is_empty());
    }

    #[test]
    fn test_promote_subtask() {
        let mut parent = with_subtasks(task(5, vec![1]), 3).with_priority(Priority::High);
        parent.subtasks[1].dependencies = vec![1, 1];
        parent.subtasks[2].dependencies = vec![2];
        let mut store = store(vec![task(1, vec![]), parent]);

        let new_id = store
            .promote_subtask_to_task(&"5.2".parse().unwrap(), true)
            .unwrap();
        assert_eq!(new_id, 6);

        let promoted = store.task(6).unwrap();
        assert_eq!(promoted.priority, Priority::High);
        assert_eq!(promoted.dependencies, vec![5]);

        let parent = store.task(5).unwrap();
        assert_eq!(parent.subtasks.len(), 2);
        assert!(parent.subtask(2).is_none());
        assert_eq!(parent.subtask(3).unwrap().dependencies, vec![6]);
    }

    #[test]
    fn test_promote_subtask_in_sibling_chain() {
        let mut parent = with_subtasks(task(1, vec![]), 3);
        parent.subtasks[1].dependencies = vec![1];
        parent.subtasks[2].dependencies = vec![2];
        let mut store = store(vec![parent]);

        let new_id = store
            .promote_subtask_to_task(&"1.2".parse().unwrap(), true)
            .unwrap();
        assert_eq!(new_id, 2);
        assert_eq!(store.task(2).unwrap().dependencies, vec![1]);

        let parent = store.task(1).unwrap();
        let ids: Vec<u64> = parent.subtasks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(parent.subtask(3).unwrap().dependencies, vec![2]);
    }

    #[test]
    fn test_promote_rejects_loop_through_dependent_sibling() {
        let mut parent = with_subtasks(task(1, vec![]), 2);
        parent.subtasks[0].dependencies = vec![5];
        parent.subtasks[1].dependencies = vec![1];
        let mut store = store(vec![parent, task(5, vec![1])]);
        let before = store.document().clone();

        let err = store
            .promote_subtask_to_task(&"1.1".parse().unwrap(), true)
            .unwrap_err();
        assert!(matches!(err, Error::StructuralViolation(_)));
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn test_promote_missing_subtask_changes_nothing() {
        let mut store = store(vec![with_subtasks(task(1, vec![]), 1)]);
        let before = store.document().clone();
        assert!(matches!(
            store.promote_subtask_to_task(&"1.5".parse().unwrap(), false),
            Err(Error::NotFound(_))
        ));
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn test_demote_task() {
        let mut store = store(vec![
            with_subtasks(task(1, vec![]), 1),
            task(2, vec![]),
            task(3, vec![2]),
        ]);

        let moved = store.demote_task_to_subtask(1, 2).unwrap();
        assert_eq!(moved, TaskRef::Subtask { parent: 1, sub: 2 });
        assert!(store.task(2).is_err());
        assert_eq!(store.task(1).unwrap().subtasks.len(), 2);
        assert!(store.task(3).unwrap().dependencies.is_empty());
    }

    #[test]
    fn test_demote_rejects_cycles() {
        let mut store = store(vec![task(1, vec![2]), task(2, vec![]), task(3, vec![1])]);
        let before = store.document().clone();

        for (parent, child) in [(1, 2), (2, 1), (3, 2), (1, 1)] {
            let err = store.demote_task_to_subtask(parent, child).unwrap_err();
            assert!(matches!(err, Error::StructuralViolation(_)), "{} <- {}", parent, child);
        }
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let mut store = TaskStore::from_document(
            Document::new(vec![task(1, vec![])], Default::default()),
            &path,
        );
        store.insert_task(Task::new(0, "second"));
        store.save().unwrap();

        let loaded = TaskStore::load(&path).unwrap();
        assert_eq!(loaded.tasks().len(), 2);
        assert_eq!(loaded.task(2).unwrap().title, "second");
    }
}
