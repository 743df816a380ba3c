//! Next-task selection and project progress summary.
//!
//! Both are pure functions over the task list.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use super::{Task, TaskStatus};

fn done_ids(tasks: &[Task]) -> HashSet<u64> {
    tasks
        .iter()
        .filter(|t| t.status.is_done())
        .map(|t| t.id)
        .collect()
}

/// Select the single best task to work on next.
///
/// Eligible tasks are pending or in progress with every dependency done.
/// Among them the highest priority wins, then the fewest dependencies, then
/// the lowest id. Returns `None` when nothing is eligible.
pub fn find_next_task(tasks: &[Task]) -> Option<&Task> {
    let done = done_ids(tasks);

    tasks
        .iter()
        .filter(|t| t.status.is_workable())
        .filter(|t| t.dependencies.iter().all(|d| done.contains(d)))
        .min_by_key(|t| (Reverse(t.priority.weight()), t.dependencies.len(), t.id))
}

/// Progress and dependency figures for a task list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub total: usize,
    pub done: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub blocked: usize,
    pub deferred: usize,
    pub completion_percent: f64,
    pub total_subtasks: usize,
    pub done_subtasks: usize,
    pub subtask_completion_percent: f64,
    /// Unfinished tasks without dependencies.
    pub no_dependencies: usize,
    /// Unfinished tasks that can start now (no deps, or all deps done).
    pub ready: usize,
    /// Unfinished tasks waiting on at least one unfinished dependency.
    pub blocked_by_dependencies: usize,
    /// `(task id, number of dependents)`; lowest id wins ties.
    pub most_depended_on: Option<(u64, usize)>,
    pub avg_dependencies: f64,
}

impl ProjectSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let done = tasks.iter().filter(|t| t.status.is_done()).count();

        let total_subtasks: usize = tasks.iter().map(|t| t.subtasks.len()).sum();
        let done_subtasks = tasks
            .iter()
            .flat_map(|t| &t.subtasks)
            .filter(|s| s.status.is_done())
            .count();

        let done_set = done_ids(tasks);
        let open: Vec<&Task> = tasks.iter().filter(|t| !t.status.is_done()).collect();
        let no_dependencies = open.iter().filter(|t| t.dependencies.is_empty()).count();
        let satisfied = open
            .iter()
            .filter(|t| !t.dependencies.is_empty())
            .filter(|t| t.dependencies.iter().all(|d| done_set.contains(d)))
            .count();
        let blocked_by_dependencies = open
            .iter()
            .filter(|t| t.dependencies.iter().any(|d| !done_set.contains(d)))
            .count();

        let mut dependents: BTreeMap<u64, usize> = BTreeMap::new();
        for dep in tasks.iter().flat_map(|t| &t.dependencies) {
            *dependents.entry(*dep).or_default() += 1;
        }
        let most_depended_on = dependents
            .into_iter()
            .fold(None, |best: Option<(u64, usize)>, (id, n)| match best {
                Some((_, max)) if max >= n => best,
                _ => Some((id, n)),
            });

        let total_deps: usize = tasks.iter().map(|t| t.dependencies.len()).sum();

        Self {
            total: tasks.len(),
            done,
            in_progress: count(TaskStatus::InProgress),
            pending: count(TaskStatus::Pending),
            blocked: count(TaskStatus::Blocked),
            deferred: count(TaskStatus::Deferred),
            completion_percent: percent(done, tasks.len()),
            total_subtasks,
            done_subtasks,
            subtask_completion_percent: percent(done_subtasks, total_subtasks),
            no_dependencies,
            ready: no_dependencies + satisfied,
            blocked_by_dependencies,
            most_depended_on,
            avg_dependencies: if tasks.is_empty() {
                0.0
            } else {
                total_deps as f64 / tasks.len() as f64
            },
        }
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
