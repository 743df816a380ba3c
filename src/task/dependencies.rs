//! Dependency edge validation and repair.
//!
//! Invalid edges are dropped rather than rejected: a dependency on a
//! missing id, a self-reference, or a repeated edge. Repairs are reported
//! through logging and a [`DependencyRepairs`] tally.
//!
//! Subtask dependencies resolve locally first: a value matching a sibling
//! subtask id names that sibling, anything else names a top-level task.

use std::collections::HashSet;

use super::{Subtask, Task, TaskRef};

/// Why a dependency edge is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    SelfReference,
    MissingTarget,
    Duplicate,
}

/// One invalid edge found by [`find_dependency_issues`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyIssue {
    pub owner: TaskRef,
    pub dependency: u64,
    pub kind: IssueKind,
}

/// Counts of edges removed by [`validate_and_fix`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyRepairs {
    pub self_references: usize,
    pub missing_targets: usize,
    pub duplicates: usize,
}

impl DependencyRepairs {
    pub fn total(&self) -> usize {
        self.self_references + self.missing_targets + self.duplicates
    }

    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    fn record(&mut self, kind: IssueKind) {
        match kind {
            IssueKind::SelfReference => self.self_references += 1,
            IssueKind::MissingTarget => self.missing_targets += 1,
            IssueKind::Duplicate => self.duplicates += 1,
        }
    }
}

/// Classify each dependency of one owner, in order. `None` means the edge is valid.
fn classify(
    own_id: u64,
    dependencies: &[u64],
    resolves: impl Fn(u64) -> bool,
) -> Vec<Option<IssueKind>> {
    let mut seen = HashSet::new();
    dependencies
        .iter()
        .map(|&dep| {
            if dep == own_id {
                Some(IssueKind::SelfReference)
            } else if !resolves(dep) {
                Some(IssueKind::MissingTarget)
            } else if !seen.insert(dep) {
                Some(IssueKind::Duplicate)
            } else {
                None
            }
        })
        .collect()
}

fn subtask_dep_resolves(task_ids: &HashSet<u64>, siblings: &[Subtask], dep: u64) -> bool {
    siblings.iter().any(|s| s.id == dep) || task_ids.contains(&dep)
}

/// List every invalid edge without changing anything.
pub fn find_dependency_issues(tasks: &[Task]) -> Vec<DependencyIssue> {
    let task_ids: HashSet<u64> = tasks.iter().map(|t| t.id).collect();
    let mut issues = Vec::new();

    for task in tasks {
        let kinds = classify(task.id, &task.dependencies, |d| task_ids.contains(&d));
        for (dep, kind) in task.dependencies.iter().zip(kinds) {
            if let Some(kind) = kind {
                issues.push(DependencyIssue {
                    owner: TaskRef::Task(task.id),
                    dependency: *dep,
                    kind,
                });
            }
        }

        for sub in &task.subtasks {
            let kinds = classify(sub.id, &sub.dependencies, |d| {
                subtask_dep_resolves(&task_ids, &task.subtasks, d)
            });
            for (dep, kind) in sub.dependencies.iter().zip(kinds) {
                if let Some(kind) = kind {
                    issues.push(DependencyIssue {
                        owner: TaskRef::Subtask {
                            parent: task.id,
                            sub: sub.id,
                        },
                        dependency: *dep,
                        kind,
                    });
                }
            }
        }
    }

    issues
}

/// Drop every invalid edge across tasks and subtasks.
///
/// Running it twice in a row reports no repairs the second time.
pub fn validate_and_fix(tasks: &mut [Task]) -> DependencyRepairs {
    let task_ids: HashSet<u64> = tasks.iter().map(|t| t.id).collect();
    let mut repairs = DependencyRepairs::default();

    for task in tasks.iter_mut() {
        let kinds = classify(task.id, &task.dependencies, |d| task_ids.contains(&d));
        task.dependencies = retain_valid(
            TaskRef::Task(task.id),
            &task.dependencies,
            &kinds,
            &mut repairs,
        );

        let sibling_snapshot = task.subtasks.clone();
        for sub in task.subtasks.iter_mut() {
            let kinds = classify(sub.id, &sub.dependencies, |d| {
                subtask_dep_resolves(&task_ids, &sibling_snapshot, d)
            });
            let owner = TaskRef::Subtask {
                parent: task.id,
                sub: sub.id,
            };
            sub.dependencies = retain_valid(owner, &sub.dependencies, &kinds, &mut repairs);
        }
    }

    if repairs.is_clean() {
        tracing::debug!("No invalid dependencies found");
    } else {
        tracing::info!(
            "Fixed {} invalid dependencies ({} self, {} missing, {} duplicate)",
            repairs.total(),
            repairs.self_references,
            repairs.missing_targets,
            repairs.duplicates
        );
    }

    repairs
}

fn retain_valid(
    owner: TaskRef,
    dependencies: &[u64],
    kinds: &[Option<IssueKind>],
    repairs: &mut DependencyRepairs,
) -> Vec<u64> {
    let mut kept = Vec::with_capacity(dependencies.len());
    for (&dep, kind) in dependencies.iter().zip(kinds) {
        match kind {
            None => kept.push(dep),
            Some(kind) => {
                tracing::warn!("Removing {:?} dependency {} from {}", kind, dep, owner);
                repairs.record(*kind);
            }
        }
    }
    kept
}

/// Check whether `task_id` transitively depends on `target`.
///
/// True when the task (or any of its subtasks) reaches `target` through a
/// direct edge, a chain of edges, or because a subtask's parent is `target`.
/// Pre-existing cycles terminate through a visited set.
pub fn is_task_dependent_on(tasks: &[Task], task_id: u64, target: u64) -> bool {
    let mut visited = HashSet::new();
    tasks
        .iter()
        .find(|t| t.id == task_id)
        .map(|task| task_reaches(tasks, task, target, &mut visited))
        .unwrap_or(false)
}

fn task_reaches(tasks: &[Task], task: &Task, target: u64, visited: &mut HashSet<TaskRef>) -> bool {
    if !visited.insert(TaskRef::Task(task.id)) {
        return false;
    }
    if task.dependencies.contains(&target) {
        return true;
    }
    for dep in &task.dependencies {
        if let Some(dep_task) = tasks.iter().find(|t| t.id == *dep) {
            if task_reaches(tasks, dep_task, target, visited) {
                return true;
            }
        }
    }
    task.subtasks
        .iter()
        .any(|sub| subtask_reaches(tasks, task, sub, target, visited))
}

fn subtask_reaches(
    tasks: &[Task],
    parent: &Task,
    sub: &Subtask,
    target: u64,
    visited: &mut HashSet<TaskRef>,
) -> bool {
    let key = TaskRef::Subtask {
        parent: parent.id,
        sub: sub.id,
    };
    if !visited.insert(key) {
        return false;
    }
    if parent.id == target {
        return true;
    }
    for dep in &sub.dependencies {
        if let Some(sibling) = parent.subtask(*dep) {
            if subtask_reaches(tasks, parent, sibling, target, visited) {
                return true;
            }
        } else if *dep == target {
            return true;
        } else if let Some(dep_task) = tasks.iter().find(|t| t.id == *dep) {
            if task_reaches(tasks, dep_task, target, visited) {
                return true;
            }
        }
    }
    false
}
