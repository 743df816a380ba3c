//! Core Task type, status and priority enums, and task references.
//!
//! # Invariants
//! - `id` is unique within a [`Document`](super::Document)
//! - `dependencies` never contains `id` and holds no duplicates once the
//!   dependency validator has run
//! - subtask ids are unique within `subtasks`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::subtask::Subtask;
use crate::error::Error;

/// Status of a task or subtask in its lifecycle.
///
/// `Done` and `Completed` are synonyms; both satisfy dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Completed,
    Blocked,
    Deferred,
}

impl TaskStatus {
    /// Check if the status is one of the "done" variants.
    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Completed)
    }

    /// Check if work on the task may start or continue.
    ///
    /// # Property
    /// `is_workable() => !is_done()`
    pub fn is_workable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Deferred => "deferred",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" | "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            "deferred" => Ok(TaskStatus::Deferred),
            other => Err(Error::InvalidInput(format!("unknown status '{}'", other))),
        }
    }
}

/// Task priority. Unknown values read from disk are treated as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Scheduling weight: high=3, medium=2, low=1.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    /// Parse a priority, returning `None` for unrecognised values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        Priority::parse(&value).unwrap_or_default()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to either a task or a subtask.
///
/// The external form is `"7"` for a task and `"7.2"` for subtask 2 of task 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRef {
    Task(u64),
    Subtask { parent: u64, sub: u64 },
}

impl TaskRef {
    /// The top-level task id this reference lives under.
    pub fn task_id(&self) -> u64 {
        match self {
            TaskRef::Task(id) => *id,
            TaskRef::Subtask { parent, .. } => *parent,
        }
    }

    /// Parse a comma-separated list such as `"1, 2.3,4"`.
    pub fn parse_list(input: &str) -> Result<Vec<TaskRef>, Error> {
        input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl FromStr for TaskRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse_id = |part: &str| -> Result<u64, Error> {
            match part.trim().parse::<u64>() {
                Ok(id) if id > 0 => Ok(id),
                _ => Err(Error::InvalidInput(format!(
                    "invalid task id '{}'; expected \"id\" or \"parentId.subtaskId\"",
                    s
                ))),
            }
        };

        match s.split_once('.') {
            Some((parent, sub)) => Ok(TaskRef::Subtask {
                parent: parse_id(parent)?,
                sub: parse_id(sub)?,
            }),
            None => Ok(TaskRef::Task(parse_id(s)?)),
        }
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Task(id) => write!(f, "{}", id),
            TaskRef::Subtask { parent, sub } => write!(f, "{}.{}", parent, sub),
        }
    }
}

/// A top-level unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub dependencies: Vec<u64>,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub test_strategy: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Create a pending, medium-priority task with no dependencies.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            dependencies: Vec::new(),
            details: String::new(),
            test_strategy: String::new(),
            subtasks: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<u64>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_subtasks(mut self, subtasks: Vec<Subtask>) -> Self {
        self.subtasks = subtasks;
        self
    }

    pub fn subtask(&self, sub: u64) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == sub)
    }

    pub fn subtask_mut(&mut self, sub: u64) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == sub)
    }

    /// Next free subtask id: highest existing id + 1, or 1.
    pub fn next_subtask_id(&self) -> u64 {
        self.subtasks.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    /// Check if every subtask is done (vacuously true without subtasks).
    pub fn all_subtasks_done(&self) -> bool {
        self.subtasks.iter().all(|s| s.status.is_done())
    }
}
