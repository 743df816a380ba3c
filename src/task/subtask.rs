//! Subtask definitions.
//!
//! A subtask is owned by exactly one task and its id is only unique within
//! that task's list. Dependencies may name a sibling subtask (local) or a
//! top-level task (global); a value matching a sibling id resolves locally.
//!
//! Older documents store subtask ids and dependencies as `"parent.sub"`
//! strings. Those load as the local part and are written back as numbers.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Priority, Task, TaskStatus};
use crate::ingest::validate::coerce_id;

/// A unit of work owned by a [`Task`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(deserialize_with = "deserialize_local_id")]
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "deserialize_local_ids")]
    pub dependencies: Vec<u64>,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub test_strategy: String,
}

/// `3`, `"3"` and `"4.3"` all name local id 3.
fn local_id(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => match s.trim().split_once('.') {
            Some((_, sub)) => sub.parse().ok().filter(|id| *id > 0),
            None => coerce_id(value),
        },
        _ => coerce_id(value),
    }
}

fn deserialize_local_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    local_id(&value).ok_or_else(|| D::Error::custom(format!("invalid subtask id {}", value)))
}

fn deserialize_local_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .iter()
        .filter_map(|value| {
            let id = local_id(value);
            if id.is_none() {
                tracing::warn!("Dropping unreadable subtask dependency {}", value);
            }
            id
        })
        .collect())
}

impl Subtask {
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
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<u64>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Turn a top-level task into a subtask with the given id.
    ///
    /// The task's own subtasks are not carried over; callers must reject
    /// tasks that still own subtasks.
    pub fn from_task(task: Task, id: u64) -> Self {
        Self {
            id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            dependencies: task.dependencies,
            details: task.details,
            test_strategy: task.test_strategy,
        }
    }

    /// Turn this subtask into a top-level task with the given id.
    ///
    /// Dependencies are copied verbatim; resolving sibling references is the
    /// caller's job.
    pub fn into_task(self, id: u64) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            dependencies: self.dependencies,
            details: self.details,
            test_strategy: self.test_strategy,
            subtasks: Vec::new(),
        }
    }
}

/// User-supplied fields for a new subtask, before an id is assigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubtaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub details: Option<String>,
    pub status: Option<TaskStatus>,
    pub dependencies: Vec<u64>,
}

impl SubtaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build the subtask, filling the defaults a freshly added subtask gets.
    pub fn into_subtask(self, id: u64) -> Subtask {
        Subtask {
            id,
            description: self.description.unwrap_or_default(),
            details: self.details.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            dependencies: self.dependencies,
            ..Subtask::new(id, self.title)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_subtask_conversion_keeps_content() {
        let task = Task::new(4, "Wire logging")
            .with_priority(Priority::High)
            .with_dependencies(vec![1, 2]);
        let sub = Subtask::from_task(task, 3);
        assert_eq!(sub.id, 3);
        assert_eq!(sub.priority, Priority::High);
        assert_eq!(sub.dependencies, vec![1, 2]);

        let back = sub.into_task(9);
        assert_eq!(back.id, 9);
        assert_eq!(back.title, "Wire logging");
        assert!(back.subtasks.is_empty());
    }

    #[test]
    fn test_dotted_ids_load_as_local_ids() {
        let raw = r#"{"id":4,"title":"API","subtasks":[
            {"id":"4.1","title":"Routes","dependencies":[]},
            {"id":"4.2","title":"Handlers","dependencies":["4.1",2,"3"]},
            {"id":3,"title":"Docs","dependencies":["x.y",null]}
        ]}"#;
        let task: Task = serde_json::from_str(raw).unwrap();

        let ids: Vec<u64> = task.subtasks.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(task.subtasks[1].dependencies, vec![1, 2, 3]);
        assert!(task.subtasks[2].dependencies.is_empty());

        let saved = serde_json::to_value(&task).unwrap();
        assert_eq!(saved["subtasks"][1]["id"], 2);
        assert_eq!(saved["subtasks"][1]["dependencies"], serde_json::json!([1, 2, 3]));

        let reloaded: Task = serde_json::from_value(saved).unwrap();
        assert_eq!(reloaded, task);
    }

    #[test]
    fn test_unreadable_subtask_id_is_rejected() {
        assert!(serde_json::from_str::<Subtask>(r#"{"id":"first","title":"a"}"#).is_err());
        assert!(serde_json::from_str::<Subtask>(r#"{"id":0,"title":"a"}"#).is_err());
    }

    #[test]
    fn test_draft_defaults() {
        let sub = SubtaskDraft::new("Write docs").into_subtask(2);
        assert_eq!(sub.id, 2);
        assert_eq!(sub.status, TaskStatus::Pending);
        assert_eq!(sub.priority, Priority::Medium);
        assert!(sub.description.is_empty());
    }
}
