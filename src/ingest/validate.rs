//! Validation and normalization of extracted model output.
//!
//! Each shape has its own entry point. Structural problems (wrong top-level
//! type, missing required field, nothing usable left) are errors; everything
//! else is repaired with defaults and a warning.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::task::{AnalysisEntry, Metadata, Priority, Subtask, Task, TaskStatus};

pub const DEFAULT_SUBTASK_DETAILS: &str = "Implement this subtask.";
pub const DEFAULT_SUBTASK_TEST_STRATEGY: &str = "Verify functionality.";

/// Tasks parsed from a PRD response.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTasks {
    pub tasks: Vec<Task>,
    /// Metadata the model supplied, if any.
    pub metadata: Option<Metadata>,
}

/// Content fields of a generated single task; the caller stamps id, status,
/// priority and dependencies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub details: String,
    pub test_strategy: String,
}

impl TaskDraft {
    pub fn into_task(self, id: u64, priority: Priority, dependencies: Vec<u64>) -> Task {
        Task {
            description: self.description,
            details: self.details,
            test_strategy: self.test_strategy,
            ..Task::new(id, self.title)
                .with_priority(priority)
                .with_dependencies(dependencies)
        }
    }
}

fn malformed(reason: impl Into<String>, value: &Value) -> Error {
    Error::malformed(reason, value.to_string())
}

/// Positive integer id from a JSON number or numeric string.
pub fn coerce_id(value: &Value) -> Option<u64> {
    let id = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f > 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.filter(|id| *id > 0)
}

/// Subtask dependency: a number, a numeric string, or `"P.S"` for a sibling
/// under the same parent `P`.
pub fn coerce_subtask_dependency(value: &Value, parent_id: u64) -> Option<u64> {
    if let Value::String(s) = value {
        if let Some((parent, sub)) = s.trim().split_once('.') {
            return match (parent.parse::<u64>(), sub.parse::<u64>()) {
                (Ok(p), Ok(sub)) if p == parent_id && sub > 0 => Some(sub),
                _ => None,
            };
        }
    }
    coerce_id(value)
}

fn coerce_list(value: Option<&Value>, coerce: impl Fn(&Value) -> Option<u64>, owner: &str) -> Vec<u64> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let coerced = coerce(item);
            if coerced.is_none() {
                tracing::warn!("Dropping unreadable dependency {} of {}", item, owner);
            }
            coerced
        })
        .collect()
}

pub fn coerce_status(value: Option<&Value>) -> TaskStatus {
    match value.and_then(Value::as_str) {
        None => TaskStatus::Pending,
        Some(s) => s.parse().unwrap_or_else(|_| {
            tracing::warn!("Unknown status '{}', using pending", s);
            TaskStatus::Pending
        }),
    }
}

pub fn coerce_priority(value: Option<&Value>) -> Priority {
    match value.and_then(Value::as_str) {
        None => Priority::Medium,
        Some(s) => Priority::parse(s).unwrap_or_else(|| {
            tracing::warn!("Unknown priority '{}', using medium", s);
            Priority::Medium
        }),
    }
}

/// String field; numbers and booleans are stringified, anything else is empty.
fn text(record: &Map<String, Value>, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => v.to_string(),
        _ => String::new(),
    }
}

fn non_empty(value: String, default: impl FnOnce() -> String) -> String {
    if value.is_empty() {
        default()
    } else {
        value
    }
}

/// Validate a PRD response of shape `{"tasks": [...], "metadata": {...}}`.
///
/// Missing or duplicate ids are reassigned past the highest id seen. A count
/// different from `expected` is logged, not rejected.
pub fn validate_task_list(value: &Value, expected: usize) -> Result<GeneratedTasks> {
    let Some(items) = value.get("tasks").and_then(Value::as_array) else {
        return Err(malformed("response is missing the required \"tasks\" array", value));
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(record) = item else {
            return Err(malformed(format!("task at index {} is not an object", index), value));
        };
        records.push(record);
    }

    let mut seen = HashSet::new();
    let proposed: Vec<Option<u64>> = records
        .iter()
        .map(|r| r.get("id").and_then(coerce_id).filter(|id| seen.insert(*id)))
        .collect();
    let mut next_free = seen.iter().max().copied().unwrap_or(0) + 1;

    let tasks: Vec<Task> = records
        .into_iter()
        .zip(proposed)
        .map(|(record, id)| {
            let id = id.unwrap_or_else(|| {
                let assigned = next_free;
                next_free += 1;
                tracing::warn!("Task without a usable id; assigned {}", assigned);
                assigned
            });
            let owner = format!("task {}", id);
            Task {
                description: text(record, "description"),
                status: coerce_status(record.get("status")),
                priority: coerce_priority(record.get("priority")),
                dependencies: coerce_list(record.get("dependencies"), coerce_id, &owner),
                details: text(record, "details"),
                test_strategy: text(record, "testStrategy"),
                ..Task::new(id, text(record, "title"))
            }
        })
        .collect();

    if tasks.len() != expected {
        tracing::warn!(
            "Expected {} tasks, but received {}. Continuing anyway.",
            expected,
            tasks.len()
        );
    }

    let metadata = value.get("metadata").and_then(Value::as_object).map(|m| Metadata {
        project_name: Some(text(m, "projectName")).filter(|s| !s.is_empty()),
        source_file: Some(text(m, "sourceFile")).filter(|s| !s.is_empty()),
        generated_at: None,
        total_tasks: m.get("totalTasks").and_then(coerce_id).map(|n| n as usize),
    });

    tracing::info!("Successfully parsed {} tasks from AI response", tasks.len());
    Ok(GeneratedTasks { tasks, metadata })
}

/// Validate a subtask array for `parent_id`.
///
/// Elements without a title are skipped. Survivors get sequential ids from
/// `start_id`, whatever the model proposed. Fails only when nothing survives.
pub fn validate_subtasks(
    value: &Value,
    start_id: u64,
    expected: usize,
    parent_id: u64,
) -> Result<Vec<Subtask>> {
    let Some(items) = value.as_array() else {
        return Err(malformed("subtask response is not an array", value));
    };

    let mut subtasks = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let record = match item {
            Value::Object(record) if !text(record, "title").is_empty() => record,
            _ => {
                tracing::warn!("Skipping invalid subtask structure at index {}: {}", index, item);
                continue;
            }
        };

        let id = start_id + subtasks.len() as u64;
        let title = text(record, "title");
        let owner = format!("subtask {}.{}", parent_id, id);
        subtasks.push(Subtask {
            description: non_empty(text(record, "description"), || format!("Subtask for {}", title)),
            status: coerce_status(record.get("status")),
            priority: coerce_priority(record.get("priority")),
            dependencies: coerce_list(
                record.get("dependencies"),
                |d| coerce_subtask_dependency(d, parent_id),
                &owner,
            ),
            details: non_empty(text(record, "details"), || DEFAULT_SUBTASK_DETAILS.into()),
            test_strategy: non_empty(text(record, "testStrategy"), || {
                DEFAULT_SUBTASK_TEST_STRATEGY.into()
            }),
            ..Subtask::new(id, title)
        });
    }

    if subtasks.is_empty() {
        return Err(malformed("no valid subtasks found in AI response", value));
    }
    if subtasks.len() != expected {
        tracing::warn!(
            "Expected {} subtasks, but parsed {}.",
            expected,
            subtasks.len()
        );
    }

    tracing::info!("Successfully parsed {} subtasks", subtasks.len());
    Ok(subtasks)
}

/// Validate a single generated task object; `title` is required.
pub fn validate_task_draft(value: &Value) -> Result<TaskDraft> {
    let Some(record) = value.as_object() else {
        return Err(malformed("task response is not an object", value));
    };
    let title = text(record, "title");
    if title.is_empty() {
        return Err(malformed("task response is missing a title", value));
    }

    Ok(TaskDraft {
        title,
        description: text(record, "description"),
        details: text(record, "details"),
        test_strategy: text(record, "testStrategy"),
    })
}

/// Validate `{"complexityAnalysis": [...]}`.
///
/// Entries without a task id or score are skipped; scores are clamped to 1..=10.
pub fn validate_complexity(value: &Value) -> Result<Vec<AnalysisEntry>> {
    let Some(items) = value.get("complexityAnalysis").and_then(Value::as_array) else {
        return Err(malformed(
            "expected format is {\"complexityAnalysis\": [...]}",
            value,
        ));
    };

    let entries: Vec<AnalysisEntry> = items
        .iter()
        .filter_map(|item| {
            let entry = analysis_entry(item);
            if entry.is_none() {
                tracing::warn!("Skipping unreadable complexity entry: {}", item);
            }
            entry
        })
        .collect();

    Ok(entries)
}

fn analysis_entry(item: &Value) -> Option<AnalysisEntry> {
    let record = item.as_object()?;
    let task_id = record.get("taskId").and_then(coerce_id)?;
    let score = match record.get("complexityScore")? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    Some(AnalysisEntry {
        task_id,
        title: text(record, "title"),
        complexity_score: score.round().clamp(1.0, 10.0) as u8,
        justification: text(record, "justification"),
        recommended_subtasks: record
            .get("recommendedSubtasks")
            .and_then(coerce_id)
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0),
        expansion_prompt: Some(text(record, "expansionPrompt")).filter(|s| !s.is_empty()),
    })
}

/// Normalize one generated task update into `(task id, patch)`.
///
/// The patch keeps only fields a task record understands, with id,
/// dependencies and priority coerced into their canonical forms.
pub fn normalize_task_patch(value: &Value) -> Result<(u64, Value)> {
    let Some(record) = value.as_object() else {
        return Err(malformed("task update is not an object", value));
    };
    let Some(id) = record.get("id").and_then(coerce_id) else {
        return Err(malformed("task update has no usable id", value));
    };

    let mut patch = Map::new();
    patch.insert("id".into(), id.into());
    for key in ["title", "description", "details", "testStrategy"] {
        if record.contains_key(key) {
            patch.insert(key.into(), text(record, key).into());
        }
    }
    if record.contains_key("priority") {
        patch.insert(
            "priority".into(),
            coerce_priority(record.get("priority")).as_str().into(),
        );
    }
    if record.contains_key("dependencies") {
        let owner = format!("task {}", id);
        let deps = coerce_list(record.get("dependencies"), coerce_id, &owner);
        patch.insert("dependencies".into(), deps.into());
    }

    Ok((id, Value::Object(patch)))
}
