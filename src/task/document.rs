//! The persisted tasks document and JSON file helpers.
//!
//! The whole document is read at the start of a command and written back
//! wholesale at the end. There is no locking; a second concurrent writer
//! simply wins.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::Task;
use crate::error::{Error, Result};

/// Project-level information stored next to the task list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_generated_at"
    )]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tasks: Option<usize>,
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (read as UTC
/// midnight). Anything else is dropped instead of failing the whole document.
fn deserialize_generated_at<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(Value::String(text)) = value else {
        return Ok(None);
    };
    let text = text.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(at.with_timezone(&Utc)));
    }
    match NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        Some(midnight) => Ok(Some(midnight.and_utc())),
        None => {
            tracing::warn!("Ignoring unreadable generatedAt value '{}'", text);
            Ok(None)
        }
    }
}

/// `{ tasks: [...], metadata: {...} }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    pub fn new(tasks: Vec<Task>, metadata: Metadata) -> Self {
        Self { tasks, metadata }
    }

    pub fn task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn contains(&self, id: u64) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }
}

/// Read and deserialize a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&contents).map_err(|source| Error::Document {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize to pretty JSON and replace the file, creating parent directories.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let contents = serde_json::to_string_pretty(value).map_err(|source| Error::Document {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(path, contents).map_err(|e| Error::io(path, e))?;
    tracing::debug!("Saved {}", path.display());
    Ok(())
}
