//! Task complexity report.
//!
//! The report is a derived artifact with its own file. The task graph never
//! depends on it; expansion commands read it for recommended subtask counts
//! and prompts.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{read_json, write_json};
use crate::error::Result;

pub const DEFAULT_REPORT_PATH: &str = "scripts/task-complexity-report.json";

/// Score at or above which a task counts as highly complex.
pub const HIGH_COMPLEXITY: u8 = 8;
/// Score at or above which a task counts as medium complexity.
pub const MEDIUM_COMPLEXITY: u8 = 5;

/// One analyzed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    pub task_id: u64,
    #[serde(default)]
    pub title: String,
    /// 1 to 10.
    pub complexity_score: u8,
    #[serde(default)]
    pub justification: String,
    #[serde(default)]
    pub recommended_subtasks: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion_prompt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMeta {
    pub generated_at: DateTime<Utc>,
    pub tasks_analyzed: usize,
    pub threshold_score: f64,
    pub project_name: String,
    pub used_research: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub meta: ReportMeta,
    pub complexity_analysis: Vec<AnalysisEntry>,
}

/// How many entries fall in each complexity band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComplexityBuckets {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl ComplexityReport {
    pub fn load(path: &Path) -> Result<Self> {
        let report = read_json(path)?;
        tracing::debug!("Loaded complexity report from {}", path.display());
        Ok(report)
    }

    /// Load the report if the file exists and parses; otherwise `None`.
    pub fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load(path) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Ignoring unreadable complexity report: {}", e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self)
    }

    pub fn entry_for(&self, task_id: u64) -> Option<&AnalysisEntry> {
        self.complexity_analysis.iter().find(|e| e.task_id == task_id)
    }

    pub fn buckets(&self) -> ComplexityBuckets {
        let mut buckets = ComplexityBuckets::default();
        for entry in &self.complexity_analysis {
            match entry.complexity_score {
                s if s >= HIGH_COMPLEXITY => buckets.high += 1,
                s if s >= MEDIUM_COMPLEXITY => buckets.medium += 1,
                _ => buckets.low += 1,
            }
        }
        buckets
    }

    /// Task ids ordered from most to least complex; ties keep report order.
    pub fn expansion_order(&self) -> Vec<u64> {
        let mut entries: Vec<&AnalysisEntry> = self.complexity_analysis.iter().collect();
        entries.sort_by(|a, b| b.complexity_score.cmp(&a.complexity_score));
        entries.into_iter().map(|e| e.task_id).collect()
    }
}
