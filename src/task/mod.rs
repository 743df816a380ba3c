//! Task module - the task forest, its persisted document and graph rules.
//!
//! - `task`/`subtask`: the records and their identifiers
//! - `store`: the only place the document is mutated
//! - `dependencies`: edge repair and reachability
//! - `scheduler`: next-task selection
//! - `complexity`: the derived complexity report

pub mod complexity;
pub mod dependencies;
mod document;
pub mod scheduler;
pub mod store;
mod subtask;
#[allow(clippy::module_inception)]
pub mod task;

pub use complexity::{AnalysisEntry, ComplexityBuckets, ComplexityReport, ReportMeta};
pub use dependencies::{
    find_dependency_issues, is_task_dependent_on, validate_and_fix, DependencyIssue,
    DependencyRepairs, IssueKind,
};
pub use document::{Document, Metadata};
pub use scheduler::{find_next_task, ProjectSummary};
pub use store::{StatusChange, TaskStore};
pub use subtask::{Subtask, SubtaskDraft};
pub use task::{Priority, Task, TaskRef, TaskStatus};
