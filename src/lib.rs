//! # taskmaster
//!
//! Task graph manager with AI-assisted task generation.
//!
//! This library provides:
//! - A persisted forest of tasks and subtasks with dependency edges
//! - Dependency validation, cycle checks and a deterministic next-task scheduler
//! - A generation pipeline that turns model output into validated records
//!
//! ## Architecture
//!
//! ```text
//!   command ──► Generator ──────────────► TaskStore ──► tasks.json
//!                 │                          │
//!                 ├─ CompletionClient        ├─ dependencies (repair, cycles)
//!                 ├─ RetryPolicy             └─ scheduler (next task)
//!                 ├─ ResponseExtractor
//!                 └─ validate
//! ```
//!
//! ## Modules
//! - `task`: Data model, store, dependency rules, scheduler, complexity report
//! - `ingest`: Prompts, extraction, validation and the generation pipeline
//! - `llm`: Completion client trait, OpenRouter client, retry policy
//! - `commands`: One function per command, load → generate → merge → save

pub mod commands;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod task;
pub mod util;

#[cfg(test)]
pub(crate) mod test_logs;

pub use config::{Config, GenerationConfig};
pub use error::{Error, Result};
pub use ingest::Generator;
pub use task::{Task, TaskRef, TaskStatus, TaskStore};
