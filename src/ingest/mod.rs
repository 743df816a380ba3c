//! Turning free-form model output into validated task records.
//!
//! A generation request flows through four stages:
//!
//! ```text
//!   prompt ──► completion (retried) ──► extract JSON ──► validate ──► records
//! ```
//!
//! Extraction recovers the outermost JSON object or array from prose; the
//! validator coerces loosely typed fields and fills defaults. Nothing here
//! writes to disk.

pub mod extract;
pub mod generator;
pub mod prompts;
pub mod validate;

pub use extract::{BracketExtractor, Extraction, ResponseExtractor, Shape};
pub use generator::Generator;
pub use validate::{GeneratedTasks, TaskDraft};
