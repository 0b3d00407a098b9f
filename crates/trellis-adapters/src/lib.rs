//! Infrastructure adapters for Trellis.
//!
//! This crate implements the ports defined in `trellis-core::application::ports`.
//! It contains all external dependencies and I/O operations: the disk,
//! child processes and PATH lookups. The in-memory and scripted variants
//! back the orchestration tests.

pub mod filesystem;
pub mod probe;
pub mod process;
pub mod prompt;

// Re-export commonly used adapters
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use probe::{StaticProbe, SystemProbe};
pub use process::{ProcessRunner, ScriptedRunner};
pub use prompt::FixedPrompter;
