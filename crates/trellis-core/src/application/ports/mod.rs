//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `trellis-adapters` and the CLI
//! implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: File, directory and link operations on the project root
//!   - `CommandRunner`: External process execution
//!   - `ToolProbe`: PATH lookup and version queries
//!   - `Prompter`: Yes/no confirmations
//!   - `RunObserver`: Step progress notifications

pub mod output;

pub use output::{
    CommandRunner, EntryKind, Filesystem, NoopObserver, Prompter, RunObserver, ToolProbe,
    run_checked,
};

#[cfg(test)]
pub use output::{MockCommandRunner, MockFilesystem, MockPrompter, MockToolProbe};
