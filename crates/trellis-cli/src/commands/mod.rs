//! One module per subcommand. Each exposes an `execute` function that the
//! dispatcher in `main.rs` calls.

pub mod check;
pub mod completions;
pub mod config;
pub mod init;
pub mod new;
pub mod plan;
pub mod render;
