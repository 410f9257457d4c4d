//! CLI module

mod commands;
mod progress;

pub use commands::{CarveArgs, Cli, Commands, parse_max_size, parse_size};
pub use progress::ProgressReporter;
