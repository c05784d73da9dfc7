//! Library half of the `solstice` CLI binary — kept separate from `main.rs`
//! so argument parsing and pipeline wiring can be exercised by tests without
//! spawning a process.

mod cli;

pub use cli::{run_cli, Cli, CliError, CliTarget};
