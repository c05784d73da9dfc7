//! Thin binary entry point. All argument parsing and pipeline wiring lives
//! in the library crate so it stays testable without spawning a process.
//!
//! # Exit codes
//!
//! - `0` - success
//! - `1` - any error (parse failure, analyzer/checker diagnostics, I/O)

fn main() {
    env_logger::init();
    if let Err(e) = transpiler_cli::run_cli() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
