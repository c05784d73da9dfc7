//! Argument parsing and dispatch for the `solstice` command-line tool.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;
use transpiler_core::{compile, CompileOptions, Target};

#[derive(Parser)]
#[command(name = "solstice")]
#[command(about = "Compiles a source file to its target lowering", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Source file to compile.
    pub input: PathBuf,

    /// Target dialect of the emitted output.
    #[arg(long, value_enum, default_value_t = CliTarget::Luau)]
    pub target: CliTarget,

    /// Reclassify every warning as an error before reporting.
    #[arg(long)]
    pub warnings_as_errors: bool,

    /// Truncate error diagnostics (not warnings) past this count.
    #[arg(long)]
    pub max_errors: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliTarget {
    Luau,
    Lua,
}

impl From<CliTarget> for Target {
    fn from(t: CliTarget) -> Self {
        match t {
            CliTarget::Luau => Target::Luau,
            CliTarget::Lua => Target::Lua,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("{0}")]
    Diagnostics(String),
}

pub fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let source = fs::read_to_string(&cli.input).map_err(|source| CliError::Read { path: cli.input.clone(), source })?;

    let opts = CompileOptions::default()
        .with_target(cli.target.into())
        .with_filename(cli.input.display().to_string());
    let mut opts = opts;
    opts.warnings_as_errors = cli.warnings_as_errors;
    opts.max_errors = cli.max_errors;

    let (output, diagnostics) = compile(&source, Some(opts));
    let report = diagnostics.format();
    if !report.is_empty() {
        eprint!("{report}");
    }

    match output {
        Some(code) => {
            print!("{code}");
            Ok(())
        }
        None => Err(CliError::Diagnostics(format!("compilation of '{}' failed", cli.input.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_target_maps_to_core_target() {
        assert_eq!(Target::from(CliTarget::Luau), Target::Luau);
        assert_eq!(Target::from(CliTarget::Lua), Target::Lua);
    }
}
