//! The `clike` command-line host: wires a CLIKE program to the filesystem, stdout and the
//! `log` facade, and reports any `ClikeError` as a single diagnostic line.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use log::error;

use clike::loader::FsSourceLoader;
use clike::sink::StdoutSink;
use clike::trace::Trace;

/// Routes each `Trace` channel to `log::debug!` only when its CLI flag was set, so
/// `--debug --scope --stack` toggle independently rather than all-or-nothing.
struct SelectiveTrace {
    debug: bool,
    scope: bool,
    stack: bool,
}

impl Trace for SelectiveTrace {
    fn debug(&mut self, record: &str) {
        if self.debug {
            log::debug!(target: "clike::trace::debug", "{record}");
        }
    }

    fn scope(&mut self, record: &str) {
        if self.scope {
            log::debug!(target: "clike::trace::scope", "{record}");
        }
    }

    fn stack(&mut self, record: &str) {
        if self.stack {
            log::debug!(target: "clike::trace::stack", "{record}");
        }
    }
}

/// Interpret a CLIKE source file.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The path to the .clike source file to run.
    #[arg(index = 1)]
    file: PathBuf,

    /// Emit one record per AST node visited during execution.
    #[arg(long)]
    debug: bool,

    /// Emit one record per scope the semantic analyzer exits.
    #[arg(long)]
    scope: bool,

    /// Emit a call-stack snapshot on every activation-record push and pop.
    #[arg(long)]
    stack: bool,

    /// The ambient log level, independent of --debug/--scope/--stack.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,
}

#[derive(ValueEnum, Clone, Default, Debug)]
enum LogLevel {
    #[default]
    #[value(alias("0"))]
    Error,
    #[value(alias("1"))]
    Warn,
    #[value(alias("2"))]
    Info,
    #[value(alias("3"))]
    Debug,
    #[value(alias("4"))]
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

fn main() -> ExitCode {
    let args = Cli::parse();
    simple_logger::init_with_level(log::Level::from(&args.verbosity)).expect("logger installs once");

    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(io_err) => {
            error!("could not read '{}': {io_err}", args.file.display());
            return ExitCode::FAILURE;
        }
    };

    let base_dir = args
        .file
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let loader = FsSourceLoader;
    let mut sink = StdoutSink;
    let mut trace = SelectiveTrace { debug: args.debug, scope: args.scope, stack: args.stack };

    match clike::run_program(&source, &loader, &base_dir, &mut sink, &mut trace) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
