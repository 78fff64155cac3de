//! CLIKE: a lexer, parser, semantic analyzer and tree-walking interpreter for a small
//! C-like language with scalars, fixed-size 1D arrays, control flow, functions and
//! `#include`.
//!
//! The pipeline is lexer → parser → semantic analyzer → interpreter. Hosts embed the
//! crate by implementing the three collaborator traits — [`loader::SourceLoader`],
//! [`sink::OutputSink`], [`trace::Trace`] — and calling [`run_program`]; the `clike`
//! binary is a thin wrapper that wires the filesystem, stdout and the `log` facade to
//! those seams.

pub mod ast;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod loader;
pub mod parser;
pub mod position;
pub mod semantic;
pub mod sink;
pub mod token;
pub mod trace;

use loader::SourceLoader;
use sink::OutputSink;
use trace::Trace;

/// Runs one `.clike` source end to end: parse (resolving `#include`), analyze, execute.
pub fn run_program<L: SourceLoader, O: OutputSink, T: Trace>(
    source: &str,
    loader: &L,
    base_dir: &str,
    sink: &mut O,
    trace: &mut T,
) -> Result<(), error::ClikeError> {
    let mut parser = parser::Parser::new(source, loader, base_dir);
    let program = parser.parse()?;

    semantic::Analyzer::new(trace).analyze(&program)?;

    interpreter::run(&program, sink, trace)
}
