//! The CLIKE error taxonomy (spec §7).
//!
//! One enum, no `thiserror` — `Display`/`Error` are hand-written, since every variant's
//! message is a short templated one-liner and a derive macro buys nothing here.

use std::error::Error;
use std::fmt::{self, Display};

use crate::position::Position;

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ClikeError {
    LexUnexpectedChar { ch: char, pos: Position },
    LexBadChar { pos: Position },
    LexUnterminatedString { pos: Position },

    ParseExpected { expected: String, got: String, pos: Position },
    ParseIncludeDepth { pos: Position },
    ParseIncludeIo { path: String, pos: Position },
    ParseBadIncludePosition { pos: Position },

    IdNotFound { name: String, pos: Position },
    DuplicateId { name: String, pos: Position },
    ArgCountMismatch { name: String, expected: usize, got: usize, pos: Position },
    TypeNarrowing { name: String, pos: Position },
    NotAnArray { name: String, pos: Position },
    MissingMain,

    IndexOutOfBounds { index: i64, len: usize, pos: Position },
    DivByZero { pos: Position },
    TypeError { message: String, pos: Position },
    RuntimeUndefinedFunction { name: String, pos: Position },
    RuntimeStrayReturn,
}

impl ClikeError {
    /// The taxonomy tag, e.g. `"INDEX_OUT_OF_BOUNDS"` (spec §7).
    pub fn kind(&self) -> &'static str {
        use ClikeError::*;
        match self {
            LexUnexpectedChar { .. } => "LEX_UNEXPECTED_CHAR",
            LexBadChar { .. } => "LEX_BAD_CHAR",
            LexUnterminatedString { .. } => "LEX_UNTERMINATED_STRING",
            ParseExpected { .. } => "PARSE_EXPECTED",
            ParseIncludeDepth { .. } => "PARSE_INCLUDE_DEPTH",
            ParseIncludeIo { .. } => "PARSE_INCLUDE_IO",
            ParseBadIncludePosition { .. } => "PARSE_BAD_INCLUDE_POSITION",
            IdNotFound { .. } => "ID_NOT_FOUND",
            DuplicateId { .. } => "DUPLICATE_ID",
            ArgCountMismatch { .. } => "ARG_COUNT_MISMATCH",
            TypeNarrowing { .. } => "TYPE_NARROWING",
            NotAnArray { .. } => "NOT_AN_ARRAY",
            MissingMain => "MISSING_MAIN",
            IndexOutOfBounds { .. } => "INDEX_OUT_OF_BOUNDS",
            DivByZero { .. } => "DIV_BY_ZERO",
            TypeError { .. } => "TYPE_ERROR",
            RuntimeUndefinedFunction { .. } => "RUNTIME_UNDEFINED_FUNCTION",
            RuntimeStrayReturn => "RUNTIME_STRAY_RETURN",
        }
    }

    pub fn position(&self) -> Option<Position> {
        use ClikeError::*;
        match self {
            LexUnexpectedChar { pos, .. }
            | LexBadChar { pos }
            | LexUnterminatedString { pos }
            | ParseExpected { pos, .. }
            | ParseIncludeDepth { pos }
            | ParseIncludeIo { pos, .. }
            | ParseBadIncludePosition { pos }
            | IdNotFound { pos, .. }
            | DuplicateId { pos, .. }
            | ArgCountMismatch { pos, .. }
            | TypeNarrowing { pos, .. }
            | NotAnArray { pos, .. }
            | IndexOutOfBounds { pos, .. }
            | DivByZero { pos }
            | TypeError { pos, .. }
            | RuntimeUndefinedFunction { pos, .. } => Some(*pos),
            MissingMain | RuntimeStrayReturn => None,
        }
    }
}

impl Display for ClikeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ClikeError::*;

        let message = match self {
            LexUnexpectedChar { ch, .. } => format!("unexpected character '{ch}'"),
            LexBadChar { .. } => "char literal must contain exactly one byte".to_owned(),
            LexUnterminatedString { .. } => "unterminated string literal".to_owned(),
            ParseExpected { expected, got, .. } => format!("expected {expected}, got {got}"),
            ParseIncludeDepth { .. } => "include depth exceeds the limit of 64".to_owned(),
            ParseIncludeIo { path, .. } => format!("could not load included file '{path}'"),
            ParseBadIncludePosition { .. } => {
                "#include is only legal before the first top-level declaration".to_owned()
            }
            IdNotFound { name, .. } => format!("undeclared identifier '{name}'"),
            DuplicateId { name, .. } => format!("'{name}' is already declared in this scope"),
            ArgCountMismatch { name, expected, got, .. } => format!(
                "'{name}' expects {expected} argument(s), got {got}"
            ),
            TypeNarrowing { name, .. } => {
                format!("assigning a float to int variable '{name}' would narrow it")
            }
            NotAnArray { name, .. } => format!("'{name}' is not an array"),
            MissingMain => "program does not declare 'int main()'".to_owned(),
            IndexOutOfBounds { index, len, .. } => {
                format!("index {index} out of bounds for array of length {len}")
            }
            DivByZero { .. } => "division by zero".to_owned(),
            TypeError { message, .. } => message.clone(),
            RuntimeUndefinedFunction { name, .. } => format!("call to undefined function '{name}'"),
            RuntimeStrayReturn => "return escaped its enclosing call".to_owned(),
        };

        match self.position() {
            Some(pos) => write!(f, "{} at {pos}: {message}", self.kind()),
            None => write!(f, "{}: {message}", self.kind()),
        }
    }
}

impl Error for ClikeError {}
