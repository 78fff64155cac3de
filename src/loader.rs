//! The `SourceLoader` collaborator (spec §6): resolves `#include` paths to file text.
//!
//! The core never touches the filesystem directly; the parser asks a `SourceLoader` for
//! the text of an included file given a relative path and the including file's directory,
//! and gets back a canonical path (used as the include-dedup key, spec §4.2/§9) plus the
//! text. The loader itself knows nothing about where the `#include` token sat in the
//! including file, so it reports failure as a plain [`LoadError`]; the parser is the one
//! that knows the directive's position and turns that into `ClikeError::ParseIncludeIo`.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::path::Path;

/// `IO_NOT_FOUND` (spec §6): the loader could not resolve or read `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub path: String,
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not load '{}'", self.path)
    }
}

impl std::error::Error for LoadError {}

pub trait SourceLoader {
    /// Resolves `relative_path` against `base_dir` and returns `(canonical_path, text)`,
    /// or an `IO_NOT_FOUND` `LoadError` on failure.
    fn read(&self, relative_path: &str, base_dir: &str) -> Result<(String, String), LoadError>;
}

/// Reads included files from disk, canonicalizing paths so `./x` and `x` under the same
/// base directory dedup to the same include (spec §9).
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSourceLoader;

impl SourceLoader for FsSourceLoader {
    fn read(&self, relative_path: &str, base_dir: &str) -> Result<(String, String), LoadError> {
        let joined = Path::new(base_dir).join(relative_path);
        let fail = || LoadError { path: relative_path.to_owned() };

        let canonical = std::fs::canonicalize(&joined).map_err(|_| fail())?;
        let text = std::fs::read_to_string(&canonical).map_err(|_| fail())?;
        Ok((canonical.to_string_lossy().into_owned(), text))
    }
}

/// An in-memory loader keyed by canonical path, for tests and for hosts that embed
/// `.clike` sources as string constants rather than reading them from disk.
#[derive(Debug, Default, Clone)]
pub struct MapSourceLoader {
    files: HashMap<String, String>,
}

impl MapSourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a virtual file under `path`, used verbatim as its canonical name.
    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.files.insert(Self::canonicalize(&path.into()), text.into());
        self
    }

    fn canonicalize(path: &str) -> String {
        let mut parts = vec![];
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        parts.join("/")
    }
}

impl SourceLoader for MapSourceLoader {
    fn read(&self, relative_path: &str, base_dir: &str) -> Result<(String, String), LoadError> {
        let joined = if base_dir.is_empty() {
            relative_path.to_owned()
        } else {
            format!("{base_dir}/{relative_path}")
        };
        let canonical = Self::canonicalize(&joined);
        match self.files.get(&canonical) {
            Some(text) => Ok((canonical, text.clone())),
            None => Err(LoadError { path: relative_path.to_owned() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_loader_dedups_dot_slash() {
        let loader = MapSourceLoader::new().with_file("utils.clike", "int x;");
        let (canonical_a, _) = loader.read("./utils.clike", "").unwrap();
        let (canonical_b, _) = loader.read("utils.clike", "").unwrap();
        assert_eq!(canonical_a, canonical_b);
    }

    #[test]
    fn map_loader_resolves_relative_to_base_dir() {
        let loader = MapSourceLoader::new().with_file("lib/utils.clike", "int x;");
        let (_, text) = loader.read("utils.clike", "lib").unwrap();
        assert_eq!(text, "int x;");
    }

    #[test]
    fn map_loader_reports_missing_file() {
        let loader = MapSourceLoader::new();
        assert!(matches!(loader.read("missing.clike", ""), Err(LoadError { .. })));
    }
}
