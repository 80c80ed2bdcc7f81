//! Cell preprocessor.
//!
//! Rewrites a cell line-by-line before it is handed to the bridge:
//!
//! - `%include "name"` – splices in the contents of `name`, resolved
//!   against the configured include directories and the current directory.
//!   A file already spliced earlier in the session is skipped (the line
//!   becomes empty) so repeated includes cannot redefine symbols.
//! - `%disableCompletion` / `%enableCompletion` – toggle the session's
//!   completion flag; the directive line is replaced by an empty line.
//! - With [`DirectiveStyle::SourceLocation`], the preprocessed cell is
//!   prefixed with a directive naming the cell (`<Cell N>`), and spliced
//!   includes are wrapped in directives mapping diagnostics back to the
//!   included file and the including cell line.
//!
//! Any other line passes through unchanged. `%install`-style package
//! directives are deliberately not handled here; they would need to run
//! before everything else, outside the per-cell pipeline.

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// A preprocessing failure, reported with the 1-based cell line number.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct PreprocessError {
    pub line: usize,
    pub message: String,
}

/// Whether and how to emit line-mapping directives into preprocessed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectiveStyle {
    /// Emit nothing; the toolchain sees diagnostics against scratch files.
    #[default]
    Off,
    /// Emit `#sourceLocation(file: "...", line: N)` directives.
    SourceLocation,
}

impl DirectiveStyle {
    fn directive(&self, file: &str, line: usize) -> Option<String> {
        match self {
            DirectiveStyle::Off => None,
            DirectiveStyle::SourceLocation => {
                Some(format!("#sourceLocation(file: \"{file}\", line: {line})"))
            }
        }
    }
}

/// Configuration for the [`Preprocessor`].
#[derive(Debug, Clone, Default)]
pub struct PreprocessorConfig {
    /// Directories searched by `%include`, in order. The current directory
    /// is always searched last.
    pub include_dirs: Vec<PathBuf>,
    pub directives: DirectiveStyle,
}

/// Result of preprocessing one cell.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub code: String,
    /// Set when the cell contained a completion toggle; the last directive
    /// in the cell wins.
    pub completion: Option<bool>,
}

/// Stateful cell rewriter. One instance lives per session; it remembers
/// which files have already been spliced.
#[derive(Debug, Default)]
pub struct Preprocessor {
    config: PreprocessorConfig,
    previously_read: HashSet<PathBuf>,
}

/// Display name of a cell, used in directives and diagnostics.
pub fn cell_file_name(cell: u64) -> String {
    format!("<Cell {cell}>")
}

impl Preprocessor {
    pub fn new(config: PreprocessorConfig) -> Self {
        Self {
            config,
            previously_read: HashSet::new(),
        }
    }

    /// Rewrite one cell. `cell` is the 1-based execution count.
    pub fn preprocess(&mut self, cell: u64, code: &str) -> Result<Preprocessed, PreprocessError> {
        let cell_file = cell_file_name(cell);
        let mut completion = None;
        let mut out_lines = Vec::new();

        for (index, line) in code.lines().enumerate() {
            if let Some(rest) = line.trim_start().strip_prefix("%include ") {
                out_lines.push(self.read_include(index, rest, &cell_file)?);
            } else if line.trim() == "%disableCompletion" {
                completion = Some(false);
                out_lines.push(String::new());
            } else if line.trim() == "%enableCompletion" {
                completion = Some(true);
                out_lines.push(String::new());
            } else {
                out_lines.push(line.to_string());
            }
        }

        let body = out_lines.join("\n");
        let code = match self.config.directives.directive(&cell_file, 1) {
            Some(header) => format!("{header}\n{body}"),
            None => body,
        };
        Ok(Preprocessed { code, completion })
    }

    /// Resolve and splice an `%include` directive.
    ///
    /// `line_index` is 0-based; errors report the 1-based line. When every
    /// candidate path was rejected as already read, the include collapses
    /// to an empty line instead of failing.
    fn read_include(
        &mut self,
        line_index: usize,
        rest_of_line: &str,
        cell_file: &str,
    ) -> Result<String, PreprocessError> {
        let name = parse_quoted_name(rest_of_line).ok_or_else(|| PreprocessError {
            line: line_index + 1,
            message: "%include must be followed by a name in quotes".to_string(),
        })?;

        let search_dirs: Vec<PathBuf> = self
            .config
            .include_dirs
            .iter()
            .cloned()
            .chain(std::iter::once(PathBuf::from(".")))
            .collect();

        let mut chosen: Option<(PathBuf, String)> = None;
        let mut rejected_a_path = false;

        for dir in &search_dirs {
            let path = dir.join(name);
            let key = path.canonicalize().unwrap_or_else(|_| path.clone());
            if self.previously_read.contains(&key) {
                rejected_a_path = true;
                continue;
            }
            if let Ok(contents) = std::fs::read_to_string(&path) {
                // Later search directories win, matching lookup order of
                // the toolchain itself.
                chosen = Some((key, contents));
            }
        }

        let Some((key, contents)) = chosen else {
            if rejected_a_path {
                return Ok(String::new());
            }
            return Err(PreprocessError {
                line: line_index + 1,
                message: format!("could not find \"{name}\"; searched {search_dirs:?}"),
            });
        };

        debug!(file = %key.display(), "spliced include");
        self.previously_read.insert(key);

        let contents = contents.trim_end_matches('\n');
        match (
            self.config.directives.directive(name, 1),
            self.config.directives.directive(cell_file, line_index + 1),
        ) {
            (Some(open), Some(close)) => Ok(format!("{open}\n{contents}\n{close}\n")),
            _ => Ok(contents.to_string()),
        }
    }
}

/// Parse the `"name"` argument of an `%include` directive.
fn parse_quoted_name(rest: &str) -> Option<&str> {
    let trimmed = rest.trim();
    let inner = trimmed.strip_prefix('"')?.strip_suffix('"')?;
    if inner.is_empty() || inner.contains('"') {
        return None;
    }
    Some(inner)
}
