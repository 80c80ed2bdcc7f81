use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which low-level output stream a captured chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
    Stdout,
    Stderr,
}

/// A chunk of captured output forwarded while foreign code is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputChunk {
    pub stream: StreamName,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl OutputChunk {
    /// Build a chunk stamped with the current wall-clock time.
    pub fn now(stream: StreamName, text: impl Into<String>) -> Self {
        Self {
            stream,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One evaluation request handed to the runtime bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalRequest {
    pub id: Uuid,
    /// 1-based execution counter; also names the cell (`<Cell N>`).
    pub cell: u64,
    /// Preprocessed source text, ready for the foreign toolchain.
    pub source: String,
}

impl EvalRequest {
    pub fn new(cell: u64, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cell,
            source: source.into(),
        }
    }
}

/// A structured failure reported by the foreign runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeFault {
    pub message: String,
    /// Supporting lines (e.g. the stderr tail of the failed toolchain run).
    pub details: Vec<String>,
}

/// What the bridge observed when the foreign runtime evaluated a cell.
///
/// Mirrors the three-way classification an expression evaluator produces:
/// a displayable value, a plain success (declarations, statements), or a
/// runtime fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EvalOutcome {
    SuccessWithValue { value: String },
    SuccessWithoutValue,
    Fault(RuntimeFault),
}

/// Final result of executing a cell through the kernel session.
///
/// Preprocessor failures are a *result*, not an error: the front-end
/// reports them to the user the same way it reports runtime faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExecutionResult {
    SuccessWithValue { value: String },
    SuccessWithoutValue,
    RuntimeError(RuntimeFault),
    PreprocessorError { line: usize, message: String },
}

/// Reply to a code-completion request, in the shape the notebook protocol
/// expects (`matches` between `cursor_start` and `cursor_end`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReply {
    pub matches: Vec<String>,
    pub cursor_start: usize,
    pub cursor_end: usize,
}

impl CompletionReply {
    /// The "ok, no matches" reply returned while completion is disabled.
    pub fn empty(cursor_pos: usize) -> Self {
        Self {
            matches: Vec::new(),
            cursor_start: cursor_pos,
            cursor_end: cursor_pos,
        }
    }
}

/// Workspace-wide error type spanning bridge failures, configuration
/// problems, and signal-mask setup.
#[derive(Error, Debug)]
pub enum GlotError {
    #[error("bridge failure: {0}")]
    Bridge(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("signal setup failed: {0}")]
    Signal(String),
}
