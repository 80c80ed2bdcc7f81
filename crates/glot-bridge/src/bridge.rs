//! The Runtime Bridge seam.
//!
//! The kernel front-end publishes cells to a [`RuntimeBridge`]; bridges
//! translate them into the foreign runtime's native call shape and
//! translate results back.
//!
//! # Overview
//!
//! - [`RuntimeBridge`] – the trait every bridge must implement.
//! - [`SubprocessBridge`][crate::subprocess::SubprocessBridge] – runs cells
//!   through an external toolchain process.
//! - [`NullBridge`][crate::null::NullBridge] – a no-op delegate used in
//!   tests and dry runs.

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use glot_types::{CompletionReply, EvalOutcome, EvalRequest, OutputChunk};
use thiserror::Error;

/// Errors that can arise from a runtime bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The foreign toolchain process could not be started.
    #[error("failed to spawn toolchain '{toolchain}': {source}")]
    Spawn {
        toolchain: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O failure while feeding or draining the foreign runtime.
    #[error("bridge I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// The in-flight evaluation was interrupted on request.
    #[error("evaluation interrupted")]
    Interrupted,

    /// The bridge does not implement the requested capability.
    #[error("{0} is not implemented by this bridge")]
    Unsupported(&'static str),
}

/// Every foreign-runtime bridge must implement this trait.
///
/// # Contract
///
/// * `evaluate` – receives one preprocessed cell and returns the runtime's
///   classification of what happened. While the cell runs, any output the
///   runtime produces must be forwarded through the stream returned by
///   `output_stream`.
///
/// * `complete` – resolves code completions at `cursor_pos`. Bridges
///   without a completion engine return [`BridgeError::Unsupported`].
///
/// * `output_stream` – a live stream of [`OutputChunk`] values captured
///   from the runtime's stdout/stderr.
///
/// * `interrupt` – best-effort cancellation of the in-flight evaluation;
///   a cancelled `evaluate` call resolves to [`BridgeError::Interrupted`].
///   Must be safe to call when nothing is running.
#[async_trait]
pub trait RuntimeBridge: Send + Sync {
    /// Evaluate one cell of foreign source text.
    async fn evaluate(&self, request: EvalRequest) -> Result<EvalOutcome, BridgeError>;

    /// Resolve code completions for `source` at byte offset `cursor_pos`.
    async fn complete(
        &self,
        source: &str,
        cursor_pos: usize,
    ) -> Result<CompletionReply, BridgeError>;

    /// Captured stdout/stderr chunks, forwarded as they arrive.
    fn output_stream(&self) -> BoxStream<'static, OutputChunk>;

    /// Request cancellation of the evaluation currently in flight, if any.
    fn interrupt(&self);
}
