//! [`KernelSession`] – front-end session state.
//!
//! Owns the bridge handle and everything the front-end tracks between
//! cells: the execution counter, the completion flag, and the include
//! history living inside the [`Preprocessor`]. One public entry point per
//! capability: [`execute`][KernelSession::execute],
//! [`complete`][KernelSession::complete],
//! [`interrupt`][KernelSession::interrupt].

use std::sync::Arc;

use futures_util::stream::BoxStream;
use glot_bridge::{BridgeError, RuntimeBridge};
use glot_types::{
    CompletionReply, EvalOutcome, EvalRequest, ExecutionResult, GlotError, OutputChunk,
    RuntimeFault,
};
use tracing::{debug, info};

use crate::preprocess::{Preprocessor, PreprocessorConfig};

/// Session-level configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub preprocessor: PreprocessorConfig,
    /// Whether code completion starts enabled. `%enableCompletion` /
    /// `%disableCompletion` directives override this at runtime.
    pub completion_enabled: bool,
}

/// One interactive session over a [`RuntimeBridge`].
pub struct KernelSession {
    bridge: Arc<dyn RuntimeBridge>,
    preprocessor: Preprocessor,
    execution_count: u64,
    completion_enabled: bool,
}

impl KernelSession {
    pub fn new(bridge: Arc<dyn RuntimeBridge>, config: SessionConfig) -> Self {
        Self {
            bridge,
            preprocessor: Preprocessor::new(config.preprocessor),
            execution_count: 0,
            completion_enabled: config.completion_enabled,
        }
    }

    /// Number of cells executed so far.
    pub fn execution_count(&self) -> u64 {
        self.execution_count
    }

    pub fn completion_enabled(&self) -> bool {
        self.completion_enabled
    }

    /// A clone of the bridge handle, for wiring external interrupt sources
    /// (e.g. a Ctrl-C handler) to the session's runtime.
    pub fn bridge(&self) -> Arc<dyn RuntimeBridge> {
        Arc::clone(&self.bridge)
    }

    /// Execute one cell: preprocess, delegate to the bridge, classify.
    ///
    /// Preprocessor failures come back as
    /// [`ExecutionResult::PreprocessorError`] rather than an `Err` — the
    /// front-end reports them like any other cell failure. An interrupted
    /// evaluation becomes a runtime-error result. Only infrastructure
    /// failures (the bridge itself breaking) surface as [`GlotError`].
    ///
    /// # Errors
    ///
    /// Returns [`GlotError::Bridge`] when the bridge fails for a reason
    /// other than interruption.
    pub async fn execute(&mut self, code: &str) -> Result<ExecutionResult, GlotError> {
        self.execution_count += 1;
        let cell = self.execution_count;

        let preprocessed = match self.preprocessor.preprocess(cell, code) {
            Ok(p) => p,
            Err(e) => {
                debug!(cell, line = e.line, "preprocessor rejected cell");
                return Ok(ExecutionResult::PreprocessorError {
                    line: e.line,
                    message: e.message,
                });
            }
        };
        if let Some(enabled) = preprocessed.completion {
            info!(cell, enabled, "completion toggled by directive");
            self.completion_enabled = enabled;
        }

        let request = EvalRequest::new(cell, preprocessed.code);
        debug!(cell, id = %request.id, "delegating cell to bridge");
        match self.bridge.evaluate(request).await {
            Ok(EvalOutcome::SuccessWithValue { value }) => {
                Ok(ExecutionResult::SuccessWithValue { value })
            }
            Ok(EvalOutcome::SuccessWithoutValue) => Ok(ExecutionResult::SuccessWithoutValue),
            Ok(EvalOutcome::Fault(fault)) => Ok(ExecutionResult::RuntimeError(fault)),
            Err(BridgeError::Interrupted) => Ok(ExecutionResult::RuntimeError(RuntimeFault {
                message: "execution interrupted".to_string(),
                details: Vec::new(),
            })),
            Err(e) => Err(GlotError::Bridge(e.to_string())),
        }
    }

    /// Resolve completions at `cursor_pos`.
    ///
    /// While completion is disabled this returns the empty "ok" reply with
    /// the cursor pinned in place, without consulting the bridge.
    ///
    /// # Errors
    ///
    /// Returns [`GlotError::Bridge`] when the bridge fails or does not
    /// implement completion.
    pub async fn complete(
        &self,
        source: &str,
        cursor_pos: usize,
    ) -> Result<CompletionReply, GlotError> {
        if !self.completion_enabled {
            return Ok(CompletionReply::empty(cursor_pos));
        }
        self.bridge
            .complete(source, cursor_pos)
            .await
            .map_err(|e| GlotError::Bridge(e.to_string()))
    }

    /// Forward an interrupt to the bridge, cancelling any in-flight cell.
    pub fn interrupt(&self) {
        self.bridge.interrupt();
    }

    /// Captured foreign output, forwarded as it arrives.
    pub fn output_stream(&self) -> BoxStream<'static, OutputChunk> {
        self.bridge.output_stream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::stream;
    use glot_bridge::NullBridge;

    /// Bridge that echoes the preprocessed source back as a value, so
    /// tests can observe what the session actually sent.
    struct EchoBridge;

    #[async_trait]
    impl RuntimeBridge for EchoBridge {
        async fn evaluate(&self, request: EvalRequest) -> Result<EvalOutcome, BridgeError> {
            Ok(EvalOutcome::SuccessWithValue {
                value: request.source,
            })
        }
        async fn complete(
            &self,
            _source: &str,
            _cursor_pos: usize,
        ) -> Result<CompletionReply, BridgeError> {
            Ok(CompletionReply {
                matches: vec!["print".to_string()],
                cursor_start: 0,
                cursor_end: 0,
            })
        }
        fn output_stream(&self) -> BoxStream<'static, OutputChunk> {
            Box::pin(stream::empty())
        }
        fn interrupt(&self) {}
    }

    /// Bridge whose evaluations are always interrupted.
    struct InterruptedBridge;

    #[async_trait]
    impl RuntimeBridge for InterruptedBridge {
        async fn evaluate(&self, _request: EvalRequest) -> Result<EvalOutcome, BridgeError> {
            Err(BridgeError::Interrupted)
        }
        async fn complete(
            &self,
            _source: &str,
            _cursor_pos: usize,
        ) -> Result<CompletionReply, BridgeError> {
            Err(BridgeError::Unsupported("code completion"))
        }
        fn output_stream(&self) -> BoxStream<'static, OutputChunk> {
            Box::pin(stream::empty())
        }
        fn interrupt(&self) {}
    }

    fn session_over(bridge: Arc<dyn RuntimeBridge>) -> KernelSession {
        KernelSession::new(bridge, SessionConfig::default())
    }

    #[tokio::test]
    async fn execute_increments_execution_count() {
        let mut session = session_over(Arc::new(NullBridge));
        assert_eq!(session.execution_count(), 0);
        session.execute("let x = 1").await.unwrap();
        session.execute("let y = 2").await.unwrap();
        assert_eq!(session.execution_count(), 2);
    }

    #[tokio::test]
    async fn null_bridge_cell_succeeds_without_value() {
        let mut session = session_over(Arc::new(NullBridge));
        let result = session.execute("print(1)").await.unwrap();
        assert!(matches!(result, ExecutionResult::SuccessWithoutValue));
    }

    #[tokio::test]
    async fn preprocessor_failure_is_a_result_not_an_error() {
        let mut session = session_over(Arc::new(NullBridge));
        let result = session.execute("%include not-quoted").await.unwrap();
        match result {
            ExecutionResult::PreprocessorError { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("quotes"));
            }
            other => panic!("expected preprocessor error, got {other:?}"),
        }
        // The failed cell still consumed an execution number.
        assert_eq!(session.execution_count(), 1);
    }

    #[tokio::test]
    async fn interrupted_evaluation_becomes_runtime_error() {
        let mut session = session_over(Arc::new(InterruptedBridge));
        let result = session.execute("loop {}").await.unwrap();
        match result {
            ExecutionResult::RuntimeError(fault) => {
                assert!(fault.message.contains("interrupted"));
            }
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn completion_disabled_pins_cursor_without_touching_bridge() {
        // InterruptedBridge's complete() would error; it must not be called.
        let session = session_over(Arc::new(InterruptedBridge));
        let reply = session.complete("pri", 3).await.unwrap();
        assert_eq!(reply, CompletionReply::empty(3));
    }

    #[tokio::test]
    async fn completion_directive_enables_bridge_completion() {
        let mut session = session_over(Arc::new(EchoBridge));
        assert!(!session.completion_enabled());
        session.execute("%enableCompletion").await.unwrap();
        assert!(session.completion_enabled());

        let reply = session.complete("pri", 3).await.unwrap();
        assert_eq!(reply.matches, vec!["print".to_string()]);
    }

    #[tokio::test]
    async fn unsupported_completion_surfaces_as_bridge_error() {
        let mut session = session_over(Arc::new(InterruptedBridge));
        session.execute("%enableCompletion").await.unwrap();
        let err = session.complete("pri", 3).await.unwrap_err();
        assert!(matches!(err, GlotError::Bridge(_)));
    }

    #[tokio::test]
    async fn executed_source_reaches_the_bridge_preprocessed() {
        let mut session = session_over(Arc::new(EchoBridge));
        let result = session.execute("%disableCompletion\nprint(1)").await.unwrap();
        match result {
            ExecutionResult::SuccessWithValue { value } => {
                // The directive line was blanked before delegation.
                assert_eq!(value, "\nprint(1)");
            }
            other => panic!("expected value, got {other:?}"),
        }
    }

    #[test]
    fn bridge_error_reexport_preserves_identity() {
        // `crate::BridgeError` is a `pub use` of `glot_bridge::BridgeError`;
        // a value constructed through one path matches through the other.
        fn through_bridge(err: glot_bridge::BridgeError) -> crate::BridgeError {
            err
        }
        let err = through_bridge(glot_bridge::BridgeError::Interrupted);
        assert!(matches!(err, crate::BridgeError::Interrupted));
    }
}
