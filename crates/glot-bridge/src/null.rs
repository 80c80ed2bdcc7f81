//! [`NullBridge`] – a no-op runtime delegate.
//!
//! Evaluates every cell to success-without-value, returns empty
//! completions, and exposes an empty output stream. Useful as a stand-in
//! delegate for tests and `--dry-run` style wiring where no toolchain is
//! available.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use glot_types::{CompletionReply, EvalOutcome, EvalRequest, OutputChunk};

use crate::bridge::{BridgeError, RuntimeBridge};

/// The stubbed no-op delegate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBridge;

#[async_trait]
impl RuntimeBridge for NullBridge {
    async fn evaluate(&self, _request: EvalRequest) -> Result<EvalOutcome, BridgeError> {
        Ok(EvalOutcome::SuccessWithoutValue)
    }

    async fn complete(
        &self,
        _source: &str,
        cursor_pos: usize,
    ) -> Result<CompletionReply, BridgeError> {
        Ok(CompletionReply::empty(cursor_pos))
    }

    fn output_stream(&self) -> BoxStream<'static, OutputChunk> {
        Box::pin(stream::empty())
    }

    fn interrupt(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn evaluates_to_success_without_value() {
        let bridge = NullBridge;
        let outcome = bridge
            .evaluate(EvalRequest::new(1, "let x = 1"))
            .await
            .unwrap();
        assert!(matches!(outcome, EvalOutcome::SuccessWithoutValue));
    }

    #[tokio::test]
    async fn completion_pins_cursor() {
        let bridge = NullBridge;
        let reply = bridge.complete("let x", 5).await.unwrap();
        assert_eq!(reply, CompletionReply::empty(5));
    }

    #[tokio::test]
    async fn output_stream_is_empty() {
        let bridge = NullBridge;
        assert!(bridge.output_stream().next().await.is_none());
    }
}
