//! The run-loop seam.
//!
//! The kernel application framework that owns the event loop lives outside
//! this crate (a REPL, a notebook host, a test harness). It plugs in via
//! [`KernelApp`], and the entry point hands it control through [`launch`],
//! which guarantees the startup ordering: the interrupt signal is masked
//! on the invoking thread *before* the loop is entered.

use async_trait::async_trait;
use glot_types::GlotError;
use tracing::info;

use crate::session::KernelSession;
use crate::signal::SignalGuard;

/// An externally-owned run loop driving a [`KernelSession`].
#[async_trait]
pub trait KernelApp {
    /// Run until the front-end is done (shutdown requested, EOF, ...).
    async fn run(&mut self, session: &mut KernelSession) -> Result<(), GlotError>;
}

/// Start the kernel front-end: mask SIGINT, then hand control to `app`.
///
/// The [`SignalGuard`] is held for the whole run and restores the previous
/// mask when the loop returns.
///
/// # Errors
///
/// Returns [`GlotError::Signal`] if the mask cannot be installed, or
/// whatever `app.run` reports.
pub async fn launch<A: KernelApp + ?Sized>(
    app: &mut A,
    session: &mut KernelSession,
) -> Result<(), GlotError> {
    let _guard = SignalGuard::block_interrupt()?;
    info!("kernel front-end started; entering run loop");
    app.run(session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionConfig;
    use crate::signal::interrupt_blocked;
    use glot_bridge::NullBridge;
    use glot_types::ExecutionResult;
    use std::fmt::Write as _;
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing::span;

    /// Records what the run loop observed at entry.
    #[derive(Default)]
    struct RecorderApp {
        runs: u32,
        sigint_blocked_at_entry: bool,
    }

    #[async_trait]
    impl KernelApp for RecorderApp {
        async fn run(&mut self, _session: &mut KernelSession) -> Result<(), GlotError> {
            self.runs += 1;
            self.sigint_blocked_at_entry = interrupt_blocked();
            Ok(())
        }
    }

    fn null_session() -> KernelSession {
        KernelSession::new(Arc::new(NullBridge), SessionConfig::default())
    }

    // Uses a current-thread runtime so the run loop executes on the same
    // thread whose mask `launch` changes.
    #[cfg(unix)]
    #[tokio::test(flavor = "current_thread")]
    async fn sigint_is_blocked_before_the_run_loop_is_entered() {
        let mut app = RecorderApp::default();
        let mut session = null_session();
        launch(&mut app, &mut session).await.unwrap();
        assert!(app.sigint_blocked_at_entry);
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "current_thread")]
    async fn mask_is_restored_after_the_run_loop_returns() {
        let mut app = RecorderApp::default();
        let mut session = null_session();
        launch(&mut app, &mut session).await.unwrap();
        assert!(!interrupt_blocked());
    }

    #[tokio::test]
    async fn run_loop_is_entered_exactly_once() {
        let mut app = RecorderApp::default();
        let mut session = null_session();
        launch(&mut app, &mut session).await.unwrap();
        assert_eq!(app.runs, 1);
    }

    /// Collects event messages so tests can assert on log ordering.
    #[derive(Clone, Default)]
    struct LogCapture {
        messages: Arc<Mutex<Vec<String>>>,
    }

    impl LogCapture {
        fn snapshot(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl tracing::Subscriber for LogCapture {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(1)
        }
        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}
        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}
        fn event(&self, event: &tracing::Event<'_>) {
            struct MessageVisitor(String);
            impl Visit for MessageVisitor {
                fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" {
                        let _ = write!(self.0, "{:?}", value);
                    }
                }
            }
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.messages.lock().unwrap().push(visitor.0);
        }
        fn enter(&self, _: &span::Id) {}
        fn exit(&self, _: &span::Id) {}
    }

    /// Snapshots the captured log at run-loop entry, so the test can tell
    /// which events preceded it.
    struct LogSnapshotApp {
        capture: LogCapture,
        at_entry: Vec<String>,
    }

    #[async_trait]
    impl KernelApp for LogSnapshotApp {
        async fn run(&mut self, _session: &mut KernelSession) -> Result<(), GlotError> {
            self.at_entry = self.capture.snapshot();
            Ok(())
        }
    }

    // Current-thread runtime keeps everything on the test thread, where
    // `set_default` scopes the capturing subscriber.
    #[tokio::test(flavor = "current_thread")]
    async fn startup_diagnostic_fires_once_before_the_run_loop() {
        let capture = LogCapture::default();
        let _guard = tracing::subscriber::set_default(capture.clone());

        let mut app = LogSnapshotApp {
            capture: capture.clone(),
            at_entry: Vec::new(),
        };
        let mut session = null_session();
        launch(&mut app, &mut session).await.unwrap();

        let started = |msgs: &[String]| {
            msgs.iter()
                .filter(|m| m.contains("entering run loop"))
                .count()
        };
        assert_eq!(
            started(&app.at_entry),
            1,
            "startup diagnostic must be emitted before the run loop"
        );
        assert_eq!(
            started(&capture.snapshot()),
            1,
            "startup diagnostic must be emitted exactly once"
        );
    }

    /// End-to-end over the stubbed no-op delegate: the app executes a cell
    /// through the session and the loop returns immediately.
    struct OneCellApp {
        result: Option<ExecutionResult>,
    }

    #[async_trait]
    impl KernelApp for OneCellApp {
        async fn run(&mut self, session: &mut KernelSession) -> Result<(), GlotError> {
            self.result = Some(session.execute("print(\"hello\")").await?);
            Ok(())
        }
    }

    #[tokio::test]
    async fn end_to_end_over_null_bridge() {
        let mut app = OneCellApp { result: None };
        let mut session = null_session();
        launch(&mut app, &mut session).await.unwrap();
        assert!(matches!(
            app.result,
            Some(ExecutionResult::SuccessWithoutValue)
        ));
        assert_eq!(session.execution_count(), 1);
    }
}
