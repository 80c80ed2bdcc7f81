//! [`SubprocessBridge`] – evaluate cells through an external toolchain.
//!
//! The cell source is written to a scratch file and the configured
//! toolchain binary is spawned on it. While the child runs, its stdout and
//! stderr are forwarded line-by-line onto the [`OutputBus`], so an attached
//! front-end sees foreign output live. The exit status classifies the
//! result: exit 0 is a success without a displayable value; anything else
//! is a runtime fault carrying the captured stderr tail.
//!
//! A subprocess toolchain has no channel for expression values, so this
//! bridge never produces [`EvalOutcome::SuccessWithValue`]; that variant
//! exists for in-process runtimes behind the same trait.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use glot_types::{
    CompletionReply, EvalOutcome, EvalRequest, OutputChunk, RuntimeFault, StreamName,
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::bridge::{BridgeError, RuntimeBridge};
use crate::output::OutputBus;

/// How many trailing stderr lines are attached to a runtime fault.
const STDERR_TAIL_LINES: usize = 16;

/// How to invoke the external toolchain.
#[derive(Debug, Clone)]
pub struct ToolchainCommand {
    /// Binary name or path (resolved through `PATH`), e.g. `"swift"`.
    pub program: String,
    /// Arguments inserted before the scratch-file path.
    pub args: Vec<String>,
    /// Directory prepended to the child's `PATH`, for toolchains that are
    /// installed outside the default search path.
    pub bin_dir: Option<PathBuf>,
    /// Working directory for the child process.
    pub workdir: Option<PathBuf>,
}

impl ToolchainCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            bin_dir: None,
            workdir: None,
        }
    }
}

/// A [`RuntimeBridge`] that delegates each cell to a child process.
pub struct SubprocessBridge {
    command: ToolchainCommand,
    scratch_dir: PathBuf,
    /// File extension for scratch files (e.g. `"swift"`).
    source_ext: String,
    bus: OutputBus,
    /// Cancellation handle for the evaluation currently in flight.
    active: Mutex<Option<Arc<Notify>>>,
}

impl SubprocessBridge {
    pub fn new(
        command: ToolchainCommand,
        scratch_dir: impl Into<PathBuf>,
        source_ext: impl Into<String>,
    ) -> Self {
        Self {
            command,
            scratch_dir: scratch_dir.into(),
            source_ext: source_ext.into(),
            bus: OutputBus::default(),
            active: Mutex::new(None),
        }
    }

    fn scratch_path(&self, cell: u64) -> PathBuf {
        self.scratch_dir
            .join(format!("cell_{cell}.{}", self.source_ext))
    }

    fn set_active(&self, notify: Option<Arc<Notify>>) {
        if let Ok(mut guard) = self.active.lock() {
            *guard = notify;
        }
    }

    /// Spawn a task that forwards lines from `reader` onto the bus,
    /// returning the collected lines when the stream ends.
    fn forward_lines<R>(
        &self,
        reader: R,
        stream: StreamName,
    ) -> tokio::task::JoinHandle<Vec<String>>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                bus.publish(OutputChunk::now(stream, line.clone()));
                collected.push(line);
            }
            collected
        })
    }
}

#[async_trait]
impl RuntimeBridge for SubprocessBridge {
    async fn evaluate(&self, request: EvalRequest) -> Result<EvalOutcome, BridgeError> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let script_path = self.scratch_path(request.cell);
        tokio::fs::write(&script_path, &request.source).await?;

        let mut command = Command::new(&self.command.program);
        command
            .args(&self.command.args)
            .arg(&script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(bin_dir) = &self.command.bin_dir {
            let path = std::env::var("PATH").unwrap_or_default();
            command.env("PATH", format!("{}:{path}", bin_dir.display()));
        }
        if let Some(workdir) = &self.command.workdir {
            command.current_dir(workdir);
        }

        debug!(cell = request.cell, id = %request.id, program = %self.command.program,
            "spawning toolchain for cell");
        let mut child = command.spawn().map_err(|source| BridgeError::Spawn {
            toolchain: self.command.program.clone(),
            source,
        })?;

        let stdout_task = child
            .stdout
            .take()
            .map(|out| self.forward_lines(out, StreamName::Stdout));
        let stderr_task = child
            .stderr
            .take()
            .map(|err| self.forward_lines(err, StreamName::Stderr));

        let cancel = Arc::new(Notify::new());
        self.set_active(Some(Arc::clone(&cancel)));

        let status = tokio::select! {
            status = child.wait() => status,
            _ = cancel.notified() => {
                info!(cell = request.cell, "interrupt requested; killing toolchain");
                let _ = child.start_kill();
                let _ = child.wait().await;
                self.set_active(None);
                return Err(BridgeError::Interrupted);
            }
        };
        self.set_active(None);
        let status = status?;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        let stderr_lines = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => Vec::new(),
        };

        if status.success() {
            Ok(EvalOutcome::SuccessWithoutValue)
        } else {
            let message = match status.code() {
                Some(code) => format!("toolchain exited with status {code}"),
                None => "toolchain terminated by signal".to_string(),
            };
            let tail_start = stderr_lines.len().saturating_sub(STDERR_TAIL_LINES);
            Ok(EvalOutcome::Fault(RuntimeFault {
                message,
                details: stderr_lines[tail_start..].to_vec(),
            }))
        }
    }

    async fn complete(
        &self,
        _source: &str,
        _cursor_pos: usize,
    ) -> Result<CompletionReply, BridgeError> {
        Err(BridgeError::Unsupported("code completion"))
    }

    fn output_stream(&self) -> BoxStream<'static, OutputChunk> {
        self.bus.stream()
    }

    fn interrupt(&self) {
        let notify = self
            .active
            .lock()
            .ok()
            .and_then(|guard| guard.clone());
        if let Some(notify) = notify {
            notify.notify_one();
        }
    }
}
