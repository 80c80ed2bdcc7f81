//! REPL – the interactive shell driving a [`KernelSession`].
//!
//! Lines starting with `/` are commands:
//!   /help       – show this list
//!   /toolchain  – probe the configured toolchain
//!   /install    – register the Jupyter kernelspec
//!   /quit /exit – leave the shell
//!
//! Anything else is a cell, handed to the session for evaluation. A
//! trailing `\` continues the cell onto the next line. Output captured
//! from the foreign toolchain is printed as it arrives by a background
//! task (stderr in red).

use colored::Colorize;
use futures_util::StreamExt;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use glot_kernel::{KernelApp, KernelSession};
use glot_types::{ExecutionResult, GlotError, OutputChunk, StreamName};
use tokio::io::AsyncBufReadExt;

use crate::config::Config;
use crate::{kernelspec, toolchain};

/// Slash-commands understood by the REPL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    Help,
    Toolchain,
    Install,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    /// Parse a command line. Returns `None` for non-command input (cells).
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            return None;
        }
        Some(match trimmed {
            "/help" => ReplCommand::Help,
            "/toolchain" => ReplCommand::Toolchain,
            "/install" => ReplCommand::Install,
            "/quit" | "/exit" => ReplCommand::Quit,
            other => ReplCommand::Unknown(other.to_string()),
        })
    }
}

/// `true` when the cell wants another input line.
pub(crate) fn needs_continuation(line: &str) -> bool {
    line.ends_with('\\')
}

/// Strip the continuation marker from the end of a line.
pub(crate) fn strip_continuation(line: &str) -> &str {
    line.strip_suffix('\\').unwrap_or(line)
}

/// The interactive shell, pluggable into [`glot_kernel::launch`].
pub struct ReplApp {
    shutdown: Arc<AtomicBool>,
    config: Config,
}

impl ReplApp {
    pub fn new(shutdown: Arc<AtomicBool>, config: Config) -> Self {
        Self { shutdown, config }
    }

    fn cmd_help(&self) {
        println!();
        println!("{}", "glot commands".bold().underline());
        println!("  {}   – probe the configured toolchain", "/toolchain".bold().cyan());
        println!("  {}     – register the Jupyter kernelspec", "/install".bold().cyan());
        println!("  {} – leave the shell", "/quit  /exit".bold().cyan());
        println!("  End a line with {} to continue a cell.", "\\".bold());
        println!();
    }

    fn cmd_toolchain(&self) {
        print!("  Probing {} … ", self.config.toolchain.dimmed());
        std::io::stdout().flush().ok();
        match toolchain::probe(&self.config.toolchain) {
            Ok(version) => println!("{} ({})", "online".green(), version),
            Err(reason) => {
                println!("{}", "offline".red());
                println!("  {}", reason.dimmed());
            }
        }
    }

    fn cmd_install(&self) {
        match kernelspec::install(&self.config) {
            Ok(path) => println!(
                "{} {}",
                "✓ Kernelspec written to".green(),
                path.display().to_string().bold()
            ),
            Err(e) => println!("{}: {}", "Install failed".red(), e),
        }
    }
}

#[async_trait]
impl KernelApp for ReplApp {
    async fn run(&mut self, session: &mut KernelSession) -> Result<(), GlotError> {
        // Forward captured toolchain output to the terminal as it arrives.
        let printer = tokio::spawn(print_output(session.output_stream()));

        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            print!("{} ", format!("glot[{}]>", session.execution_count() + 1).bold().cyan());
            std::io::stdout().flush().ok();

            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break, // EOF
                Err(e) => {
                    eprintln!("{}: {}", "Read error".red(), e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match ReplCommand::parse(&line) {
                Some(ReplCommand::Help) => self.cmd_help(),
                Some(ReplCommand::Toolchain) => self.cmd_toolchain(),
                Some(ReplCommand::Install) => self.cmd_install(),
                Some(ReplCommand::Quit) => {
                    println!("{}", "Goodbye.".green());
                    self.shutdown.store(true, Ordering::SeqCst);
                    break;
                }
                Some(ReplCommand::Unknown(cmd)) => {
                    println!(
                        "{} '{}'. Type {} for available commands.",
                        "Unknown command:".red(),
                        cmd.yellow(),
                        "/help".bold()
                    );
                }
                None => {
                    let mut cell = strip_continuation(&line).to_string();
                    let mut pending = needs_continuation(&line);
                    while pending {
                        print!("{} ", "....>".dimmed());
                        std::io::stdout().flush().ok();
                        match lines.next_line().await {
                            Ok(Some(next)) => {
                                pending = needs_continuation(&next);
                                cell.push('\n');
                                cell.push_str(strip_continuation(&next));
                            }
                            Ok(None) => break,
                            Err(e) => {
                                eprintln!("{}: {}", "Read error".red(), e);
                                break;
                            }
                        }
                    }

                    match session.execute(&cell).await {
                        Ok(result) => render_result(&result),
                        Err(e) => println!("{}: {}", "Bridge failure".red().bold(), e),
                    }
                }
            }
        }

        printer.abort();
        Ok(())
    }
}

async fn print_output(mut stream: futures_util::stream::BoxStream<'static, OutputChunk>) {
    while let Some(chunk) = stream.next().await {
        match chunk.stream {
            StreamName::Stdout => println!("{}", chunk.text),
            StreamName::Stderr => eprintln!("{}", chunk.text.red()),
        }
    }
}

fn render_result(result: &ExecutionResult) {
    match result {
        ExecutionResult::SuccessWithValue { value } => println!("{}", value),
        ExecutionResult::SuccessWithoutValue => println!("{}", "✓".green()),
        ExecutionResult::RuntimeError(fault) => {
            println!("{}: {}", "Error".red().bold(), fault.message);
            for line in &fault.details {
                println!("  {}", line.dimmed());
            }
        }
        ExecutionResult::PreprocessorError { line, message } => {
            println!(
                "{} (line {}): {}",
                "Preprocessor error".red().bold(),
                line,
                message
            );
        }
    }
}
