//! `glot` – interactive language-bridge kernel front-end.
//!
//! This binary is the only entry point to the glot stack.  It:
//!
//! 1. Initialises structured logging, then dispatches on the (tiny)
//!    argument surface: bare invocation starts the interactive REPL,
//!    `install` registers the Jupyter kernelspec, `version` prints the
//!    version.
//! 2. Loads `~/.glot/config.toml` (writing defaults on first run) and
//!    probes the configured toolchain.
//! 3. Wires a Ctrl-C handler that forwards interrupts to the runtime
//!    bridge, then masks SIGINT on the main thread and hands control to
//!    the REPL run loop via [`glot_kernel::launch`].
//!
//! A notebook server launches registered kernels as `<exe> -f
//! <connection_file>`; glot accepts that syntax but answers with an error,
//! because the wire-protocol transport is an external component it does
//! not bundle.

mod config;
mod kernelspec;
mod repl;
mod toolchain;

use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

use glot_bridge::{RuntimeBridge, SubprocessBridge, ToolchainCommand};
use glot_kernel::preprocess::PreprocessorConfig;
use glot_kernel::{DirectiveStyle, KernelSession, SessionConfig, launch};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set GLOT_LOG_FORMAT=json to emit newline-delimited JSON logs suitable
    // for log aggregators. The REPL's user-facing output still uses
    // println! for UX consistency.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("GLOT_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => run_repl(),
        Some("install") => run_install(),
        Some("version") => println!("glot {}", env!("CARGO_PKG_VERSION")),
        Some("-f") => {
            eprintln!(
                "{}: connection-file mode needs an external notebook transport; \
                 glot ships only the interactive front-end and the kernelspec.",
                "error".red().bold()
            );
            std::process::exit(2);
        }
        Some(other) => {
            eprintln!(
                "{}: unknown argument '{}' (try `glot`, `glot install`, `glot version`)",
                "error".red().bold(),
                other
            );
            std::process::exit(2);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────────────────

fn run_install() {
    let cfg = load_config_or_default();
    match kernelspec::install(&cfg) {
        Ok(path) => println!(
            "{} {}",
            "✓ Kernelspec written to".green(),
            path.display().to_string().bold()
        ),
        Err(e) => {
            eprintln!("{}: {}", "Install failed".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run_repl() {
    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            // Persist plain defaults; the in-memory config still honours
            // any GLOT_* overrides on this first run.
            match config::save(&config::Config::default()) {
                Ok(()) => println!(
                    "  No config found – wrote defaults to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Config error".red(), e),
            }
            config::default_with_overrides()
        }
        Err(e) => {
            println!("{}: {} – using defaults", "Config error".red(), e);
            config::default_with_overrides()
        }
    };

    // ── Toolchain discovery ───────────────────────────────────────────────
    print!("\n  Probing toolchain {} … ", cfg.toolchain.dimmed());
    match toolchain::probe(&cfg.toolchain) {
        Ok(version) => println!("{} ({})", "online".green(), version),
        Err(_) => {
            println!("{}", "offline".yellow());
            println!(
                "  {}  Cells will fail until '{}' is installed.",
                "Toolchain not detected.".dimmed(),
                cfg.toolchain.bold()
            );
        }
    }

    // ── Bridge + session ──────────────────────────────────────────────────
    let command = ToolchainCommand {
        program: cfg.toolchain.clone(),
        args: cfg.toolchain_args.clone(),
        bin_dir: cfg.toolchain_bin_dir.clone().map(PathBuf::from),
        workdir: cfg.workdir.clone().map(PathBuf::from),
    };
    let bridge = Arc::new(SubprocessBridge::new(
        command,
        cfg.effective_scratch_dir(),
        cfg.source_ext.clone(),
    ));

    let directives = if cfg.source_location_directives {
        DirectiveStyle::SourceLocation
    } else {
        DirectiveStyle::Off
    };
    let session_config = SessionConfig {
        preprocessor: PreprocessorConfig {
            include_dirs: cfg.include_dirs.iter().map(PathBuf::from).collect(),
            directives,
        },
        completion_enabled: false,
    };
    let mut session = KernelSession::new(Arc::clone(&bridge) as Arc<dyn RuntimeBridge>, session_config);

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    // Installed before the signal guard engages, so the handler thread is
    // created with SIGINT still deliverable. An interrupt cancels the
    // in-flight cell instead of tearing the process down.
    let bridge_for_ctrlc = Arc::clone(&bridge);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Interrupt received – cancelling the running cell …".yellow().bold());
        bridge_for_ctrlc.interrupt();
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; cell interruption will not be available");
    }

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Run loop ──────────────────────────────────────────────────────────
    // The Tokio runtime is created only after tracing init, and the launch
    // future (which masks SIGINT on this thread) runs on the main thread
    // via block_on.
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: failed to start async runtime: {}", "Fatal".red().bold(), e);
            std::process::exit(1);
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut app = repl::ReplApp::new(shutdown, cfg);

    info!("starting interactive kernel front-end");
    if let Err(e) = runtime.block_on(launch(&mut app, &mut session)) {
        eprintln!("{}: {}", "Fatal".red().bold(), e);
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn load_config_or_default() -> config::Config {
    match config::load() {
        Ok(Some(c)) => c,
        Ok(None) => config::default_with_overrides(),
        Err(e) => {
            println!("{}: {} – using defaults", "Config error".red(), e);
            config::default_with_overrides()
        }
    }
}

fn print_banner() {
    println!();
    println!("  {} {}",
        "glot".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Interactive language-bridge kernel front-end");
    println!();
}
