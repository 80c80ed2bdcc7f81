//! `glot-kernel` – The Front-End Engine
//!
//! Everything between the interactive surface (REPL or notebook host) and
//! the [`RuntimeBridge`][glot_bridge::RuntimeBridge]. It does not evaluate
//! foreign code itself; it prepares cells, tracks session state, and
//! classifies what the bridge reports back.
//!
//! # Modules
//!
//! - [`preprocess`] – [`Preprocessor`][preprocess::Preprocessor]: rewrites
//!   cells before evaluation, handling `%include` splices, completion
//!   toggles, and source-location directives.
//! - [`session`] – [`KernelSession`][session::KernelSession]: owns the
//!   bridge handle, the execution counter, and the completion flag; maps
//!   bridge outcomes into [`ExecutionResult`][glot_types::ExecutionResult].
//! - [`signal`] – [`SignalGuard`][signal::SignalGuard]: blocks SIGINT on
//!   the invoking thread before the run loop starts and restores the
//!   previous mask on drop.
//! - [`app`] – [`KernelApp`][app::KernelApp]: the seam for the externally
//!   owned run loop, entered through [`launch`][app::launch].

pub mod app;
pub mod preprocess;
pub mod session;
pub mod signal;

pub use app::{KernelApp, launch};
pub use preprocess::{DirectiveStyle, PreprocessError, Preprocessor, PreprocessorConfig};
pub use session::{KernelSession, SessionConfig};
pub use signal::{SignalGuard, interrupt_blocked};

// Re-export the bridge error so front-ends can match on bridge failures
// without a direct dependency on glot-bridge. A `pub use` preserves type
// identity; this is the same type, not a copy.
pub use glot_bridge::BridgeError;
