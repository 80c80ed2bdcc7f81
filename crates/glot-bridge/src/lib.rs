//! `glot-bridge` – The Runtime Bridge
//!
//! The seam between the kernel front-end and the foreign-language runtime.
//! The front-end never talks to a toolchain directly; it holds a
//! [`RuntimeBridge`] trait object and lets the bridge translate between the
//! kernel's call shape and the runtime's native one.
//!
//! # Modules
//!
//! - [`bridge`] – the [`RuntimeBridge`] trait and [`BridgeError`].
//! - [`output`] – [`OutputBus`]: a broadcast channel that forwards captured
//!   stdout/stderr chunks while foreign code is running.
//! - [`subprocess`] – [`SubprocessBridge`]: evaluates cells by writing them
//!   to a scratch file and spawning an external toolchain binary on it.
//! - [`null`] – [`NullBridge`]: a no-op delegate for tests and dry runs.

pub mod bridge;
pub mod null;
pub mod output;
pub mod subprocess;

pub use bridge::{BridgeError, RuntimeBridge};
pub use null::NullBridge;
pub use output::OutputBus;
pub use subprocess::{SubprocessBridge, ToolchainCommand};
