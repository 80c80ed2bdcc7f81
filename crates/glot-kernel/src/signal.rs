//! [`SignalGuard`] – scoped SIGINT masking.
//!
//! The front-end blocks SIGINT on the invoking thread *before* the run
//! loop starts, so an interrupt is never delivered to the platform default
//! handler mid-startup; once the loop is running, interrupts are handled
//! deliberately (a dedicated handler thread forwards them to the bridge).
//!
//! The guard is RAII: dropping it restores the thread's previous mask, so
//! the mask lives exactly as long as the run loop. On non-unix targets the
//! guard is a no-op.

use glot_types::GlotError;

#[cfg(unix)]
use nix::sys::signal::{SigSet, Signal, SigmaskHow, pthread_sigmask};

/// Holds SIGINT blocked on the constructing thread until dropped.
#[derive(Debug)]
pub struct SignalGuard {
    #[cfg(unix)]
    previous: SigSet,
}

impl SignalGuard {
    /// Block SIGINT on the calling thread, remembering the previous mask.
    ///
    /// # Errors
    ///
    /// Returns [`GlotError::Signal`] if the mask cannot be changed.
    #[cfg(unix)]
    pub fn block_interrupt() -> Result<Self, GlotError> {
        let mut block = SigSet::empty();
        block.add(Signal::SIGINT);
        let mut previous = SigSet::empty();
        pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut previous))
            .map_err(|e| GlotError::Signal(e.to_string()))?;
        Ok(Self { previous })
    }

    #[cfg(not(unix))]
    pub fn block_interrupt() -> Result<Self, GlotError> {
        Ok(Self {})
    }
}

#[cfg(unix)]
impl Drop for SignalGuard {
    fn drop(&mut self) {
        // Restore the pre-guard mask; nothing useful to do on failure here.
        let _ = pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None);
    }
}

/// Whether SIGINT is currently blocked on the calling thread.
#[cfg(unix)]
pub fn interrupt_blocked() -> bool {
    let mut current = SigSet::empty();
    match pthread_sigmask(SigmaskHow::SIG_BLOCK, None, Some(&mut current)) {
        Ok(()) => current.contains(Signal::SIGINT),
        Err(_) => false,
    }
}

#[cfg(not(unix))]
pub fn interrupt_blocked() -> bool {
    false
}
