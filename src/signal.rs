//! Ctrl+C handling for graceful shutdown.
//!
//! A single `AtomicBool` is shared with the walker, the hashing pool and the
//! relocator. Raising it stops new work from starting: no file is hashed or
//! moved after the flag is seen, and moves that already completed stay
//! completed.
//!
//! ```rust,no_run
//! use dupestage::signal::install_handler;
//! use dupestage::duplicates::FinderConfig;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let config = FinderConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with the flag lowered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag for worker components.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Lower the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install a Ctrl+C handler that raises the shutdown flag.
///
/// The process-wide hook is registered once. Later calls (for example from
/// tests running `run_app` in parallel) get the same handler back with its
/// flag lowered.
///
/// # Errors
///
/// Returns `InstallFailed` if the OS hook cannot be registered and no
/// handler exists yet.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Finishing the current file..."
        );
        log::info!("Shutdown signal received");
    });

    match installed {
        Ok(()) => Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone()),
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler already registered, using unhooked handler");
            Ok(GLOBAL_HANDLER.get_or_init(ShutdownHandler::new).clone())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
