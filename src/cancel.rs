//! Run-scoped cancellation.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag raised once to cancel a run.
///
/// Clones observe the same flag. The orchestrator stops dispatching when it
/// is raised and running commands are asked to terminate.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    raised: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an unraised token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn cancel(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// Return `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }
}

/// Raise `token` on Ctrl-C.
///
/// # Errors
///
/// Returns an error if a handler is already installed for this process.
pub fn install_ctrlc_handler(token: &CancelToken) -> Result<(), ctrlc::Error> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, cancelling run");
        token.cancel();
    })
}
