//! Cooperative shutdown token.
//!
//! A single process-wide flag, set by the Ctrl-C handler and read exactly
//! once per loop iteration at the top of the loop body. A signal arriving
//! mid-iteration never interrupts an in-flight command execution or publish;
//! the current iteration always completes before the flag is observed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Cloneable cancellation token checked at iteration boundaries.
#[derive(Clone, Debug, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Safe to call from any task or signal handler.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Spawn a task that cancels this token on Ctrl-C.
    ///
    /// Must be called from within a tokio runtime.
    pub fn install_ctrl_c_handler(&self) {
        let token = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("shutdown signal received, finishing current iteration");
                    token.cancel();
                }
                Err(e) => {
                    error!("failed to listen for shutdown signal: {}", e);
                }
            }
        });
    }
}
