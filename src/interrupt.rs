//! Cooperative cancellation on Ctrl-C.
//!
//! The first interrupt only raises a flag that the scan loop polls between
//! files, so the file in progress completes and the database is flushed. A
//! second interrupt terminates the process immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status of a process killed by SIGINT, as reported by shells.
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Shared flag polled by long-running loops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Returns whether it was already raised.
    pub fn cancel(&self) -> bool {
        self.flag.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Routes Ctrl-C to `token`. Fails if a handler is already installed.
pub fn install_sigint_handler(token: &CancelToken) -> Result<(), ctrlc::Error> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        if token.cancel() {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    })
}
