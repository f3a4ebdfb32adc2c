use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Result, SubdubError};

/// Shared cancellation flag, checked by the pipeline between stages.
///
/// External processes are not interrupted mid-run; a cancelled pipeline stops at
/// the next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SubdubError::Cancelled)
        } else {
            Ok(())
        }
    }
}
