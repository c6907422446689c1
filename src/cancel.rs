// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation signal for one scan.
///
/// Cancellation is advisory: an in-flight request is never aborted. The
/// orchestrator consults the token at each mutation boundary and exits
/// cleanly with the findings accumulated so far.
#[derive(Debug, Clone, Default)]
pub struct ScanToken {
    cancelled: Arc<AtomicBool>,
}

impl ScanToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raised by `stopScan`; observed at the next mutation boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Cleared at the start of every scan.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
