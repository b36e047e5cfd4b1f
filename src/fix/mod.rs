//! The fix planner: turns violations' suggested fixes into a deterministic,
//! non-overlapping stream of text edits per file.

mod planner;
mod resolvers;

pub use planner::{apply_fixes, AppliedFix, FixOutcome, UnappliedFix};
pub use resolvers::{find_resolver, install_builtin_resolvers, register_resolver, FixResolver};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation for long fix runs. On cancellation the planner
/// returns whatever per-file results it has completed so far.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
