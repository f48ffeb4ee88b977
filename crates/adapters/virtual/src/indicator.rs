use std::sync::atomic::{AtomicBool, Ordering};

use fieldnode_app::ports::StatusIndicator;

/// Status indicator that reports through the log instead of an LED.
#[derive(Debug, Default)]
pub struct LogIndicator {
    operational: AtomicBool,
}

impl LogIndicator {
    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.operational.load(Ordering::SeqCst)
    }
}

impl StatusIndicator for LogIndicator {
    fn set_operational(&self, operational: bool) {
        if self.operational.swap(operational, Ordering::SeqCst) != operational {
            tracing::info!(operational, "status indicator changed");
        }
    }
}
