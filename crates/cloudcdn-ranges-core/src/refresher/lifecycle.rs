//! Refresher lifecycle states

use std::fmt;

/// Lifecycle of a [`crate::RangeRefresher`]
///
/// ```text
/// NotStarted ──start()──▶ Running ──stop()/cancel──▶ Stopped
///      └──────────────stop()/cancel──────────────────▲
/// ```
///
/// `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Constructed, no fetch attempted yet
    NotStarted,
    /// Background refresh task is scheduled
    Running,
    /// Shutdown signaled; the cache stays readable
    Stopped,
}

impl Lifecycle {
    pub fn is_running(self) -> bool {
        self == Lifecycle::Running
    }

    pub fn is_stopped(self) -> bool {
        self == Lifecycle::Stopped
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Lifecycle::NotStarted => "not started",
            Lifecycle::Running => "running",
            Lifecycle::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
