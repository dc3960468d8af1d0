//! Session configuration.

use std::time::Duration;

/// Default reconnection grace period.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a disconnected client keeps its room membership and state
    /// before it is evicted. A connect with the same client id inside this
    /// window resumes the old presence.
    ///
    /// Default: [`GRACE_PERIOD`] (5 seconds).
    pub reconnect_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: GRACE_PERIOD,
        }
    }
}
