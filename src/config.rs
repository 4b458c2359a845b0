use std::time::Duration;

/// Timer cadences and toast lifetime for the synchronization subsystem.
///
/// Three timers can be live at once: the app-wide background poll, the
/// app-wide unread refresh, and one local refresh per open chat surface.
/// All intervals are configurable so tests can shrink them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    /// Background poller cadence over all registered sessions.
    pub poll_interval: Duration,
    /// Local transcript refresh cadence for an open chat surface.
    pub surface_refresh_interval: Duration,
    /// Unread aggregate refresh cadence.
    pub unread_refresh_interval: Duration,
    /// Lifetime of a non-persistent toast.
    pub toast_ttl: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            surface_refresh_interval: Duration::from_secs(3),
            unread_refresh_interval: Duration::from_secs(30),
            toast_ttl: Duration::from_secs(5),
        }
    }
}
