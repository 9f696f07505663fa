use std::time::Duration;

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PICKUP_WINDOW_HOURS: u32 = 12;

/// Runtime settings shared by the resolvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementConfig {
    /// Upper bound on any single payment gateway call.
    pub gateway_timeout: Duration,
    /// Upper bound on delivering one guest notice.
    pub notify_timeout: Duration,
    /// Length of the pickup window opened when a booking is approved.
    pub pickup_window: chrono::Duration,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            gateway_timeout: DEFAULT_GATEWAY_TIMEOUT,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            pickup_window: chrono::Duration::hours(i64::from(DEFAULT_PICKUP_WINDOW_HOURS)),
        }
    }
}

impl SettlementConfig {
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }

    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    pub fn with_pickup_window_hours(mut self, hours: u32) -> Self {
        self.pickup_window = chrono::Duration::hours(i64::from(hours));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SettlementConfig::default();
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert_eq!(config.notify_timeout, Duration::from_secs(5));
        assert_eq!(config.pickup_window, chrono::Duration::hours(12));

        let custom = config
            .with_gateway_timeout(Duration::from_millis(250))
            .with_notify_timeout(Duration::from_millis(100))
            .with_pickup_window_hours(24);
        assert_eq!(custom.gateway_timeout.as_millis(), 250);
        assert_eq!(custom.notify_timeout.as_millis(), 100);
        assert_eq!(custom.pickup_window.num_hours(), 24);
    }
}
