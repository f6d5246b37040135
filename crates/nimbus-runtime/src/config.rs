//! Bus configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable parameters of a bus instance.
///
/// Defaults are production-safe; tests typically shrink the timeouts.
///
/// # Example
///
/// ```
/// use nimbus_runtime::BusConfig;
/// use std::time::Duration;
///
/// let config = BusConfig {
///     default_response_timeout: Duration::from_secs(2),
///     ..BusConfig::default()
/// };
/// assert_eq!(config.max_delivery_attempts, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Maximum number of deliveries before a message is dead-lettered.
    pub max_delivery_attempts: u32,

    /// Time-to-live stamped on outgoing envelopes.
    pub default_message_time_to_live: Duration,

    /// Idle time after which the transport may delete an entity.
    /// `None` disables auto-deletion.
    pub auto_delete_on_idle: Option<Duration>,

    /// Timeout for entity management operations, including the bulk
    /// known-set warm-up.
    pub default_timeout: Duration,

    /// Peek-lock duration requested on created entities.
    pub default_message_lock_duration: Duration,

    /// Whether the transport should dead-letter messages that expire on
    /// the wire, instead of silently dropping them.
    pub enable_dead_lettering_on_message_expiration: bool,

    /// Deadline applied to `request` calls that do not pass their own.
    pub default_response_timeout: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_delivery_attempts: 5,
            default_message_time_to_live: Duration::from_secs(10 * 60),
            auto_delete_on_idle: None,
            default_timeout: Duration::from_secs(10),
            default_message_lock_duration: Duration::from_secs(30),
            enable_dead_lettering_on_message_expiration: false,
            default_response_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = BusConfig::default();
        assert_eq!(config.max_delivery_attempts, 5);
        assert_eq!(config.default_message_time_to_live, Duration::from_secs(600));
        assert!(config.auto_delete_on_idle.is_none());
        assert!(!config.enable_dead_lettering_on_message_expiration);
    }

    #[test]
    fn serde_round_trip_with_partial_input() {
        let config: BusConfig =
            serde_json::from_str(r#"{"max_delivery_attempts": 3}"#).unwrap();
        assert_eq!(config.max_delivery_attempts, 3);
        assert_eq!(config.default_timeout, Duration::from_secs(10));
    }
}
