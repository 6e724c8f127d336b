//! Gateway configuration with validation.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Main gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Bind address.
    pub addr: IpAddr,
    /// Listen port.
    pub port: u16,
    /// Request timeout configuration.
    pub timeouts: TimeoutConfig,
    /// Event buffering and notification configuration.
    pub events: EventConfig,
    /// Worker pool configuration.
    pub workers: WorkerConfig,
    /// Mount the diagnostics router under `/debug/`.
    pub debug_api: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3001,
            timeouts: TimeoutConfig::default(),
            events: EventConfig::default(),
            workers: WorkerConfig::default(),
            debug_api: false,
        }
    }
}

impl GatewayConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeouts.request.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }
        if self.events.buffer_expiration.is_zero() {
            return Err(ConfigError::InvalidEvents(
                "buffer_expiration cannot be 0".into(),
            ));
        }
        if self.events.cleanup_interval.is_zero() {
            return Err(ConfigError::InvalidEvents(
                "cleanup_interval cannot be 0".into(),
            ));
        }
        if self.events.max_retries == 0 {
            return Err(ConfigError::InvalidEvents("max_retries cannot be 0".into()));
        }
        if self.events.notify_capacity == 0 || self.events.internal_capacity == 0 {
            return Err(ConfigError::InvalidEvents(
                "sink capacities cannot be 0".into(),
            ));
        }
        if self.workers.workers == 0 {
            return Err(ConfigError::InvalidWorkers("workers cannot be 0".into()));
        }
        if self.workers.queue == 0 {
            return Err(ConfigError::InvalidWorkers("queue cannot be 0".into()));
        }
        Ok(())
    }

    /// Get the server bind address.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// Per-request timeout configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long a long-poll request may wait for an event.
    pub request: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(10),
        }
    }
}

/// Event buffering and notification configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// How long an event stays replayable.
    pub buffer_expiration: Duration,
    /// How often expired events are swept.
    pub cleanup_interval: Duration,
    /// Delay between notification delivery retries.
    pub retry_interval: Duration,
    /// Total delivery attempts per notification.
    pub max_retries: u32,
    /// Capacity of a waiter's notification sink.
    pub notify_capacity: usize,
    /// Capacity of the manager's internal raw-event channel.
    pub internal_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            buffer_expiration: Duration::from_secs(20),
            cleanup_interval: Duration::from_secs(30),
            retry_interval: Duration::from_secs(1),
            max_retries: 3,
            notify_capacity: 1000,
            internal_capacity: 1000,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of pool workers.
    pub workers: usize,
    /// Bounded job queue length.
    pub queue: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue: 1000,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid event configuration: {0}")]
    InvalidEvents(String),

    #[error("invalid worker configuration: {0}")]
    InvalidWorkers(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 3001);
        assert_eq!(config.timeouts.request, Duration::from_secs(10));
        assert_eq!(config.events.buffer_expiration, Duration::from_secs(20));
        assert_eq!(config.events.cleanup_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = GatewayConfig::default();
        config.timeouts.request = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut config = GatewayConfig::default();
        config.events.max_retries = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEvents(_))
        ));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = GatewayConfig::default();
        config.workers.workers = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWorkers(_))
        ));
    }

    #[test]
    fn test_listen_addr() {
        let config = GatewayConfig::default();
        assert_eq!(config.listen_addr().port(), 3001);
    }
}
