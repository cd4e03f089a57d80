// Loxwatch Client - Miniserver websocket client
// Copyright (c) 2025 Loxwatch contributors
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! Configuration types for the Miniserver client

use std::fmt;
use std::time::Duration;

/// Connection settings for one Miniserver
#[derive(Clone)]
pub struct ClientConfig {
    /// Host name or `host:port` of the Miniserver
    pub host: String,

    /// User name
    pub user: String,

    /// Password
    pub password: String,

    /// Maximum wait for a command response (default: 10 s)
    pub response_timeout: Duration,

    /// Interval between keepalive messages (default: 60 s)
    pub keepalive_interval: Duration,

    /// Capacity of the event channel (default: 1024)
    pub event_buffer: usize,
}

impl ClientConfig {
    /// Create a configuration with default timings
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            response_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(60),
            event_buffer: 1024,
        }
    }

    /// Websocket endpoint of the Miniserver
    pub fn url(&self) -> String {
        let host = self
            .host
            .trim_start_matches("http://")
            .trim_start_matches("ws://")
            .trim_end_matches('/');
        format!("ws://{}/ws/rfc6455", host)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("response_timeout", &self.response_timeout)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::new("192.168.1.77", "admin", "secret");
        assert_eq!(config.response_timeout, Duration::from_secs(10));
        assert_eq!(config.keepalive_interval, Duration::from_secs(60));
        assert_eq!(config.event_buffer, 1024);
    }

    #[test]
    fn test_client_config_url() {
        assert_eq!(
            ClientConfig::new("192.168.1.77", "u", "p").url(),
            "ws://192.168.1.77/ws/rfc6455"
        );
        assert_eq!(
            ClientConfig::new("http://miniserver:8080/", "u", "p").url(),
            "ws://miniserver:8080/ws/rfc6455"
        );
    }

    #[test]
    fn test_client_config_debug_redacts_password() {
        let config = ClientConfig::new("host", "admin", "hunter2");
        let debug = format!("{:?}", config);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
