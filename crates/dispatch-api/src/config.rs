//! API configuration.

use std::time::Instant;

/// Listener configuration for the hook and webhook servers.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port of the agent hook server.
    pub hook_port: u16,
    /// Port of the tracker webhook server.
    pub webhook_port: u16,
    /// Shared secret for webhook signatures. `None` accepts unsigned
    /// webhooks.
    pub webhook_secret: Option<String>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl ApiConfig {
    /// Creates a configuration with the given host and ports.
    pub fn new(host: impl Into<String>, hook_port: u16, webhook_port: u16) -> Self {
        Self {
            host: host.into(),
            hook_port,
            webhook_port,
            ..Self::default()
        }
    }

    /// Sets the webhook secret. Empty clears it.
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.webhook_secret = if secret.is_empty() { None } else { Some(secret) };
        self
    }

    /// Returns the hook server bind address.
    pub fn hook_bind_address(&self) -> String {
        format!("{}:{}", self.host, self.hook_port)
    }

    /// Returns the webhook server bind address.
    pub fn webhook_bind_address(&self) -> String {
        format!("{}:{}", self.host, self.webhook_port)
    }

    /// Returns the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            hook_port: 8081,
            webhook_port: 8080,
            webhook_secret: None,
            start_time: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.hook_port, 8081);
        assert_eq!(config.webhook_port, 8080);
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_api_config_bind_addresses() {
        let config = ApiConfig::new("127.0.0.1", 9001, 9000);
        assert_eq!(config.hook_bind_address(), "127.0.0.1:9001");
        assert_eq!(config.webhook_bind_address(), "127.0.0.1:9000");
    }

    #[test]
    fn test_empty_secret_clears() {
        let config = ApiConfig::default().with_webhook_secret("s3cret");
        assert_eq!(config.webhook_secret.as_deref(), Some("s3cret"));
        let config = config.with_webhook_secret("");
        assert!(config.webhook_secret.is_none());
    }
}
