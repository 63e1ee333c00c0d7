use std::time::Duration;
use url::Url;

const DEFAULT_SYNC_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";

/// Service configuration
#[derive(Clone)]
pub struct AppConfig {
    pub host: [u8; 4],
    pub port: u16,
    pub database_url: String,

    // Remote sync configuration
    pub sync_enabled: bool,           // Enable the periodic sync task
    pub sync_endpoint: Url,           // Remote quote feed URL
    pub sync_interval_seconds: u64,   // Interval between sync cycles (seconds)
    pub sync_fetch_limit: u32,        // Number of remote records per fetch
    pub sync_timeout_seconds: u64,    // HTTP request timeout (seconds)
}

impl AppConfig {
    /// Default configuration
    pub fn default() -> AppConfig {
        AppConfig {
            host: [127, 0, 0, 1],
            port: 3000,
            database_url: "sqlite://data/quotesync.db".to_string(),

            sync_enabled: true,
            sync_endpoint: Url::parse(DEFAULT_SYNC_ENDPOINT)
                .expect("default sync endpoint is a valid URL"),
            sync_interval_seconds: 60, // One sync cycle per minute
            sync_fetch_limit: 10,
            sync_timeout_seconds: 10,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> AppConfig {
        let mut config = AppConfig::default();

        if let Ok(port) = std::env::var("PORT") {
            match port.parse::<u16>() {
                Ok(value) => config.port = value,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse PORT '{}': {}, using default: {}",
                        port,
                        e,
                        config.port
                    );
                }
            }
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Ok(enabled) = std::env::var("SYNC_ENABLED") {
            config.sync_enabled = enabled.to_lowercase() == "true" || enabled == "1";
        }

        if let Ok(endpoint) = std::env::var("SYNC_ENDPOINT") {
            match Url::parse(&endpoint) {
                Ok(url) => config.sync_endpoint = url,
                Err(e) => {
                    tracing::warn!(
                        "Invalid SYNC_ENDPOINT '{}': {}, using default: {}",
                        endpoint,
                        e,
                        config.sync_endpoint
                    );
                }
            }
        }

        if let Ok(interval) = std::env::var("SYNC_INTERVAL_SECONDS") {
            match interval.parse::<u64>() {
                Ok(value) if (10..=3600).contains(&value) => {
                    config.sync_interval_seconds = value;
                }
                Ok(value) => {
                    tracing::warn!(
                        "Invalid SYNC_INTERVAL_SECONDS value: {} (must be between 10 and 3600), using default: {}",
                        value, config.sync_interval_seconds
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse SYNC_INTERVAL_SECONDS '{}': {}, using default: {}",
                        interval,
                        e,
                        config.sync_interval_seconds
                    );
                }
            }
        }

        if let Ok(limit) = std::env::var("SYNC_FETCH_LIMIT") {
            if let Ok(value) = limit.parse::<u32>() {
                if (1..=100).contains(&value) {
                    config.sync_fetch_limit = value;
                }
            }
        }

        if let Ok(timeout) = std::env::var("SYNC_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse::<u64>() {
                if (1..=60).contains(&value) {
                    config.sync_timeout_seconds = value;
                }
            }
        }

        config
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_seconds)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.sync_interval_seconds, 60);
        assert_eq!(config.sync_fetch_limit, 10);
        assert!(config.sync_enabled);
        assert_eq!(config.sync_endpoint.as_str(), DEFAULT_SYNC_ENDPOINT);
    }

    #[test]
    fn test_durations() {
        let config = AppConfig::default();
        assert_eq!(config.sync_interval(), Duration::from_secs(60));
        assert_eq!(config.sync_timeout(), Duration::from_secs(10));
    }
}
