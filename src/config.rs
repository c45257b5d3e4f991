//! Service configuration

use std::str::FromStr;
use std::time::Duration;

use crate::orchestrator::OrchestratorConfig;

/// Service configuration, read from the environment.
///
/// Every external dependency is optional. Without `DATABASE_URL` the
/// service runs on an in-memory repository, without `REDIS_URL` on an
/// in-memory cache, and without `KAFKA_BROKERS` events are discarded and
/// watching is refused.
#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub metrics_port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: Option<String>,
    /// Comma-separated broker list, kept as one string for librdkafka
    pub kafka_brokers: Option<String>,
    pub kafka_topic: String,
    /// Prefix for the per-watcher consumer groups
    pub kafka_group_id: String,
    pub cache_ttl: Duration,
    pub io_timeout: Duration,
    pub app_version: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            http_port: number(set("HTTP_PORT"), 8080),
            metrics_port: number(set("METRICS_PORT"), 9090),
            database_url: set("DATABASE_URL"),
            database_max_connections: number(set("DATABASE_MAX_CONNECTIONS"), 25),
            redis_url: set("REDIS_URL"),
            kafka_brokers: set("KAFKA_BROKERS"),
            kafka_topic: set("KAFKA_TOPIC").unwrap_or_else(|| "order-events".into()),
            kafka_group_id: set("KAFKA_GROUP_ID").unwrap_or_else(|| "ordersvc".into()),
            cache_ttl: Duration::from_secs(number(set("CACHE_TTL_SECS"), 300)),
            io_timeout: Duration::from_millis(number(set("IO_TIMEOUT_MS"), 5000)),
            app_version: set("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            cache_ttl: self.cache_ttl,
            io_timeout: self.io_timeout,
        }
    }
}

/// Parse straight into the target type; anything unparsable or out of range
/// falls back to `default`.
fn number<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let cfg = config(&[]);

        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.metrics_port, 9090);
        assert!(cfg.database_url.is_none());
        assert!(cfg.redis_url.is_none());
        assert!(cfg.kafka_brokers.is_none());
        assert_eq!(cfg.kafka_topic, "order-events");
        assert_eq!(cfg.kafka_group_id, "ordersvc");
        assert_eq!(cfg.cache_ttl, Duration::from_secs(300));
        assert_eq!(cfg.io_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let cfg = config(&[("KAFKA_BROKERS", "  "), ("REDIS_URL", "")]);

        assert!(cfg.kafka_brokers.is_none());
        assert!(cfg.redis_url.is_none());
    }

    #[test]
    fn test_overrides_are_applied() {
        let cfg = config(&[
            ("HTTP_PORT", "3000"),
            ("DATABASE_URL", "postgres://orders@localhost/orders"),
            ("KAFKA_BROKERS", "a:9092,b:9092"),
            ("CACHE_TTL_SECS", "60"),
            ("IO_TIMEOUT_MS", "250"),
        ]);

        assert_eq!(cfg.http_port, 3000);
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://orders@localhost/orders"));
        assert_eq!(cfg.kafka_brokers.as_deref(), Some("a:9092,b:9092"));
        assert_eq!(cfg.orchestrator().cache_ttl, Duration::from_secs(60));
        assert_eq!(cfg.orchestrator().io_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_unparsable_number_falls_back_to_default() {
        let cfg = config(&[("HTTP_PORT", "eighty")]);
        assert_eq!(cfg.http_port, 8080);
    }

    #[test]
    fn test_out_of_range_number_falls_back_to_default() {
        let cfg = config(&[
            ("HTTP_PORT", "70000"),
            ("METRICS_PORT", "-1"),
            ("DATABASE_MAX_CONNECTIONS", "4294967296"),
        ]);

        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.metrics_port, 9090);
        assert_eq!(cfg.database_max_connections, 25);
    }
}
