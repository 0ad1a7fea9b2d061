use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "RECORD_RELAY_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("Invalid workers: {0}. Must be between 1 and 256")]
    InvalidWorkers(usize),

    #[error("Invalid worker_queue_size: {0}. Must be at least 1")]
    InvalidWorkerQueueSize(usize),

    #[error("Invalid max_block_count: {0}. Must be at least 1")]
    InvalidBlockCount(usize),

    #[error("Invalid flush_timeout_secs: {0}. Must be at least 1")]
    InvalidFlushTimeout(u64),

    #[error("Invalid cache timeout_secs: {0}. Must be at least 1")]
    InvalidCacheTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .record-relay/config.yaml
    /// 3. .record-relay/local.yaml (optional local overrides)
    /// 4. Environment variables (RECORD_RELAY_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".record-relay/config.yaml"))
            .merge(Yaml::file(".record-relay/local.yaml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        // Queues
        if config.queue.out_queue.trim().is_empty() {
            return Err(ConfigError::MissingSetting("queue.out_queue"));
        }

        if config.queue.url.trim().is_empty() {
            return Err(ConfigError::MissingSetting("queue.url"));
        }

        if config.queue.max_block_count == 0 {
            return Err(ConfigError::InvalidBlockCount(config.queue.max_block_count));
        }

        if config.queue.cache_queue == config.queue.out_queue {
            return Err(ConfigError::ValidationFailed(
                "cache_queue must differ from out_queue".to_string(),
            ));
        }

        // Workers
        if config.worker.workers == 0 || config.worker.workers > 256 {
            return Err(ConfigError::InvalidWorkers(config.worker.workers));
        }

        if config.worker.worker_queue_size == 0 {
            return Err(ConfigError::InvalidWorkerQueueSize(
                config.worker.worker_queue_size,
            ));
        }

        if config.worker.flush_timeout_secs == 0 {
            return Err(ConfigError::InvalidFlushTimeout(
                config.worker.flush_timeout_secs,
            ));
        }

        // Cache
        if config.cache.host.trim().is_empty() {
            return Err(ConfigError::MissingSetting("cache.host"));
        }

        if config.cache.timeout_secs == 0 {
            return Err(ConfigError::InvalidCacheTimeout(config.cache.timeout_secs));
        }

        // Logging
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(
                config.logging.rotation.clone(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.queue.out_queue = "virgo4-ingest-out".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.worker.workers, 4);
        assert_eq!(config.worker.flush_timeout_secs, 5);
        assert_eq!(config.queue.max_block_count, 10);
        assert_eq!(config.queue.send_retries, 3);
        assert_eq!(config.cache.port, 6379);
        assert_eq!(config.cache.slow_request_ms, 100);
        assert_eq!(config.logging.level, "info");
        assert!(!config.queue.cache_queue_enabled());
    }

    #[test]
    fn test_default_config_requires_out_queue() {
        let result = ConfigLoader::validate(&Config::default());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::MissingSetting("queue.out_queue")
        ));
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
queue:
  out_queue: records-out
  cache_queue: records-cache
  max_block_count: 200
  send_retries: 5
worker:
  workers: 8
  worker_queue_size: 5000
  flush_timeout_secs: 2
cache:
  host: cache.internal
  port: 6380
  password: hunter2
  db: 2
  pool_size: 16
metadata:
  operation: update
logging:
  level: debug
  format: pretty
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.queue.out_queue, "records-out");
        assert!(config.queue.cache_queue_enabled());
        assert_eq!(config.queue.max_block_count, 200);
        assert_eq!(config.queue.send_retries, 5);
        assert_eq!(config.worker.workers, 8);
        assert_eq!(config.worker.worker_queue_size, 5000);
        assert_eq!(config.worker.flush_timeout_secs, 2);
        assert_eq!(config.worker.progress_interval, 1000);
        assert_eq!(config.cache.host, "cache.internal");
        assert_eq!(config.cache.password.as_deref(), Some("hunter2"));
        assert_eq!(config.cache.effective_pool_size(config.worker.workers), 16);
        assert_eq!(config.metadata.operation.as_deref(), Some("update"));
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.rotation, "daily");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_pool_size_defaults_to_workers() {
        let config = valid_config();
        assert_eq!(config.cache.effective_pool_size(7), 7);
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = valid_config();
        config.worker.workers = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidWorkers(0)
        ));
    }

    #[test]
    fn test_validate_zero_block_count() {
        let mut config = valid_config();
        config.queue.max_block_count = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBlockCount(0)
        ));
    }

    #[test]
    fn test_validate_zero_flush_timeout() {
        let mut config = valid_config();
        config.worker.flush_timeout_secs = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidFlushTimeout(0)
        ));
    }

    #[test]
    fn test_validate_same_queue_twice() {
        let mut config = valid_config();
        config.queue.cache_queue = config.queue.out_queue.clone();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = valid_config();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = valid_config();
        config.logging.format = "xml".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogFormat(format) => assert_eq!(format, "xml"),
            other => panic!("Expected InvalidLogFormat error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_rotation() {
        let mut config = valid_config();
        config.logging.rotation = "weekly".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogRotation(_)
        ));
    }

    #[test]
    fn test_load_from_file_with_env_override() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "queue:\n  out_queue: from-file\nworker:\n  workers: 2\nlogging:\n  level: warn"
        )
        .unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("RECORD_RELAY_WORKER__WORKERS", Some("12")),
                ("RECORD_RELAY_CACHE__HOST", Some("redis.example")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert_eq!(config.queue.out_queue, "from-file");
                assert_eq!(config.worker.workers, 12, "Env should win over file");
                assert_eq!(config.cache.host, "redis.example");
                assert_eq!(config.logging.level, "warn");
            },
        );
    }

    #[test]
    fn test_load_from_file_missing_out_queue_fails() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "worker:\n  workers: 2").unwrap();
        file.flush().unwrap();

        temp_env::with_vars_unset(["RECORD_RELAY_QUEUE__OUT_QUEUE"], || {
            assert!(ConfigLoader::load_from_file(file.path()).is_err());
        });
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "queue:\n  out_queue: base\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "queue:\n  out_queue: override\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.queue.out_queue, "override", "Override should win");
        assert_eq!(
            config.logging.level, "debug",
            "Override should win for nested fields"
        );
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
    }
}
