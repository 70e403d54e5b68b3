use super::defaults::{MAX_BATCH_GET_KEYS, MAX_BATCH_WRITE_ITEMS};
use super::types::TesseraConfig;
use std::fs;
use std::path::Path;
use tessera_commons::EntityType;

impl TesseraConfig {
    /// Load configuration from a TOML file, apply `TESSERA_*` environment
    /// overrides and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides()?;
        config.finalize()?;

        Ok(config)
    }

    /// Parse TOML without environment overrides or validation.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.finalize()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(kind) = lookup("TESSERA_BACKEND_KIND") {
            self.backend.kind = kind;
        }
        if let Some(endpoint) = lookup("TESSERA_BACKEND_ENDPOINT") {
            self.backend.endpoint = endpoint;
        }
        if let Some(endpoint) = lookup("TESSERA_BACKEND_ACCELERATED_ENDPOINT") {
            self.backend.accelerated_endpoint = Some(endpoint).filter(|e| !e.trim().is_empty());
        }
        if let Some(region) = lookup("TESSERA_BACKEND_REGION") {
            self.backend.region = region;
        }
        if let Some(count) = lookup("TESSERA_MAX_RETRY_COUNT") {
            self.batch.max_retry_count = count
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid TESSERA_MAX_RETRY_COUNT value: {}", count))?;
        }
        if let Some(level) = lookup("TESSERA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(val) = lookup("TESSERA_LOG_TO_CONSOLE") {
            self.logging.log_to_console =
                val.eq_ignore_ascii_case("true") || val == "1" || val.eq_ignore_ascii_case("yes");
        }
        Ok(())
    }

    /// Normalize and validate.
    ///
    /// Call this after applying environment overrides.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        self.backend.kind = self.backend.kind.trim().to_lowercase();
        self.logging.level = self.logging.level.trim().to_lowercase();
        self.logging.format = self.logging.format.trim().to_lowercase();

        self.validate()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self.backend.kind.as_str() {
            "memory" => {}
            "http" => {
                if self.backend.endpoint.trim().is_empty() {
                    return Err(anyhow::anyhow!("backend.endpoint is required for the http backend"));
                }
            }
            other => {
                return Err(anyhow::anyhow!(
                    "Invalid backend kind '{}'. Must be one of: memory, http",
                    other
                ))
            }
        }

        if self.backend.request_timeout_ms == 0 {
            return Err(anyhow::anyhow!("backend.request_timeout_ms cannot be 0"));
        }

        if !(1..=MAX_BATCH_WRITE_ITEMS).contains(&self.batch.write_chunk_size) {
            return Err(anyhow::anyhow!(
                "batch.write_chunk_size must be between 1 and {}",
                MAX_BATCH_WRITE_ITEMS
            ));
        }

        if !(1..=MAX_BATCH_GET_KEYS).contains(&self.batch.read_chunk_size) {
            return Err(anyhow::anyhow!(
                "batch.read_chunk_size must be between 1 and {}",
                MAX_BATCH_GET_KEYS
            ));
        }

        if self.shards.available_shards_table.trim().is_empty()
            || self.shards.managed_shards_table.trim().is_empty()
        {
            return Err(anyhow::anyhow!("control table names cannot be empty"));
        }

        if self.shards.available_shards_table == self.shards.managed_shards_table {
            return Err(anyhow::anyhow!(
                "available and managed shard tables must differ ('{}')",
                self.shards.available_shards_table
            ));
        }

        for entity_type in self.shards.defaults.keys() {
            entity_type.parse::<EntityType>().map_err(|e| {
                anyhow::anyhow!("Invalid key in shards.defaults: {}", e)
            })?;
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }
        for (target, level) in &self.logging.targets {
            if !valid_levels.contains(&level.as_str()) {
                return Err(anyhow::anyhow!(
                    "Invalid log level '{}' for target '{}'. Must be one of: {}",
                    level,
                    target,
                    valid_levels.join(", ")
                ));
            }
        }

        let valid_formats = ["compact", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = TesseraConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch.max_retry_count, 10);
        assert_eq!(config.batch.write_chunk_size, 25);
    }

    #[test]
    fn test_example_config_parses() {
        let mut config =
            TesseraConfig::from_toml_str(include_str!("../../../../config.example.toml")).unwrap();
        config.finalize().unwrap();
        assert_eq!(config.backend.kind, "http");
        assert_eq!(config.shards.defaults["transactionLog"].len(), 2);
        assert_eq!(config.logging.targets["tessera_store"], "info");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = TesseraConfig::from_toml_str(
            r#"
            [batch]
            max_retry_count = 3

            [shards.defaults]
            transactionLog = ["tl_shard_1", "tl_shard_2"]
            "#,
        )
        .unwrap();

        assert_eq!(config.batch.max_retry_count, 3);
        assert_eq!(config.batch.read_retry_step_ms, 300);
        assert_eq!(config.shards.available_shards_table, "available_shards");
        assert_eq!(config.shards.defaults["transactionLog"].len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_default_entity_type() {
        let mut config = TesseraConfig::default();
        config
            .shards
            .defaults
            .insert("balances".to_string(), vec!["b_1".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_chunk_size_limits() {
        let mut config = TesseraConfig::default();
        config.batch.write_chunk_size = 26;
        assert!(config.validate().is_err());

        let mut config = TesseraConfig::default();
        config.batch.read_chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_backend_kind() {
        let mut config = TesseraConfig::default();
        config.backend.kind = "Cassandra".to_string();
        assert!(config.finalize().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("TESSERA_BACKEND_KIND", "http"),
            ("TESSERA_BACKEND_ACCELERATED_ENDPOINT", "http://dax:8111"),
            ("TESSERA_MAX_RETRY_COUNT", "4"),
            ("TESSERA_LOG_TO_CONSOLE", "no"),
        ]
        .into_iter()
        .collect();

        let mut config = TesseraConfig::default();
        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.backend.kind, "http");
        assert_eq!(config.backend.accelerated_endpoint.as_deref(), Some("http://dax:8111"));
        assert_eq!(config.batch.max_retry_count, 4);
        assert!(!config.logging.log_to_console);
    }

    #[test]
    fn test_invalid_retry_override() {
        let mut config = TesseraConfig::default();
        let result = config.apply_overrides_from(|key| {
            (key == "TESSERA_MAX_RETRY_COUNT").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[logging]\nlevel = \"DEBUG\"\nformat = \"json\"\n\n[shards]\nmanaged_shards_table = \"ms\""
        )
        .unwrap();

        let config = TesseraConfig::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.shards.managed_shards_table, "ms");
    }
}
