//! Config - relay の設定
//!
//! TOML から読み込み、環境変数で上書きできます。
//!
//! ```toml
//! [backend]
//! capacity = 1024
//! overflow = "reject"   # "block" | "reject"
//! error_buffer = 1
//! ```
//!
//! | env                          | field                  |
//! |------------------------------|------------------------|
//! | `RELAY_BACKEND_CAPACITY`     | `backend.capacity`     |
//! | `RELAY_BACKEND_OVERFLOW`     | `backend.overflow`     |
//! | `RELAY_BACKEND_ERROR_BUFFER` | `backend.error_buffer` |

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const ENV_CAPACITY: &str = "RELAY_BACKEND_CAPACITY";
pub const ENV_OVERFLOW: &str = "RELAY_BACKEND_OVERFLOW";
pub const ENV_ERROR_BUFFER: &str = "RELAY_BACKEND_ERROR_BUFFER";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub backend: InMemConfig,
}

/// In-memory backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemConfig {
    /// Queue depth before `overflow` applies.
    pub capacity: usize,
    pub overflow: Overflow,
    /// Results the consumer may report ahead of the error channel reader.
    pub error_buffer: usize,
}

impl Default for InMemConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            overflow: Overflow::Block,
            error_buffer: 1,
        }
    }
}

/// What `publish` does when the queue is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    /// Wait for room.
    #[default]
    Block,
    /// Fail with `PublishError::QueueFull`.
    Reject,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Overflow::Block => f.write_str("block"),
            Overflow::Reject => f.write_str("reject"),
        }
    }
}

impl FromStr for Overflow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Overflow::Block),
            "reject" => Ok(Overflow::Reject),
            other => Err(ConfigError::InvalidValue {
                field: "backend.overflow",
                reason: format!("expected \"block\" or \"reject\", got {other:?}"),
            }),
        }
    }
}

impl RelayConfig {
    /// Parse and validate. Env overrides are not applied.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path`, apply env overrides, validate.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus env overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the process env in practice).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_CAPACITY) {
            self.backend.capacity = parse_usize("backend.capacity", &v)?;
        }
        if let Some(v) = lookup(ENV_OVERFLOW) {
            self.backend.overflow = v.parse()?;
        }
        if let Some(v) = lookup(ENV_ERROR_BUFFER) {
            self.backend.error_buffer = parse_usize("backend.error_buffer", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.backend.error_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "backend.error_buffer",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

fn parse_usize(field: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
            field,
            reason: format!("{value:?}: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = RelayConfig::from_toml("").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.backend.overflow, Overflow::Block);
        assert_eq!(config.backend.error_buffer, 1);
    }

    #[test]
    fn parses_backend_table() {
        let config = RelayConfig::from_toml(
            r#"
            [backend]
            capacity = 8
            overflow = "reject"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.capacity, 8);
        assert_eq!(config.backend.overflow, Overflow::Reject);
        assert_eq!(config.backend.error_buffer, 1);
    }

    #[rstest]
    #[case::zero_capacity("[backend]\ncapacity = 0", "backend.capacity")]
    #[case::zero_error_buffer("[backend]\nerror_buffer = 0", "backend.error_buffer")]
    fn rejects_zero_values(#[case] toml: &str, #[case] expected_field: &str) {
        let err = RelayConfig::from_toml(toml).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { field, .. } if field == expected_field)
        );
    }

    #[test]
    fn unknown_overflow_is_a_parse_error() {
        let err = RelayConfig::from_toml("[backend]\noverflow = \"drop\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut config = RelayConfig::from_toml("[backend]\ncapacity = 8").unwrap();
        let env: HashMap<&str, &str> = [
            (ENV_CAPACITY, "16"),
            (ENV_OVERFLOW, "Reject"),
            (ENV_ERROR_BUFFER, "4"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(
            config.backend,
            InMemConfig {
                capacity: 16,
                overflow: Overflow::Reject,
                error_buffer: 4,
            }
        );
    }

    #[test]
    fn bad_override_names_the_field() {
        let mut config = RelayConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_CAPACITY).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("backend.capacity"));
    }

    #[test]
    fn from_file_reads_toml() {
        let path = std::env::temp_dir().join(format!("relay-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[backend]\ncapacity = 3\n").unwrap();
        let config = RelayConfig::from_file(&path);
        std::fs::remove_file(&path).unwrap();
        // env overrides may be set by the environment running the tests
        if std::env::var(ENV_CAPACITY).is_err() {
            assert_eq!(config.unwrap().backend.capacity, 3);
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RelayConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
