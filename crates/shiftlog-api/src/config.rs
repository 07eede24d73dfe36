use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use thiserror::Error;

const MIN_BODY_BYTES: usize = 64 * 1024;
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub max_body_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "SHIFTLOG_API_BIND_ADDR", "127.0.0.1:8080");
        let db_path = PathBuf::from(value_or_default(
            &lookup,
            "SHIFTLOG_API_DB_PATH",
            "shiftlog-remote.db",
        ));

        let max_body_bytes = value_or_default(&lookup, "SHIFTLOG_API_MAX_BODY_BYTES", "8388608")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "SHIFTLOG_API_MAX_BODY_BYTES must be an integer in \
                     [{MIN_BODY_BYTES}, {MAX_BODY_BYTES}]"
                ))
            })?;
        if !(MIN_BODY_BYTES..=MAX_BODY_BYTES).contains(&max_body_bytes) {
            return Err(ConfigError::Invalid(format!(
                "SHIFTLOG_API_MAX_BODY_BYTES must be in [{MIN_BODY_BYTES}, {MAX_BODY_BYTES}]"
            )));
        }

        Ok(Self {
            bind_addr,
            db_path,
            max_body_bytes,
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_defaults() {
        assert_eq!(
            config_from(&[]).unwrap(),
            AppConfig {
                bind_addr: "127.0.0.1:8080".to_string(),
                db_path: PathBuf::from("shiftlog-remote.db"),
                max_body_bytes: 8 * 1024 * 1024,
            }
        );
    }

    #[test]
    fn config_reads_overrides() {
        let config = config_from(&[
            ("SHIFTLOG_API_BIND_ADDR", "0.0.0.0:9000"),
            ("SHIFTLOG_API_DB_PATH", " /var/lib/shiftlog/remote.db "),
            ("SHIFTLOG_API_MAX_BODY_BYTES", "65536"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.db_path, PathBuf::from("/var/lib/shiftlog/remote.db"));
        assert_eq!(config.max_body_bytes, 65_536);
    }

    #[test]
    fn config_rejects_body_limit_out_of_range() {
        let err = config_from(&[("SHIFTLOG_API_MAX_BODY_BYTES", "1024")]).unwrap_err();
        assert!(err.to_string().contains("SHIFTLOG_API_MAX_BODY_BYTES"));
        assert!(config_from(&[("SHIFTLOG_API_MAX_BODY_BYTES", "lots")]).is_err());
    }
}
