//! Client configuration.
//!
//! Resolved from environment variables (the CLI loads `.env` first) so the
//! same binary can point at a local server or a hosted one.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const API_URL_VAR: &str = "SHIFTLOG_API_URL";
pub const HTTP_TIMEOUT_VAR: &str = "SHIFTLOG_HTTP_TIMEOUT_SECS";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const MAX_HTTP_TIMEOUT_SECS: u64 = 300;

/// Settings needed to reach the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the sync API, without a trailing slash
    pub api_url: Option<String>,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = normalize_text_option(lookup(API_URL_VAR))
            .map(|url| normalize_api_url(&url))
            .transpose()?;

        let timeout_secs = match normalize_text_option(lookup(HTTP_TIMEOUT_VAR)) {
            None => DEFAULT_HTTP_TIMEOUT_SECS,
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::InvalidInput(format!(
                    "{HTTP_TIMEOUT_VAR} must be an integer in [1, {MAX_HTTP_TIMEOUT_SECS}]"
                ))
            })?,
        };
        if !(1..=MAX_HTTP_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(Error::InvalidInput(format!(
                "{HTTP_TIMEOUT_VAR} must be in [1, {MAX_HTTP_TIMEOUT_SECS}]"
            )));
        }

        Ok(Self {
            api_url,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Replace the API URL (command-line override).
    pub fn with_api_url(mut self, url: &str) -> Result<Self> {
        self.api_url = Some(normalize_api_url(url)?);
        Ok(self)
    }

    /// The API URL, or an error telling the user how to set one.
    pub fn require_api_url(&self) -> Result<&str> {
        self.api_url.as_deref().ok_or_else(|| {
            Error::InvalidInput(format!(
                "No sync server configured. Set {API_URL_VAR} or pass --api-url."
            ))
        })
    }
}

fn normalize_api_url(raw: &str) -> Result<String> {
    let url = raw.trim();
    if !is_http_url(url) {
        return Err(Error::InvalidInput(format!(
            "{API_URL_VAR} must start with http:// or https://"
        )));
    }
    Ok(url.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ClientConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(config_from(&[]).unwrap(), ClientConfig::default());
    }

    #[test]
    fn api_url_is_trimmed_and_checked() {
        let config = config_from(&[(API_URL_VAR, " https://shifts.example.com/ ")]).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://shifts.example.com"));

        assert!(config_from(&[(API_URL_VAR, "shifts.example.com")]).is_err());
    }

    #[test]
    fn timeout_must_be_in_range() {
        let config = config_from(&[(HTTP_TIMEOUT_VAR, "5")]).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(5));

        assert!(config_from(&[(HTTP_TIMEOUT_VAR, "0")]).is_err());
        assert!(config_from(&[(HTTP_TIMEOUT_VAR, "301")]).is_err());
        assert!(config_from(&[(HTTP_TIMEOUT_VAR, "soon")]).is_err());
    }

    #[test]
    fn require_api_url_explains_missing_value() {
        let err = ClientConfig::default().require_api_url().unwrap_err();
        assert!(err.to_string().contains(API_URL_VAR));

        let config = ClientConfig::default()
            .with_api_url("http://127.0.0.1:8080/")
            .unwrap();
        assert_eq!(config.require_api_url().unwrap(), "http://127.0.0.1:8080");
    }
}
