//! Environment-driven settings for the translator.
//! Every value has a default so only the API key is mandatory in practice.

use crate::error::{Result, TranslateError};
use std::str::FromStr;
use std::time::Duration;
use tracing::trace;

/// Default number of simultaneous remote calls.
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 5;
/// Default chat-completions base URL.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
/// Default number of subtitle lines translated per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Runtime settings shared by the client, retry controller and CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_concurrent_calls: usize,
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub batch_size: usize,
    /// Log outbound payloads and raw model responses.
    pub debug: bool,
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `retry_delay * n`.
    pub retry_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            debug: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl Config {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    /// Missing or blank keys fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        trace!("loading configuration");
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        let config = Self {
            max_concurrent_calls: parse_or(&get, "MAX_CONCURRENT_CALLS", defaults.max_concurrent_calls)?,
            api_url: get("OPENAI_API_URL").unwrap_or(defaults.api_url),
            api_key: get("OPENAI_API_KEY"),
            model: get("OPENAI_MODEL").unwrap_or(defaults.model),
            batch_size: parse_or(&get, "SRT_BATCH_SIZE", defaults.batch_size)?,
            debug: match get("SRT_DEBUG") {
                Some(v) => parse_flag("SRT_DEBUG", &v)?,
                None => defaults.debug,
            },
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            max_retries: parse_or(&get, "MAX_RETRIES", defaults.max_retries)?,
            retry_delay: Duration::from_secs(parse_or(
                &get,
                "RETRY_DELAY_SECS",
                defaults.retry_delay.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall or skip the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_calls == 0 {
            return Err(TranslateError::InvalidConfiguration(
                "MAX_CONCURRENT_CALLS must be at least 1".into(),
            ));
        }
        if self.batch_size == 0 {
            return Err(TranslateError::InvalidConfiguration(
                "batch size must be at least 1".into(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(TranslateError::InvalidConfiguration(
                "REQUEST_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(TranslateError::InvalidConfiguration(
                "MAX_RETRIES must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            TranslateError::InvalidConfiguration(format!("{key}: cannot parse {raw:?}"))
        }),
        None => Ok(default),
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(TranslateError::InvalidConfiguration(format!(
            "{key}: expected a boolean, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_concurrent_calls, 5);
        assert_eq!(config.batch_size, 50);
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("MAX_CONCURRENT_CALLS", "2"),
            ("OPENAI_API_URL", "http://localhost:8080/v1"),
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o"),
            ("SRT_DEBUG", "true"),
            ("RETRY_DELAY_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.max_concurrent_calls, 2);
        assert_eq!(config.api_url, "http://localhost:8080/v1");
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.model, "gpt-4o");
        assert!(config.debug);
        assert_eq!(config.retry_delay, Duration::ZERO);
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = Config::from_lookup(lookup(&[("MAX_CONCURRENT_CALLS", "many")])).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidConfiguration(msg) if msg.contains("MAX_CONCURRENT_CALLS")));
    }

    #[test]
    fn rejects_zero_batch_size() {
        let err = Config::from_lookup(lookup(&[("SRT_BATCH_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidConfiguration(_)));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = Config::from_lookup(lookup(&[("MAX_CONCURRENT_CALLS", "0")])).unwrap_err();
        assert!(matches!(err, TranslateError::InvalidConfiguration(_)));
    }
}
