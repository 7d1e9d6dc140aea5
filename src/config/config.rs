//! # Gateway Configuration
//!
//! Connection settings for the HTTP transform gateway. The CLI builds one from
//! the environment and then lets flags override individual fields.
//!
//! | Parameter | Env var | Default | Description |
//! |-----------|---------|---------|-------------|
//! | `endpoint` | `FLYER_GATEWAY_ENDPOINT` | `https://generativelanguage.googleapis.com` | Base URL |
//! | `api_key` | `FLYER_API_KEY`, then `API_KEY` | none | Sent as `x-goog-api-key` |
//! | `model` | `FLYER_MODEL` | `gemini-2.5-flash-image` | Image model name |
//! | `timeout_secs` | `FLYER_TIMEOUT_SECS` | 120 | Per-request timeout |
//! | `max_concurrent_requests` | `FLYER_MAX_CONCURRENT` | 4 | In-flight request bound |
//!
//! ```rust
//! use flyer_layers::config::GatewayConfig;
//!
//! let mut config = GatewayConfig::default();
//! assert!(config.validate().is_err()); // no API key yet
//!
//! config.api_key = Some("secret".to_string());
//! assert!(config.validate().is_ok());
//! assert!(!format!("{config:?}").contains("secret"));
//! ```

use std::fmt;
use std::time::Duration;

use crate::error::{FlyerError, FlyerResult};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base URL of the generateContent API, without a trailing path.
    pub endpoint: String,
    /// API key. Required by the HTTP gateway, never printed.
    pub api_key: Option<String>,
    /// Model used for every transform.
    pub model: String,
    /// Timeout applied to each request, in seconds. Must be greater than 0.
    pub timeout_secs: u64,
    /// Upper bound on requests in flight at once. Must be greater than 0.
    pub max_concurrent_requests: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: 120,
            max_concurrent_requests: 4,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .finish()
    }
}

impl GatewayConfig {
    /// Defaults overlaid with whatever the process environment provides.
    pub fn from_env() -> FlyerResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> FlyerResult<Self> {
        let mut config = Self::default();
        if let Some(endpoint) = lookup("FLYER_GATEWAY_ENDPOINT") {
            config.endpoint = endpoint;
        }
        config.api_key = lookup("FLYER_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|key| !key.trim().is_empty());
        if let Some(model) = lookup("FLYER_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("FLYER_TIMEOUT_SECS") {
            config.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| FlyerError::config("FLYER_TIMEOUT_SECS", raw.clone(), "not an integer"))?;
        }
        if let Some(raw) = lookup("FLYER_MAX_CONCURRENT") {
            config.max_concurrent_requests = raw.trim().parse().map_err(|_| {
                FlyerError::config("FLYER_MAX_CONCURRENT", raw.clone(), "not an integer")
            })?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> FlyerResult<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(FlyerError::config(
                "endpoint",
                self.endpoint.clone(),
                "must start with http:// or https://",
            ));
        }
        if self.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
            return Err(FlyerError::config("api_key", "", "an API key is required")
                .with_user_message("Set FLYER_API_KEY (or API_KEY) before calling the image service."));
        }
        if self.model.trim().is_empty() {
            return Err(FlyerError::config("model", "", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(FlyerError::config("timeout_secs", "0", "must be greater than 0"));
        }
        if self.max_concurrent_requests == 0 {
            return Err(FlyerError::config(
                "max_concurrent_requests",
                "0",
                "must be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full generateContent URL for the configured model.
    pub fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
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
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.max_concurrent_requests, 4);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("API_KEY", "fallback"),
            ("FLYER_MODEL", "other-model"),
            ("FLYER_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("fallback"));
        assert_eq!(config.model, "other-model");
        assert_eq!(config.timeout(), Duration::from_secs(30));

        let config = GatewayConfig::from_lookup(lookup(&[
            ("API_KEY", "fallback"),
            ("FLYER_API_KEY", "primary"),
        ]))
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_bad_env_number() {
        let err = GatewayConfig::from_lookup(lookup(&[("FLYER_MAX_CONCURRENT", "many")]))
            .unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_config_validation() {
        let mut config = GatewayConfig {
            api_key: Some("k".into()),
            ..GatewayConfig::default()
        };
        assert!(config.validate().is_ok());

        config.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.timeout_secs = 60;

        config.max_concurrent_requests = 0;
        assert!(config.validate().is_err());
        config.max_concurrent_requests = 2;

        config.endpoint = "ftp://example".into();
        assert!(config.validate().is_err());
        config.endpoint = "http://localhost:8080/".into();

        assert!(config.validate().is_ok());
        assert_eq!(
            config.generate_url(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash-image:generateContent"
        );
    }
}
