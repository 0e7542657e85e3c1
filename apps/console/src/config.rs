use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::retry::RetryPolicy;
use crate::query::DEFAULT_SIZE;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5601/api/anomaly_detectors";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 250;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppProfile {
    Dev,
    Prod,
}

impl AppProfile {
    pub fn from_env(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("prod") | Some("production") => Self::Prod,
            _ => Self::Dev,
        }
    }

    pub fn log_level(self) -> tracing::Level {
        match self {
            Self::Dev => tracing::Level::DEBUG,
            Self::Prod => tracing::Level::INFO,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub profile: AppProfile,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub default_page_size: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            profile: AppProfile::Dev,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::new(
                DEFAULT_MAX_RETRIES,
                Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS),
            ),
            default_page_size: DEFAULT_SIZE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        crate::config::load_dotenv();

        Self::from_lookup(read_env)
    }

    /// Builds the config from an arbitrary key lookup; malformed numbers keep
    /// the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = lookup("AD_API_BASE_URL") {
            config.api_base_url = url;
        }

        if let Some(token) = lookup("AD_AUTH_TOKEN") {
            config.auth_token = Some(token);
        }

        config.profile = AppProfile::from_env(lookup("AD_PROFILE"));

        if let Some(secs) =
            lookup("AD_REQUEST_TIMEOUT_SECS").and_then(|value| value.parse::<u64>().ok())
        {
            config.request_timeout = Duration::from_secs(secs.max(1));
        }

        if let Some(retries) =
            lookup("AD_MAX_RETRIES").and_then(|value| value.parse::<u32>().ok())
        {
            config.retry.max_retries = retries;
        }

        if let Some(ms) =
            lookup("AD_RETRY_BASE_DELAY_MS").and_then(|value| value.parse::<u64>().ok())
        {
            config.retry.base_delay = Duration::from_millis(ms.max(10));
        }

        if let Some(size) =
            lookup("AD_DEFAULT_PAGE_SIZE").and_then(|value| value.parse::<usize>().ok())
        {
            config.default_page_size = size.clamp(1, MAX_PAGE_SIZE);
        }

        config
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.auth_token
            .as_ref()
            .map(|token| format!("Bearer {}", token.trim()))
    }
}

fn read_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .or_else(|| option_env_from_build(key).map(|s| s.to_string()))
}

fn option_env_from_build(key: &str) -> Option<&'static str> {
    match key {
        "AD_API_BASE_URL" => option_env!("AD_API_BASE_URL"),
        "AD_AUTH_TOKEN" => option_env!("AD_AUTH_TOKEN"),
        "AD_PROFILE" => option_env!("AD_PROFILE"),
        "AD_REQUEST_TIMEOUT_SECS" => option_env!("AD_REQUEST_TIMEOUT_SECS"),
        "AD_MAX_RETRIES" => option_env!("AD_MAX_RETRIES"),
        "AD_RETRY_BASE_DELAY_MS" => option_env!("AD_RETRY_BASE_DELAY_MS"),
        "AD_DEFAULT_PAGE_SIZE" => option_env!("AD_DEFAULT_PAGE_SIZE"),
        _ => None,
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv() {
        let missing = matches!(
            err,
            dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        );
        if !missing {
            tracing::warn!("failed to load .env: {err}");
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[inline]
pub fn load_dotenv() {}

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
    fn defaults_without_env() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.profile, AppProfile::Dev);
        assert_eq!(config.default_page_size, 20);
        assert_eq!(config.retry.max_retries, DEFAULT_MAX_RETRIES);
        assert!(config.bearer_token().is_none());
    }

    #[test]
    fn env_overrides_and_clamps() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AD_API_BASE_URL", "https://dash.example/api/ad"),
            ("AD_AUTH_TOKEN", " abc "),
            ("AD_PROFILE", "prod"),
            ("AD_REQUEST_TIMEOUT_SECS", "0"),
            ("AD_MAX_RETRIES", "5"),
            ("AD_DEFAULT_PAGE_SIZE", "1000"),
            ("AD_RETRY_BASE_DELAY_MS", "oops"),
        ]));
        assert_eq!(config.api_base_url, "https://dash.example/api/ad");
        assert_eq!(config.bearer_token().as_deref(), Some("Bearer abc"));
        assert_eq!(config.profile, AppProfile::Prod);
        assert_eq!(config.request_timeout, Duration::from_secs(1));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.default_page_size, MAX_PAGE_SIZE);
        assert_eq!(
            config.retry.base_delay,
            Duration::from_millis(DEFAULT_RETRY_BASE_DELAY_MS)
        );
    }
}
