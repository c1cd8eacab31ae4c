use std::env;

use thiserror::Error;

use crate::model::MARKET_H2H;

pub const ENV_STORE_URL: &str = "SUPABASE_URL";
pub const ENV_STORE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";

/// Upper bound on ids per store request.
pub const MAX_CHUNK_SIZE: usize = 100;

const DEFAULT_SPORT_PREFIX: &str = "tennis_";
const DEFAULT_MODEL_VERSION: &str = "lr_tennis_h2h_v1";
const DEFAULT_TRAIN_LIMIT: usize = 1500;
const DEFAULT_UPCOMING_LIMIT: usize = 250;
const DEFAULT_HOURS_AHEAD: i64 = 48;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Endpoint and service key of the remote store.
#[derive(Clone)]
pub struct StoreCredentials {
    pub url: String,
    pub service_key: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

impl StoreCredentials {
    pub fn new(url: &str, service_key: &str) -> Result<Self, ConfigError> {
        let url = url.trim().trim_end_matches('/');
        let service_key = service_key.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingVar(ENV_STORE_URL));
        }
        if service_key.is_empty() {
            return Err(ConfigError::MissingVar(ENV_STORE_KEY));
        }
        Ok(Self {
            url: url.to_string(),
            service_key: service_key.to_string(),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var(ENV_STORE_URL).unwrap_or_default();
        let key = env::var(ENV_STORE_KEY).unwrap_or_default();
        Self::new(&url, &key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub sport_prefix: String,
    pub market_key: String,
    pub model_version: String,
    pub train_limit: usize,
    pub upcoming_limit: usize,
    pub hours_ahead: i64,
    pub chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sport_prefix: DEFAULT_SPORT_PREFIX.to_string(),
            market_key: MARKET_H2H.to_string(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            train_limit: DEFAULT_TRAIN_LIMIT,
            upcoming_limit: DEFAULT_UPCOMING_LIMIT,
            hours_ahead: DEFAULT_HOURS_AHEAD,
            chunk_size: MAX_CHUNK_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Some(v) = text_var(&lookup, "ML_SPORT_PREFIX") {
            cfg.sport_prefix = v;
        }
        if let Some(v) = text_var(&lookup, "ML_MARKET_KEY") {
            cfg.market_key = v;
        }
        if let Some(v) = text_var(&lookup, "ML_MODEL_VERSION") {
            cfg.model_version = v;
        }
        if let Some(v) = number_var::<usize>(&lookup, "ML_TRAIN_LIMIT")? {
            cfg.train_limit = v.max(1);
        }
        if let Some(v) = number_var::<usize>(&lookup, "ML_UPCOMING_LIMIT")? {
            cfg.upcoming_limit = v.max(1);
        }
        if let Some(v) = number_var::<i64>(&lookup, "ML_HOURS_AHEAD")? {
            cfg.hours_ahead = v.clamp(1, 24 * 30);
        }
        if let Some(v) = number_var::<usize>(&lookup, "ML_CHUNK_SIZE")? {
            cfg.chunk_size = v.clamp(1, MAX_CHUNK_SIZE);
        }
        Ok(cfg)
    }
}

fn text_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn number_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = text_var(lookup, key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { key, value: raw })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ConfigError, ENV_STORE_KEY, ENV_STORE_URL, PipelineConfig, StoreCredentials};

    #[test]
    fn blank_credentials_are_missing() {
        assert_eq!(
            StoreCredentials::new("  ", "key").unwrap_err(),
            ConfigError::MissingVar(ENV_STORE_URL)
        );
        assert_eq!(
            StoreCredentials::new("https://x.supabase.co", "").unwrap_err(),
            ConfigError::MissingVar(ENV_STORE_KEY)
        );
    }

    #[test]
    fn credentials_trim_trailing_slash_and_redact_key() {
        let creds = StoreCredentials::new("https://x.supabase.co/", "secret").expect("valid");
        assert_eq!(creds.url, "https://x.supabase.co");
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn overrides_apply_and_chunk_size_is_capped() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ML_MODEL_VERSION", "lr_v2"),
            ("ML_CHUNK_SIZE", "500"),
            ("ML_HOURS_AHEAD", " 24 "),
        ]);
        let cfg =
            PipelineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).expect("valid");
        assert_eq!(cfg.model_version, "lr_v2");
        assert_eq!(cfg.chunk_size, 100);
        assert_eq!(cfg.hours_ahead, 24);
        assert_eq!(cfg.sport_prefix, "tennis_");
    }

    #[test]
    fn unparseable_numbers_are_config_errors() {
        let err = PipelineConfig::from_lookup(|k| (k == "ML_TRAIN_LIMIT").then(|| "lots".into()))
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "ML_TRAIN_LIMIT",
                value: "lots".to_string()
            }
        );
    }
}
