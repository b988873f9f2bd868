use crate::delegate::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use config as config_rs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const ENV_ENDPOINT: &str = "CODESHIELD_ENDPOINT";
pub const ENV_MODEL: &str = "CODESHIELD_MODEL";
pub const ENV_API_KEY: &str = "CODESHIELD_API_KEY";
pub const ENV_TIMEOUT: &str = "CODESHIELD_TIMEOUT_SECS";

const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where and how to reach the rewriting service. The credential is optional;
/// its absence selects the local pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_key: None,
        }
    }
}

impl ServiceConfig {
    /// The credential if it is present and not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}

/// Values given on the command line; they win over every other layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Config(#[from] config_rs::ConfigError),
}

/// Builds the service config from defaults, an optional file, the
/// `CODESHIELD_*` environment and finally `overrides`.
pub fn load_config(
    file: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ServiceConfig, ConfigError> {
    let mut builder = config_rs::Config::builder()
        .set_default("endpoint", DEFAULT_ENDPOINT)?
        .set_default("model", DEFAULT_MODEL)?
        .set_default("timeout_secs", DEFAULT_TIMEOUT_SECS)?;

    builder = match file {
        Some(path) => builder.add_source(config_rs::File::from(path).required(true)),
        None => builder.add_source(config_rs::File::with_name("codeshield").required(false)),
    };

    if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
        builder = builder.set_override("endpoint", endpoint)?;
    }
    if let Ok(model) = std::env::var(ENV_MODEL) {
        builder = builder.set_override("model", model)?;
    }
    if let Ok(key) = std::env::var(ENV_API_KEY) {
        builder = builder.set_override("api_key", key)?;
    }
    if let Ok(timeout) = std::env::var(ENV_TIMEOUT) {
        builder = builder.set_override("timeout_secs", timeout)?;
    }

    // CLI flags take precedence
    if let Some(endpoint) = &overrides.endpoint {
        builder = builder.set_override("endpoint", endpoint.as_str())?;
    }
    if let Some(model) = &overrides.model {
        builder = builder.set_override("model", model.as_str())?;
    }
    if let Some(key) = &overrides.api_key {
        builder = builder.set_override("api_key", key.as_str())?;
    }
    if let Some(timeout) = overrides.timeout_secs {
        builder = builder.set_override("timeout_secs", timeout)?;
    }

    let cfg = builder.build()?;
    let api_key = match cfg.get_string("api_key") {
        Ok(key) => Some(key),
        Err(config_rs::ConfigError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    Ok(ServiceConfig {
        endpoint: cfg.get_string("endpoint")?,
        model: cfg.get_string("model")?,
        timeout: Duration::from_secs(cfg.get::<u64>("timeout_secs")?),
        api_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_credential_counts_as_missing() {
        let mut cfg = ServiceConfig::default();
        assert_eq!(cfg.credential(), None);
        cfg.api_key = Some("   ".into());
        assert_eq!(cfg.credential(), None);
        cfg.api_key = Some("sk-test".into());
        assert_eq!(cfg.credential(), Some("sk-test"));
    }
}
