use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Upper bound on `max_retries`.
pub const MAX_RETRIES: u32 = 5;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CollaboratorConfigError {
    #[error("timeout_ms must be greater than 0")]
    ZeroTimeout,

    #[error("max_retries must be at most {MAX_RETRIES}, got {0}")]
    TooManyRetries(u32),
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_retries() -> u32 {
    2
}

/// Connection settings for the key service or the identity service.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CollaboratorConfig {
    /// Base URL; the endpoint path is appended to it.
    pub url: Url,
    /// Service key sent as `x-api-key`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-attempt timeout covering connect, request and response body.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl CollaboratorConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            api_key: None,
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
        }
    }

    pub fn validate(&self) -> Result<(), CollaboratorConfigError> {
        if self.timeout_ms == 0 {
            return Err(CollaboratorConfigError::ZeroTimeout);
        }
        if self.max_retries > MAX_RETRIES {
            return Err(CollaboratorConfigError::TooManyRetries(self.max_retries));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: CollaboratorConfig =
            serde_yaml::from_str("url: http://keys.internal").unwrap();
        assert_eq!(config.url.as_str(), "http://keys.internal/");
        assert_eq!(config.api_key, None);
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let result: Result<CollaboratorConfig, _> = serde_yaml::from_str("url: keys.internal");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        let config: CollaboratorConfig =
            serde_yaml::from_str("url: http://keys.internal").unwrap();
        assert_eq!(config.validate(), Ok(()));

        let mut zero_timeout = config.clone();
        zero_timeout.timeout_ms = 0;
        assert_eq!(
            zero_timeout.validate(),
            Err(CollaboratorConfigError::ZeroTimeout)
        );

        let mut retries = config;
        retries.max_retries = MAX_RETRIES;
        assert_eq!(retries.validate(), Ok(()));
        retries.max_retries = 15;
        assert_eq!(
            retries.validate(),
            Err(CollaboratorConfigError::TooManyRetries(15))
        );
    }
}
