use http::Method;
use identity::AuthPipeline;
use identity::config::{CollaboratorConfig, CollaboratorConfigError};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Duplicate upstream name: {0}")]
    DuplicateUpstream(String),

    #[error("Empty upstream name")]
    EmptyUpstreamName,

    #[error("Route references unknown upstream: {0}")]
    UnknownUpstream(String),

    #[error("Path prefix must start with '/': {0:?}")]
    InvalidPathPrefix(String),

    #[error("Invalid {0} config: {1}")]
    InvalidCollaborator(&'static str, CollaboratorConfigError),
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

/// HTTP methods supported for route matching
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn matches(&self, method: &Method) -> bool {
        let expected = match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        };
        expected == method
    }
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming requests
    pub listener: Listener,
    /// Admin listener for health and readiness
    pub admin_listener: Listener,
    /// Validates bearer credentials
    pub key_service: CollaboratorConfig,
    /// Maps external org/user ids of app credentials to internal ids
    pub identity_service: CollaboratorConfig,
    /// Time allowed for an upstream to return response headers
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    /// Downstream services requests are forwarded to
    pub upstreams: Vec<UpstreamConfig>,
    /// Routing rules, first match wins
    pub routes: Vec<Route>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        self.key_service
            .validate()
            .map_err(|e| ValidationError::InvalidCollaborator("key_service", e))?;
        self.identity_service
            .validate()
            .map_err(|e| ValidationError::InvalidCollaborator("identity_service", e))?;

        let mut upstream_names = HashSet::new();
        for upstream in &self.upstreams {
            if upstream.name.is_empty() {
                return Err(ValidationError::EmptyUpstreamName);
            }

            if !upstream_names.insert(upstream.name.as_str()) {
                return Err(ValidationError::DuplicateUpstream(upstream.name.clone()));
            }
        }

        for route in &self.routes {
            if !route.r#match.path_prefix.starts_with('/') {
                return Err(ValidationError::InvalidPathPrefix(
                    route.r#match.path_prefix.clone(),
                ));
            }

            if !upstream_names.contains(route.upstream.as_str()) {
                return Err(ValidationError::UnknownUpstream(route.upstream.clone()));
            }
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// A downstream service
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UpstreamConfig {
    pub name: String,
    /// Base URL; the request path is appended to its path.
    pub url: Url,
    /// Service key sent to the upstream as `x-api-key`
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Routing rule configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Route {
    pub r#match: Match,
    /// Name of the upstream to forward to
    pub upstream: String,
    /// Identity requirements, e.g. `[authenticate, require_org]`. Omitted means public.
    #[serde(default)]
    pub auth: AuthPipeline,
    /// Remove the matched prefix before forwarding
    #[serde(default)]
    pub strip_prefix: bool,
}

/// Request matching criteria
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Match {
    /// Matches the path itself and anything below it, e.g. `/v1/campaigns`
    /// matches `/v1/campaigns/42` but not `/v1/campaigns-archive`
    pub path_prefix: String,
    pub method: Option<HttpMethod>,
}
