use crate::config::ValidationError;
use std::io;

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
    #[error("collaborator client error: {0}")]
    Collaborator(#[from] identity::CollaboratorError),
    #[error("invalid URI: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
    #[error("upstream timeout for {0}")]
    UpstreamTimeout(String),
    #[error("upstream request failed for {0}: {1}")]
    UpstreamRequestFailed(String, String),
}
