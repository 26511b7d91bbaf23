use http::StatusCode;

/// Errors surfaced to the caller when authentication or an identity guard fails.
///
/// The display string is the message returned in the `{"error": ...}` body.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuthentication,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Invalid authentication")]
    InvalidAuthentication,
    #[error("Organization context required")]
    MissingOrgContext,
    #[error("User identity required")]
    MissingUserContext,
    #[error("Identity resolution failed")]
    UpstreamUnavailable,
    #[error("Identity resolution returned incomplete data")]
    IncompleteIdentity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    Unauthenticated,
    MissingOrgContext,
    MissingUserContext,
    UpstreamUnavailable,
    IncompleteIdentity,
}

impl AuthErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuthErrorKind::Unauthenticated => "unauthenticated",
            AuthErrorKind::MissingOrgContext => "missing_org_context",
            AuthErrorKind::MissingUserContext => "missing_user_context",
            AuthErrorKind::UpstreamUnavailable => "upstream_unavailable",
            AuthErrorKind::IncompleteIdentity => "incomplete_identity",
        }
    }
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::MissingAuthentication
            | AuthError::InvalidApiKey
            | AuthError::InvalidAuthentication => AuthErrorKind::Unauthenticated,
            AuthError::MissingOrgContext => AuthErrorKind::MissingOrgContext,
            AuthError::MissingUserContext => AuthErrorKind::MissingUserContext,
            AuthError::UpstreamUnavailable => AuthErrorKind::UpstreamUnavailable,
            AuthError::IncompleteIdentity => AuthErrorKind::IncompleteIdentity,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            AuthErrorKind::Unauthenticated | AuthErrorKind::MissingUserContext => {
                StatusCode::UNAUTHORIZED
            }
            AuthErrorKind::MissingOrgContext => StatusCode::BAD_REQUEST,
            AuthErrorKind::UpstreamUnavailable | AuthErrorKind::IncompleteIdentity => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

/// Failures talking to the key service or the identity service.
#[derive(thiserror::Error, Debug)]
pub enum CollaboratorError {
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("{collaborator} responded with status {status}")]
    UnexpectedStatus {
        collaborator: &'static str,
        status: StatusCode,
    },
    #[error("{0} unavailable after retries")]
    RetriesExceeded(&'static str),
    #[error("{collaborator} response violates contract: {reason}")]
    ContractViolation {
        collaborator: &'static str,
        reason: String,
    },
}
