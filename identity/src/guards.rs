//! Identity guards run after authentication.

use crate::errors::AuthError;
use crate::metrics_defs::GUARD_REJECTED;
use crate::types::IdentityContext;
use crate::{ORG_ID_HEADER, USER_ID_HEADER};
use http::HeaderMap;
use http::header::AUTHORIZATION;
use shared::counter;

/// Rejects requests without an internal org id.
///
/// Logs which identity headers were present to help diagnose header skew.
pub fn require_org(
    context: &IdentityContext,
    path: &str,
    headers: &HeaderMap,
) -> Result<(), AuthError> {
    if context.org_id.is_some() {
        return Ok(());
    }

    tracing::warn!(
        path = %path,
        credential_type = context.credential_type.as_str(),
        has_authorization = headers.contains_key(AUTHORIZATION),
        has_org_header = headers.contains_key(ORG_ID_HEADER),
        has_user_header = headers.contains_key(USER_ID_HEADER),
        "Organization context required but not resolved"
    );
    counter!(GUARD_REJECTED, "guard" => "require_org").increment(1);

    Err(AuthError::MissingOrgContext)
}

/// Rejects requests without an internal user id.
pub fn require_user(context: &IdentityContext) -> Result<(), AuthError> {
    if context.user_id.is_some() {
        return Ok(());
    }

    counter!(GUARD_REJECTED, "guard" => "require_user").increment(1);
    Err(AuthError::MissingUserContext)
}
