// Headers carrying identity between the gateway and upstreams. Upstreams trust
// these, so whatever the caller sent under the same names is removed first.

use crate::errors::ProxyError;
use http::header::{AUTHORIZATION, HOST, HeaderMap, HeaderName, HeaderValue};
use identity::IdentityContext;
use identity::client::API_KEY_HEADER;

pub const APP_ID_HEADER: &str = "x-app-id";
pub const CREDENTIAL_TYPE_HEADER: &str = "x-credential-type";

static CALLER_IDENTITY_NAMES: &[&str] = &[
    identity::ORG_ID_HEADER,
    identity::USER_ID_HEADER,
    APP_ID_HEADER,
    CREDENTIAL_TYPE_HEADER,
    API_KEY_HEADER,
];

/// Removes the caller's credential and identity headers, and the Host header
/// so the client derives it from the upstream URI.
pub fn strip_caller_identity(headers: &mut HeaderMap) {
    headers.remove(AUTHORIZATION);
    headers.remove(HOST);
    for name in CALLER_IDENTITY_NAMES {
        headers.remove(*name);
    }
}

/// Adds the resolved identity. Absent fields are not sent.
pub fn insert_identity(
    headers: &mut HeaderMap,
    context: &IdentityContext,
) -> Result<(), ProxyError> {
    let fields = [
        (APP_ID_HEADER, context.app_id.as_deref()),
        (identity::ORG_ID_HEADER, context.org_id.as_deref()),
        (identity::USER_ID_HEADER, context.user_id.as_deref()),
        (CREDENTIAL_TYPE_HEADER, Some(context.credential_type.as_str())),
    ];

    for (name, value) in fields {
        if let Some(value) = value {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_str(value)?);
        }
    }

    Ok(())
}

pub fn insert_service_key(headers: &mut HeaderMap, api_key: Option<&str>) -> Result<(), ProxyError> {
    if let Some(api_key) = api_key {
        let mut value = HeaderValue::from_str(api_key)?;
        value.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), value);
    }
    Ok(())
}
