use crate::collaborators::{IdentityResolver, KeyValidator};
use crate::errors::AuthError;
use crate::metrics_defs::{AUTHENTICATION_RESULT, IDENTITY_RESOLUTION};
use crate::protocol::ResolveRequest;
use crate::types::{ExternalIdentity, IdentityContext, IdentityResolution, KeyValidation};
use crate::{BEARER_PREFIX, ORG_ID_HEADER, USER_ID_HEADER};
use http::HeaderMap;
use http::header::AUTHORIZATION;
use shared::counter;
use std::sync::Arc;

/// Turns the bearer credential of a request into an [`IdentityContext`].
///
/// The flow is a single forward pass with at most two collaborator calls, key
/// validation and then identity resolution, made strictly in that order.
#[derive(Clone)]
pub struct Authenticator {
    validator: Arc<dyn KeyValidator>,
    resolver: Arc<dyn IdentityResolver>,
}

impl Authenticator {
    pub fn new(validator: Arc<dyn KeyValidator>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self {
            validator,
            resolver,
        }
    }

    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<IdentityContext, AuthError> {
        let result = self.identify(headers).await;

        match &result {
            Ok(context) => {
                counter!(AUTHENTICATION_RESULT, "result" => "ok", "credential_type" => context.credential_type.as_str())
                    .increment(1);
                counter!(IDENTITY_RESOLUTION, "state" => context.resolution().as_str()).increment(1);
            }
            Err(e) => {
                counter!(AUTHENTICATION_RESULT, "result" => e.kind().as_str(), "credential_type" => "unknown")
                    .increment(1);
            }
        }

        result
    }

    async fn identify(&self, headers: &HeaderMap) -> Result<IdentityContext, AuthError> {
        let credential = bearer_credential(headers)?;
        if credential.is_empty() {
            return Err(AuthError::InvalidApiKey);
        }

        let validation = self.validator.validate(credential).await.map_err(|e| {
            tracing::warn!(error = %e, "Key validation failed");
            AuthError::InvalidApiKey
        })?;

        match validation {
            KeyValidation::Invalid => Err(AuthError::InvalidApiKey),
            KeyValidation::User {
                app_id,
                org_id,
                user_id,
            } => Ok(IdentityContext::for_user(app_id, org_id, user_id)),
            KeyValidation::App { app_id } => self.identify_app(app_id, headers).await,
        }
    }

    async fn identify_app(
        &self,
        app_id: String,
        headers: &HeaderMap,
    ) -> Result<IdentityContext, AuthError> {
        let external_org_id = optional_header(headers, ORG_ID_HEADER)?;
        let external_user_id = optional_header(headers, USER_ID_HEADER)?;

        let external = match (external_org_id, external_user_id) {
            (Some(org), Some(user)) => ExternalIdentity {
                external_org_id: org.to_string(),
                external_user_id: user.to_string(),
            },
            (None, None) => {
                return Ok(IdentityContext::for_app(app_id, IdentityResolution::Absent));
            }
            (org, user) => {
                // Not fatal: require_org/require_user reject once a route needs the identity.
                tracing::warn!(
                    app_id = %app_id,
                    has_org_header = org.is_some(),
                    has_user_header = user.is_some(),
                    "Only one of x-org-id and x-user-id supplied, identity left unresolved"
                );
                return Ok(IdentityContext::for_app(app_id, IdentityResolution::Skewed));
            }
        };

        let request = ResolveRequest {
            app_id: app_id.clone(),
            external_org_id: external.external_org_id,
            external_user_id: external.external_user_id,
        };

        let response = self.resolver.resolve(&request).await.map_err(|e| {
            tracing::error!(app_id = %app_id, error = %e, "Identity resolution failed");
            AuthError::UpstreamUnavailable
        })?;

        let resolved = response.into_resolved().ok_or_else(|| {
            tracing::error!(app_id = %app_id, "Identity resolution returned incomplete data");
            AuthError::IncompleteIdentity
        })?;

        Ok(IdentityContext::for_resolved_app(app_id, resolved))
    }
}

/// Extracts the credential following the `Bearer ` prefix.
pub fn bearer_credential(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthentication)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidAuthentication)?;

    value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::MissingAuthentication)
}

/// Reads an identity header, treating an empty value as absent.
fn optional_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AuthError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AuthError::InvalidAuthentication)?;
            Ok(Some(value).filter(|v| !v.is_empty()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ResolveResponse;
    use crate::testutils::{MockIdentityResolver, MockKeyValidator};
    use crate::types::ResolvedIdentity;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn authenticator(
        validator: MockKeyValidator,
        resolver: MockIdentityResolver,
    ) -> (Authenticator, Arc<MockKeyValidator>, Arc<MockIdentityResolver>) {
        let validator = Arc::new(validator);
        let resolver = Arc::new(resolver);
        (
            Authenticator::new(validator.clone(), resolver.clone()),
            validator,
            resolver,
        )
    }

    #[tokio::test]
    async fn test_missing_authorization() {
        let (auth, validator, _) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::failing(),
        );

        let result = auth.authenticate(&HeaderMap::new()).await;
        assert_eq!(result, Err(AuthError::MissingAuthentication));
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_bearer_scheme() {
        let (auth, validator, _) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::failing(),
        );

        let result = auth
            .authenticate(&headers(&[("authorization", "Basic dXNlcjpwYXNz")]))
            .await;
        assert_eq!(result, Err(AuthError::MissingAuthentication));

        // The scheme prefix is case sensitive.
        let result = auth
            .authenticate(&headers(&[("authorization", "bearer app_xyz")]))
            .await;
        assert_eq!(result, Err(AuthError::MissingAuthentication));
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let (auth, validator, _) =
            authenticator(MockKeyValidator::invalid(), MockIdentityResolver::failing());

        let result = auth
            .authenticate(&headers(&[("authorization", "Bearer bogus")]))
            .await;
        assert_eq!(result, Err(AuthError::InvalidApiKey));
        assert_eq!(validator.credentials(), vec!["bogus".to_string()]);
    }

    #[tokio::test]
    async fn test_key_service_failure() {
        let (auth, _, _) =
            authenticator(MockKeyValidator::failing(), MockIdentityResolver::failing());

        let result = auth
            .authenticate(&headers(&[("authorization", "Bearer app_xyz")]))
            .await;
        assert_eq!(result, Err(AuthError::InvalidApiKey));
    }

    #[tokio::test]
    async fn test_empty_credential() {
        let (auth, validator, _) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::failing(),
        );

        let result = auth
            .authenticate(&headers(&[("authorization", "Bearer ")]))
            .await;
        assert_eq!(result, Err(AuthError::InvalidApiKey));
        assert_eq!(validator.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_ascii_authorization() {
        let (auth, _, _) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::failing(),
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xff\xfe").unwrap(),
        );

        let result = auth.authenticate(&headers).await;
        assert_eq!(result, Err(AuthError::InvalidAuthentication));
    }

    #[tokio::test]
    async fn test_non_ascii_identity_header() {
        for header in [ORG_ID_HEADER, USER_ID_HEADER] {
            let (auth, _, resolver) = authenticator(
                MockKeyValidator::app("app1"),
                MockIdentityResolver::returning("uuid-org-1", "uuid-user-1"),
            );

            let mut request = headers(&[
                ("authorization", "Bearer app_xyz"),
                ("x-org-id", "org_ext1"),
                ("x-user-id", "user_ext1"),
            ]);
            request.insert(header, HeaderValue::from_bytes(b"org\xff").unwrap());

            let result = auth.authenticate(&request).await;
            assert_eq!(result, Err(AuthError::InvalidAuthentication));
            assert_eq!(resolver.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_user_key_uses_validation_identity() {
        let (auth, validator, resolver) = authenticator(
            MockKeyValidator::user("app1", "uuid-org-9", "uuid-user-9"),
            MockIdentityResolver::returning("other-org", "other-user"),
        );

        // Identity headers are ignored for user keys.
        let context = auth
            .authenticate(&headers(&[
                ("authorization", "Bearer usr_abc"),
                ("x-org-id", "org_ext1"),
                ("x-user-id", "user_ext1"),
            ]))
            .await
            .unwrap();

        assert_eq!(
            context,
            IdentityContext::for_user(
                Some("app1".into()),
                Some("uuid-org-9".into()),
                Some("uuid-user-9".into()),
            )
        );
        assert_eq!(validator.credentials(), vec!["usr_abc".to_string()]);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_app_key_resolves_identity() {
        let (auth, validator, resolver) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::returning("uuid-org-1", "uuid-user-1"),
        );

        let context = auth
            .authenticate(&headers(&[
                ("authorization", "Bearer app_xyz"),
                ("x-org-id", "org_ext1"),
                ("x-user-id", "user_ext1"),
            ]))
            .await
            .unwrap();

        assert_eq!(
            context,
            IdentityContext::for_resolved_app(
                "app1".into(),
                ResolvedIdentity {
                    org_id: "uuid-org-1".into(),
                    user_id: "uuid-user-1".into(),
                },
            )
        );
        assert_eq!(validator.credentials(), vec!["app_xyz".to_string()]);
        assert_eq!(
            resolver.requests(),
            vec![ResolveRequest {
                app_id: "app1".into(),
                external_org_id: "org_ext1".into(),
                external_user_id: "user_ext1".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_resolution_failure() {
        let (auth, _, resolver) =
            authenticator(MockKeyValidator::app("app1"), MockIdentityResolver::failing());

        let result = auth
            .authenticate(&headers(&[
                ("authorization", "Bearer app_xyz"),
                ("x-org-id", "org_ext1"),
                ("x-user-id", "user_ext1"),
            ]))
            .await;

        assert_eq!(result, Err(AuthError::UpstreamUnavailable));
        assert_eq!(result.unwrap_err().status().as_u16(), 502);
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_incomplete_resolution() {
        let responses = [
            ResolveResponse {
                org_id: Some(String::new()),
                user_id: Some(String::new()),
            },
            ResolveResponse {
                org_id: Some("uuid-org-1".into()),
                user_id: None,
            },
            ResolveResponse::default(),
        ];

        for response in responses {
            let (auth, _, _) = authenticator(
                MockKeyValidator::app("app1"),
                MockIdentityResolver::with_response(response),
            );

            let result = auth
                .authenticate(&headers(&[
                    ("authorization", "Bearer app_xyz"),
                    ("x-org-id", "org_ext1"),
                    ("x-user-id", "user_ext1"),
                ]))
                .await;

            assert_eq!(result, Err(AuthError::IncompleteIdentity));
        }
    }

    #[tokio::test]
    async fn test_identity_skew_is_not_fatal() {
        for skewed_header in ["x-org-id", "x-user-id"] {
            let (auth, _, resolver) = authenticator(
                MockKeyValidator::app("app1"),
                MockIdentityResolver::returning("uuid-org-1", "uuid-user-1"),
            );

            let context = auth
                .authenticate(&headers(&[
                    ("authorization", "Bearer app_xyz"),
                    (skewed_header, "ext"),
                ]))
                .await
                .unwrap();

            assert_eq!(context.app_id.as_deref(), Some("app1"));
            assert_eq!(context.org_id, None);
            assert_eq!(context.user_id, None);
            assert_eq!(context.resolution(), IdentityResolution::Skewed);
            assert_eq!(resolver.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_empty_identity_header_counts_as_absent() {
        let (auth, _, resolver) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::returning("uuid-org-1", "uuid-user-1"),
        );

        let context = auth
            .authenticate(&headers(&[
                ("authorization", "Bearer app_xyz"),
                ("x-org-id", ""),
                ("x-user-id", "user_ext1"),
            ]))
            .await
            .unwrap();

        assert_eq!(context.resolution(), IdentityResolution::Skewed);
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_app_key_without_identity_headers() {
        let (auth, _, resolver) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::returning("uuid-org-1", "uuid-user-1"),
        );

        let context = auth
            .authenticate(&headers(&[("authorization", "Bearer app_xyz")]))
            .await
            .unwrap();

        assert_eq!(
            context,
            IdentityContext::for_app("app1".into(), IdentityResolution::Absent)
        );
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_authenticate_is_idempotent() {
        let (auth, validator, resolver) = authenticator(
            MockKeyValidator::app("app1"),
            MockIdentityResolver::returning("uuid-org-1", "uuid-user-1"),
        );

        let request_headers = headers(&[
            ("authorization", "Bearer app_xyz"),
            ("x-org-id", "org_ext1"),
            ("x-user-id", "user_ext1"),
        ]);

        let first = auth.authenticate(&request_headers).await.unwrap();
        let second = auth.authenticate(&request_headers).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(validator.calls(), 2);
        assert_eq!(resolver.calls(), 2);
    }
}
