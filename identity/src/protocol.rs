//! Wire contracts of the key service and the identity service.

use crate::errors::CollaboratorError;
use crate::types::{KeyValidation, ResolvedIdentity};
use serde::{Deserialize, Serialize};

pub const KEY_SERVICE: &str = "key_service";
pub const IDENTITY_SERVICE: &str = "identity_service";

#[derive(Serialize, Debug)]
pub struct ValidateKeyRequest<'a> {
    pub key: &'a str,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    App,
    User,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidateKeyResponse {
    pub valid: bool,
    #[serde(rename = "type", default)]
    pub key_type: Option<KeyType>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl TryFrom<ValidateKeyResponse> for KeyValidation {
    type Error = CollaboratorError;

    fn try_from(response: ValidateKeyResponse) -> Result<Self, Self::Error> {
        if !response.valid {
            return Ok(KeyValidation::Invalid);
        }

        match response.key_type {
            Some(KeyType::App) => match response.app_id {
                Some(app_id) if !app_id.is_empty() => Ok(KeyValidation::App { app_id }),
                _ => Err(CollaboratorError::ContractViolation {
                    collaborator: KEY_SERVICE,
                    reason: "app key without appId".into(),
                }),
            },
            Some(KeyType::User) => Ok(KeyValidation::User {
                app_id: response.app_id,
                org_id: response.org_id,
                user_id: response.user_id,
            }),
            None => Err(CollaboratorError::ContractViolation {
                collaborator: KEY_SERVICE,
                reason: "valid key without type".into(),
            }),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub app_id: String,
    pub external_org_id: String,
    pub external_user_id: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl ResolveResponse {
    /// Returns the resolved pair only when both identifiers are non-empty.
    pub fn into_resolved(self) -> Option<ResolvedIdentity> {
        let org_id = self.org_id.filter(|id| !id.is_empty())?;
        let user_id = self.user_id.filter(|id| !id.is_empty())?;
        Some(ResolvedIdentity { org_id, user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<KeyValidation, CollaboratorError> {
        let response: ValidateKeyResponse = serde_json::from_str(json).unwrap();
        KeyValidation::try_from(response)
    }

    #[test]
    fn test_validate_response_contract() {
        assert_eq!(parse(r#"{"valid": false}"#).unwrap(), KeyValidation::Invalid);

        assert_eq!(
            parse(r#"{"valid": true, "type": "app", "appId": "app1"}"#).unwrap(),
            KeyValidation::App {
                app_id: "app1".into()
            }
        );

        assert_eq!(
            parse(
                r#"{"valid": true, "type": "user", "appId": "app1", "orgId": "uuid-org-9", "userId": "uuid-user-9"}"#
            )
            .unwrap(),
            KeyValidation::User {
                app_id: Some("app1".into()),
                org_id: Some("uuid-org-9".into()),
                user_id: Some("uuid-user-9".into()),
            }
        );

        assert!(matches!(
            parse(r#"{"valid": true, "type": "app"}"#),
            Err(CollaboratorError::ContractViolation { .. })
        ));
        assert!(matches!(
            parse(r#"{"valid": true}"#),
            Err(CollaboratorError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_resolve_request_wire_format() {
        let request = ResolveRequest {
            app_id: "app1".into(),
            external_org_id: "org_ext1".into(),
            external_user_id: "user_ext1".into(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "appId": "app1",
                "externalOrgId": "org_ext1",
                "externalUserId": "user_ext1",
            })
        );
    }

    #[test]
    fn test_resolve_response_completeness() {
        let complete: ResolveResponse =
            serde_json::from_str(r#"{"orgId": "uuid-org-1", "userId": "uuid-user-1"}"#).unwrap();
        assert_eq!(
            complete.into_resolved(),
            Some(ResolvedIdentity {
                org_id: "uuid-org-1".into(),
                user_id: "uuid-user-1".into(),
            })
        );

        let empty: ResolveResponse =
            serde_json::from_str(r#"{"orgId": "", "userId": "uuid-user-1"}"#).unwrap();
        assert_eq!(empty.into_resolved(), None);

        let missing: ResolveResponse = serde_json::from_str(r#"{"orgId": "uuid-org-1"}"#).unwrap();
        assert_eq!(missing.into_resolved(), None);
    }
}
