use serde::Serialize;

/// The kind of bearer credential a request was authenticated with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    AppKey,
    UserKey,
}

impl CredentialType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CredentialType::AppKey => "app_key",
            CredentialType::UserKey => "user_key",
        }
    }
}

/// Outcome of key validation, checked against the key service contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyValidation {
    Invalid,
    App {
        app_id: String,
    },
    User {
        app_id: Option<String>,
        org_id: Option<String>,
        user_id: Option<String>,
    },
}

/// Caller supplied identifiers from the caller's own identity space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub external_org_id: String,
    pub external_user_id: String,
}

/// Internal identifiers produced by the identity service. Both are non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub org_id: String,
    pub user_id: String,
}

/// How the org/user part of an [`IdentityContext`] was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityResolution {
    /// User credential, identity taken from key validation.
    Intrinsic,
    /// App credential, both identity headers resolved.
    Resolved,
    /// App credential with only one of the two identity headers.
    Skewed,
    /// App credential without identity headers.
    Absent,
}

impl IdentityResolution {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IdentityResolution::Intrinsic => "intrinsic",
            IdentityResolution::Resolved => "resolved",
            IdentityResolution::Skewed => "skewed",
            IdentityResolution::Absent => "absent",
        }
    }
}

/// Identity attached to an authenticated request for downstream handlers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityContext {
    pub app_id: Option<String>,
    pub org_id: Option<String>,
    pub user_id: Option<String>,
    pub credential_type: CredentialType,
    #[serde(skip)]
    resolution: IdentityResolution,
}

impl IdentityContext {
    /// How the org/user identity was established.
    pub fn resolution(&self) -> IdentityResolution {
        self.resolution
    }

    pub fn for_app(app_id: String, resolution: IdentityResolution) -> Self {
        Self {
            app_id: Some(app_id),
            org_id: None,
            user_id: None,
            credential_type: CredentialType::AppKey,
            resolution,
        }
    }

    pub fn for_resolved_app(app_id: String, identity: ResolvedIdentity) -> Self {
        Self {
            app_id: Some(app_id),
            org_id: Some(identity.org_id),
            user_id: Some(identity.user_id),
            credential_type: CredentialType::AppKey,
            resolution: IdentityResolution::Resolved,
        }
    }

    /// Identity carried by a user credential. Empty ids count as absent.
    pub fn for_user(
        app_id: Option<String>,
        org_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        let non_empty = |id: Option<String>| id.filter(|id| !id.is_empty());

        Self {
            app_id: non_empty(app_id),
            org_id: non_empty(org_id),
            user_id: non_empty(user_id),
            credential_type: CredentialType::UserKey,
            resolution: IdentityResolution::Intrinsic,
        }
    }
}
