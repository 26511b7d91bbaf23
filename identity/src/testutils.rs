//! In-memory collaborators for tests.

use crate::collaborators::{IdentityResolver, KeyValidator};
use crate::errors::CollaboratorError;
use crate::protocol::{IDENTITY_SERVICE, KEY_SERVICE, ResolveRequest, ResolveResponse};
use crate::types::KeyValidation;
use async_trait::async_trait;
use http::StatusCode;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockKeyValidator {
    response: Option<KeyValidation>,
    calls: AtomicUsize,
    credentials: Mutex<Vec<String>>,
}

impl MockKeyValidator {
    pub fn returning(validation: KeyValidation) -> Self {
        Self {
            response: Some(validation),
            calls: AtomicUsize::new(0),
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn app(app_id: &str) -> Self {
        Self::returning(KeyValidation::App {
            app_id: app_id.into(),
        })
    }

    pub fn user(app_id: &str, org_id: &str, user_id: &str) -> Self {
        Self::returning(KeyValidation::User {
            app_id: Some(app_id.into()),
            org_id: Some(org_id.into()),
            user_id: Some(user_id.into()),
        })
    }

    pub fn invalid() -> Self {
        Self::returning(KeyValidation::Invalid)
    }

    /// Every call fails as if the key service were down.
    pub fn failing() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
            credentials: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn credentials(&self) -> Vec<String> {
        self.credentials.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeyValidator for MockKeyValidator {
    async fn validate(&self, credential: &str) -> Result<KeyValidation, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.credentials.lock().unwrap().push(credential.to_string());

        self.response
            .clone()
            .ok_or(CollaboratorError::RetriesExceeded(KEY_SERVICE))
    }
}

pub struct MockIdentityResolver {
    response: Option<ResolveResponse>,
    calls: AtomicUsize,
    requests: Mutex<Vec<ResolveRequest>>,
}

impl MockIdentityResolver {
    pub fn returning(org_id: &str, user_id: &str) -> Self {
        Self::with_response(ResolveResponse {
            org_id: Some(org_id.into()),
            user_id: Some(user_id.into()),
        })
    }

    pub fn with_response(response: ResolveResponse) -> Self {
        Self {
            response: Some(response),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ResolveRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityResolver for MockIdentityResolver {
    async fn resolve(&self, request: &ResolveRequest) -> Result<ResolveResponse, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        self.response
            .clone()
            .ok_or(CollaboratorError::UnexpectedStatus {
                collaborator: IDENTITY_SERVICE,
                status: StatusCode::SERVICE_UNAVAILABLE,
            })
    }
}
