use crate::errors::CollaboratorError;
use crate::protocol::{ResolveRequest, ResolveResponse};
use crate::types::KeyValidation;
use async_trait::async_trait;

/// Validates bearer credentials. The sole authority on credential type and,
/// for user credentials, on identity.
#[async_trait]
pub trait KeyValidator: Send + Sync {
    async fn validate(&self, credential: &str) -> Result<KeyValidation, CollaboratorError>;
}

/// Maps an app's external org/user pair to internal identifiers.
///
/// Implementations are expected to upsert: repeated calls with the same pair
/// return the same identifiers.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, request: &ResolveRequest) -> Result<ResolveResponse, CollaboratorError>;
}
