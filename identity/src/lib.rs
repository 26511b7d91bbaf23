//! Bearer credential authentication and caller identity resolution.
//!
//! A request is authenticated by validating its bearer credential with the key
//! service. App credentials may additionally carry an external org/user pair in
//! the `x-org-id` and `x-user-id` headers, which is mapped to internal
//! identifiers by the identity service. User credentials carry their identity
//! intrinsically.
//!
//! Routes compose [`AuthStep`]s into an [`AuthPipeline`] to declare which
//! identity guarantees they need.

pub mod authenticator;
pub mod client;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod guards;
mod metrics_defs;
pub mod pipeline;
pub mod protocol;
#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
pub mod types;

pub use authenticator::Authenticator;
pub use errors::{AuthError, AuthErrorKind, CollaboratorError};
pub use metrics_defs::ALL_METRICS;
pub use pipeline::{AuthPipeline, AuthStep};
pub use types::{CredentialType, IdentityContext, IdentityResolution};

pub const ORG_ID_HEADER: &str = "x-org-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const BEARER_PREFIX: &str = "Bearer ";
