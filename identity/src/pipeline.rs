use crate::authenticator::Authenticator;
use crate::errors::AuthError;
use crate::guards::{require_org, require_user};
use crate::types::IdentityContext;
use http::HeaderMap;
use serde::Deserialize;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PipelineError {
    #[error("{0:?} must come after authenticate")]
    GuardBeforeAuthenticate(AuthStep),
    #[error("authenticate listed more than once")]
    DuplicateAuthenticate,
}

/// One step of a route's auth pipeline.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthStep {
    Authenticate,
    RequireOrg,
    RequireUser,
}

/// The ordered identity requirements of a route. An empty pipeline is a public
/// route.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(try_from = "Vec<AuthStep>")]
pub struct AuthPipeline {
    steps: Vec<AuthStep>,
}

impl TryFrom<Vec<AuthStep>> for AuthPipeline {
    type Error = PipelineError;

    fn try_from(steps: Vec<AuthStep>) -> Result<Self, Self::Error> {
        let mut authenticated = false;

        for step in &steps {
            match step {
                AuthStep::Authenticate if authenticated => {
                    return Err(PipelineError::DuplicateAuthenticate);
                }
                AuthStep::Authenticate => authenticated = true,
                AuthStep::RequireOrg | AuthStep::RequireUser if !authenticated => {
                    return Err(PipelineError::GuardBeforeAuthenticate(*step));
                }
                AuthStep::RequireOrg | AuthStep::RequireUser => {}
            }
        }

        Ok(AuthPipeline { steps })
    }
}

impl AuthPipeline {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[AuthStep] {
        &self.steps
    }

    pub fn is_public(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs each step in order and stops at the first failure.
    ///
    /// Returns the identity when the pipeline authenticates, `None` for public
    /// routes.
    pub async fn run(
        &self,
        authenticator: &Authenticator,
        path: &str,
        headers: &HeaderMap,
    ) -> Result<Option<IdentityContext>, AuthError> {
        let mut context = None;

        for step in &self.steps {
            match step {
                AuthStep::Authenticate => {
                    context = Some(authenticator.authenticate(headers).await?);
                }
                AuthStep::RequireOrg => {
                    let ctx = context.as_ref().ok_or(AuthError::MissingAuthentication)?;
                    require_org(ctx, path, headers)?;
                }
                AuthStep::RequireUser => {
                    let ctx = context.as_ref().ok_or(AuthError::MissingAuthentication)?;
                    require_user(ctx)?;
                }
            }
        }

        Ok(context)
    }
}
