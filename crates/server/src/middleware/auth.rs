//! Bearer-token authentication for the `/api` routes.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use deployment::Deployment;
use tracing::debug;
use uuid::Uuid;

use crate::{DeploymentImpl, error::ApiError};

/// The verified caller. Every record a handler touches is scoped to `id`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

impl FromRequestParts<DeploymentImpl> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        deployment: &DeploymentImpl,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let claims = deployment.auth().verify_header(header).map_err(|e| {
            debug!(error = %e, path = %parts.uri.path(), "Rejected request");
            e
        })?;
        Ok(Self {
            id: claims.sub,
            email: claims.email,
        })
    }
}
