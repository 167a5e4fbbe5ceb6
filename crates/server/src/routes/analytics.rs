use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use chrono::Utc;
use deployment::Deployment;
use services::services::analytics::{Dashboard, load_dashboard};
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError, middleware::auth::AuthUser};

/// GET /api/analytics/dashboard
/// Stat cards plus the seven-month activity series
pub async fn get_dashboard(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Dashboard>>, ApiError> {
    let dashboard = load_dashboard(deployment.store().as_ref(), user.id, Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success(dashboard)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/analytics/dashboard", get(get_dashboard))
}
