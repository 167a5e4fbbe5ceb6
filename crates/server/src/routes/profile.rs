use axum::{Router, extract::State, response::Json as ResponseJson, routing::get};
use db::models::profile::{Profile, UpsertProfile};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{auth::AuthUser, extract::ApiJson},
};

pub async fn get_profile(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Profile>>, ApiError> {
    let profile = deployment.profiles().get(user.id).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

pub async fn update_profile(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiJson(payload): ApiJson<UpsertProfile>,
) -> Result<ResponseJson<ApiResponse<Profile>>, ApiError> {
    let profile = deployment.profiles().upsert(user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(profile)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/profile", get(get_profile).put(update_profile))
}
