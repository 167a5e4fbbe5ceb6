use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::followup::{CreateFollowup, FollowupView, UpdateFollowup};
use deployment::Deployment;
use services::services::followups::RECENT_LIMIT;
use uuid::Uuid;
use utils::response::ApiResponse;

use super::clients::SearchParams;
use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{
        auth::AuthUser,
        extract::{ApiJson, ApiPath},
    },
};

/// GET /api/followups?search=
/// Newest first, with the client's name and email and the display status
pub async fn list_followups(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<ResponseJson<ApiResponse<Vec<FollowupView>>>, ApiError> {
    let followups = deployment
        .followups()
        .list(user.id, params.search.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(followups)))
}

pub async fn recent_followups(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
) -> Result<ResponseJson<ApiResponse<Vec<FollowupView>>>, ApiError> {
    let followups = deployment.followups().recent(user.id, RECENT_LIMIT).await?;
    Ok(ResponseJson(ApiResponse::success(followups)))
}

pub async fn get_followup(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<FollowupView>>, ApiError> {
    let followup = deployment.followups().get(user.id, id).await?;
    Ok(ResponseJson(ApiResponse::success(followup)))
}

/// POST /api/followups
/// With `send_option: "now"` the email goes out before anything is saved
pub async fn create_followup(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateFollowup>,
) -> Result<ResponseJson<ApiResponse<FollowupView>>, ApiError> {
    let followup = deployment.followups().create(user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(followup)))
}

pub async fn update_followup(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateFollowup>,
) -> Result<ResponseJson<ApiResponse<FollowupView>>, ApiError> {
    let followup = deployment.followups().update(user.id, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(followup)))
}

pub async fn delete_followup(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.followups().delete(user.id, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/followups", get(list_followups).post(create_followup))
        .route("/followups/recent", get(recent_followups))
        .route(
            "/followups/{id}",
            get(get_followup).put(update_followup).delete(delete_followup),
        )
}
