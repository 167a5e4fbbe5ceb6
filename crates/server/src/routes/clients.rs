use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::client::{Client, CreateClient, UpdateClient};
use deployment::Deployment;
use serde::Deserialize;
use uuid::Uuid;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{
        auth::AuthUser,
        extract::{ApiJson, ApiPath},
    },
};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}

/// GET /api/clients?search=
pub async fn list_clients(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    Query(params): Query<SearchParams>,
) -> Result<ResponseJson<ApiResponse<Vec<Client>>>, ApiError> {
    let clients = deployment
        .clients()
        .list(user.id, params.search.as_deref())
        .await?;
    Ok(ResponseJson(ApiResponse::success(clients)))
}

pub async fn get_client(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let client = deployment.clients().get(user.id, id).await?;
    Ok(ResponseJson(ApiResponse::success(client)))
}

pub async fn create_client(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiJson(payload): ApiJson<CreateClient>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let client = deployment.clients().create(user.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(client)))
}

pub async fn update_client(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateClient>,
) -> Result<ResponseJson<ApiResponse<Client>>, ApiError> {
    let client = deployment.clients().update(user.id, id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(client)))
}

/// DELETE /api/clients/{id}
/// Also deletes every follow-up addressed to the client
pub async fn delete_client(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    deployment.clients().delete(user.id, id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
}
