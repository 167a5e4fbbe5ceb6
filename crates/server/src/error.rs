use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::ValidationError;
use services::services::{
    analytics::AnalyticsError, clients::ClientServiceError, delivery::DeliveryError,
    email_generator::GenerationError, followups::FollowupServiceError,
    profiles::ProfileServiceError,
};
use thiserror::Error;
use tracing::error;
use utils::{jwt::TokenError, response::ApiResponse};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    ClientService(#[from] ClientServiceError),
    #[error(transparent)]
    FollowupService(#[from] FollowupServiceError),
    #[error(transparent)]
    ProfileService(#[from] ProfileServiceError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] TokenError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("{}", .0.body_text())]
    JsonBody(#[from] JsonRejection),
    #[error("{}", .0.body_text())]
    PathParam(#[from] PathRejection),
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::ClientService(err) => match err {
                ClientServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
                ClientServiceError::NotFound => (StatusCode::NOT_FOUND, "ClientNotFound"),
                ClientServiceError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError")
                }
            },
            ApiError::FollowupService(err) => match err {
                FollowupServiceError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "ValidationError")
                }
                FollowupServiceError::NotFound => (StatusCode::NOT_FOUND, "FollowupNotFound"),
                FollowupServiceError::ClientNotFound => (StatusCode::NOT_FOUND, "ClientNotFound"),
                FollowupServiceError::Delivery(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DeliveryError")
                }
                FollowupServiceError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError")
                }
            },
            ApiError::ProfileService(err) => match err {
                ProfileServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
                ProfileServiceError::NotFound => (StatusCode::NOT_FOUND, "ProfileNotFound"),
                ProfileServiceError::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError")
                }
            },
            ApiError::Delivery(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeliveryError"),
            ApiError::Generation(err) => match err {
                GenerationError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
                GenerationError::ClaudeApi(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "GenerationError")
                }
            },
            ApiError::Analytics(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            ApiError::JsonBody(_) | ApiError::PathParam(_) => {
                (StatusCode::BAD_REQUEST, "ValidationError")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status_and_type();

        let message = match &self {
            ApiError::Unauthorized(_) => "Unauthorized".to_string(),
            other => other.to_string(),
        };
        if status_code.is_server_error() {
            error!(error_type, error = %self, "Request failed");
        }

        let response = ApiResponse::<()>::error(&message);
        (status_code, Json(response)).into_response()
    }
}
