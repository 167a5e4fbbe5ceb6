use axum::{Router, extract::State, response::Json as ResponseJson, routing::post};
use deployment::Deployment;
use services::services::{
    delivery::{DeliveryReceipt, EmailSender, OutgoingEmail},
    email_generator::{EmailGenerator, GenerateEmailRequest, GeneratedEmail},
};
use tracing::info;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::{auth::AuthUser, extract::ApiJson},
};

/// POST /api/emails/send
/// One delivery attempt; failures come back as 500 with the provider message
pub async fn send_email(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiJson(payload): ApiJson<OutgoingEmail>,
) -> Result<ResponseJson<ApiResponse<DeliveryReceipt>>, ApiError> {
    payload.validate()?;
    let receipt = deployment.mailer().send(&payload).await?;
    info!(user_id = %user.id, message_id = %receipt.message_id, "Ad-hoc email sent");
    Ok(ResponseJson(ApiResponse::success(receipt)))
}

/// POST /api/emails/generate
/// Draft a follow-up body signed with the caller's profile
pub async fn generate_email(
    State(deployment): State<DeploymentImpl>,
    user: AuthUser,
    ApiJson(payload): ApiJson<GenerateEmailRequest>,
) -> Result<ResponseJson<ApiResponse<GeneratedEmail>>, ApiError> {
    payload.validate()?;
    let sender = deployment
        .profiles()
        .sender_identity(user.id, user.email.as_deref())
        .await?;
    let email_body = deployment.generator().generate(&payload, &sender).await?;
    Ok(ResponseJson(ApiResponse::success(GeneratedEmail {
        success: true,
        email_body,
    })))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/emails/send", post(send_email))
        .route("/emails/generate", post(generate_email))
}
