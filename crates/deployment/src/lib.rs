use std::sync::Arc;

use db::Store;
use services::services::{
    claude_api::ClaudeApiError,
    clients::ClientService,
    delivery::{DeliveryError, EmailSender},
    email_generator::EmailGenerator,
    followups::FollowupService,
    profiles::ProfileService,
};
use sqlx::Error as SqlxError;
use thiserror::Error;
use utils::jwt::TokenVerifier;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    ClaudeApi(#[from] ClaudeApiError),
}

/// Process-wide context handed to every request handler. Built once at
/// startup; clones share the same store and HTTP clients.
pub trait Deployment: Clone + Send + Sync + 'static {
    fn store(&self) -> &Arc<dyn Store>;

    fn mailer(&self) -> &Arc<dyn EmailSender>;

    fn generator(&self) -> &Arc<dyn EmailGenerator>;

    fn auth(&self) -> &TokenVerifier;

    /// Public origin used to build open-tracking URLs, if tracking is on.
    fn tracking_base_url(&self) -> Option<&str>;

    fn clients(&self) -> ClientService {
        ClientService::new(self.store().clone())
    }

    fn followups(&self) -> FollowupService {
        FollowupService::new(
            self.store().clone(),
            self.mailer().clone(),
            self.tracking_base_url().map(str::to_string),
        )
    }

    fn profiles(&self) -> ProfileService {
        ProfileService::new(self.store().clone())
    }
}
