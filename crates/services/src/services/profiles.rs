use std::sync::Arc;

use db::{
    Store,
    models::{
        ValidationError,
        profile::{Profile, UpsertProfile},
    },
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::email_generator::SenderIdentity;

#[derive(Debug, Error)]
pub enum ProfileServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("profile not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn Store>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: Uuid) -> Result<Profile, ProfileServiceError> {
        self.store
            .find_profile(user_id)
            .await?
            .ok_or(ProfileServiceError::NotFound)
    }

    pub async fn upsert(
        &self,
        user_id: Uuid,
        data: &UpsertProfile,
    ) -> Result<Profile, ProfileServiceError> {
        data.validate()?;
        let profile = self.store.upsert_profile(user_id, data).await?;
        info!(user_id = %user_id, "Profile saved");
        Ok(profile)
    }

    /// Signature for generated emails. Falls back to the token's email, then
    /// to placeholders, when the user has not filled in a profile.
    pub async fn sender_identity(
        &self,
        user_id: Uuid,
        token_email: Option<&str>,
    ) -> Result<SenderIdentity, ProfileServiceError> {
        let fallback = SenderIdentity::default();
        let profile = self.store.find_profile(user_id).await?;
        let email = profile
            .as_ref()
            .map(|p| p.email.clone())
            .or_else(|| token_email.map(str::to_string))
            .unwrap_or(fallback.email);
        let name = profile
            .and_then(|p| p.full_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(fallback.name);
        Ok(SenderIdentity { name, email })
    }
}
