//! Typed data-access seams. Services only ever see these traits, so the
//! Postgres pool and the in-memory tables are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    DBService,
    models::{
        client::{Client, CreateClient, UpdateClient},
        followup::{Followup, FollowupDraft, FollowupWithClient, SentFollowupStat},
        profile::{Profile, UpsertProfile},
    },
};

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// All clients of `user_id`, newest first.
    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<Client>, sqlx::Error>;
    async fn find_client(&self, user_id: Uuid, id: Uuid) -> Result<Option<Client>, sqlx::Error>;
    async fn create_client(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &CreateClient,
    ) -> Result<Client, sqlx::Error>;
    async fn update_client(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &UpdateClient,
    ) -> Result<Option<Client>, sqlx::Error>;
    /// Removes the client and, by cascade, its follow-ups.
    async fn delete_client(&self, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error>;
    async fn count_clients_created_between(
        &self,
        user_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error>;
}

#[async_trait]
pub trait FollowupStore: Send + Sync {
    /// Follow-ups of `user_id` joined with their client, newest first.
    async fn list_followups(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<FollowupWithClient>, sqlx::Error>;
    async fn find_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FollowupWithClient>, sqlx::Error>;
    async fn create_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Followup, sqlx::Error>;
    async fn update_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
    ) -> Result<Option<Followup>, sqlx::Error>;
    async fn delete_followup(&self, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error>;
    async fn mark_followup_opened(
        &self,
        id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error>;
    async fn sent_followups_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SentFollowupStat>, sqlx::Error>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error>;
    async fn upsert_profile(
        &self,
        user_id: Uuid,
        data: &UpsertProfile,
    ) -> Result<Profile, sqlx::Error>;
}

#[async_trait]
pub trait Store: ClientStore + FollowupStore + ProfileStore {
    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl ClientStore for DBService {
    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<Client>, sqlx::Error> {
        Client::find_by_user_id(&self.pool, user_id).await
    }

    async fn find_client(&self, user_id: Uuid, id: Uuid) -> Result<Option<Client>, sqlx::Error> {
        Client::find_by_id(&self.pool, user_id, id).await
    }

    async fn create_client(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &CreateClient,
    ) -> Result<Client, sqlx::Error> {
        Client::create(&self.pool, user_id, id, data).await
    }

    async fn update_client(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &UpdateClient,
    ) -> Result<Option<Client>, sqlx::Error> {
        Client::update(&self.pool, user_id, id, data).await
    }

    async fn delete_client(&self, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        Client::delete(&self.pool, user_id, id).await
    }

    async fn count_clients_created_between(
        &self,
        user_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        Client::count_created_between(&self.pool, user_id, start, end).await
    }
}

#[async_trait]
impl FollowupStore for DBService {
    async fn list_followups(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<FollowupWithClient>, sqlx::Error> {
        Followup::find_by_user_id(&self.pool, user_id, limit).await
    }

    async fn find_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FollowupWithClient>, sqlx::Error> {
        Followup::find_by_id(&self.pool, user_id, id).await
    }

    async fn create_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Followup, sqlx::Error> {
        Followup::create(&self.pool, user_id, id, draft, created_at).await
    }

    async fn update_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
    ) -> Result<Option<Followup>, sqlx::Error> {
        Followup::update(&self.pool, user_id, id, draft).await
    }

    async fn delete_followup(&self, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        Followup::delete(&self.pool, user_id, id).await
    }

    async fn mark_followup_opened(
        &self,
        id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        Followup::mark_opened(&self.pool, id, opened_at).await
    }

    async fn sent_followups_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SentFollowupStat>, sqlx::Error> {
        Followup::find_sent_between(&self.pool, user_id, start, end).await
    }
}

#[async_trait]
impl ProfileStore for DBService {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        Profile::find_by_id(&self.pool, user_id).await
    }

    async fn upsert_profile(
        &self,
        user_id: Uuid,
        data: &UpsertProfile,
    ) -> Result<Profile, sqlx::Error> {
        Profile::upsert(&self.pool, user_id, data).await
    }
}

#[async_trait]
impl Store for DBService {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
