//! In-process store with the same semantics as the Postgres schema
//! (ownership scoping, newest-first ordering, cascade on client delete).
//! Backs local runs without `DATABASE_URL` and the test suites.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        client::{Client, CreateClient, UpdateClient},
        followup::{Followup, FollowupDraft, FollowupStatus, FollowupWithClient, SentFollowupStat},
        profile::{Profile, UpsertProfile},
    },
    store::{ClientStore, FollowupStore, ProfileStore, Store},
};

#[derive(Default)]
struct Tables {
    clients: Vec<Client>,
    followups: Vec<Followup>,
    profiles: HashMap<Uuid, Profile>,
}

impl Tables {
    fn join(&self, followup: &Followup) -> Option<FollowupWithClient> {
        let client = self.clients.iter().find(|c| c.id == followup.client_id)?;
        Some(FollowupWithClient {
            followup: followup.clone(),
            client_name: client.full_name.clone(),
            client_email: client.email.clone(),
        })
    }

    fn require_client(&self, client_id: Uuid) -> Result<(), sqlx::Error> {
        if self.clients.iter().any(|c| c.id == client_id) {
            Ok(())
        } else {
            Err(sqlx::Error::Protocol(format!(
                "foreign key violation: client {client_id} does not exist"
            )))
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total follow-up rows across all users.
    pub async fn followup_count(&self) -> usize {
        self.tables.read().await.followups.len()
    }
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

#[async_trait]
impl ClientStore for MemoryStore {
    async fn list_clients(&self, user_id: Uuid) -> Result<Vec<Client>, sqlx::Error> {
        let tables = self.tables.read().await;
        let owned: Vec<Client> = tables
            .clients
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(&owned, |c| c.created_at))
    }

    async fn find_client(&self, user_id: Uuid, id: Uuid) -> Result<Option<Client>, sqlx::Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned())
    }

    async fn create_client(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &CreateClient,
    ) -> Result<Client, sqlx::Error> {
        let now = Utc::now();
        let client = Client {
            id,
            user_id,
            full_name: data.full_name.trim().to_string(),
            email: data.email.trim().to_string(),
            company: data.company.clone(),
            phone: data.phone.clone(),
            notes: data.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.clients.push(client.clone());
        Ok(client)
    }

    async fn update_client(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &UpdateClient,
    ) -> Result<Option<Client>, sqlx::Error> {
        let mut tables = self.tables.write().await;
        let Some(client) = tables
            .clients
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
        else {
            return Ok(None);
        };
        let trimmed = UpdateClient {
            full_name: data.full_name.as_deref().map(|s| s.trim().to_string()),
            email: data.email.as_deref().map(|s| s.trim().to_string()),
            ..data.clone()
        };
        trimmed.apply(client);
        client.updated_at = Utc::now();
        Ok(Some(client.clone()))
    }

    async fn delete_client(&self, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut tables = self.tables.write().await;
        let before = tables.clients.len();
        tables
            .clients
            .retain(|c| !(c.id == id && c.user_id == user_id));
        let removed = (before - tables.clients.len()) as u64;
        if removed > 0 {
            tables.followups.retain(|f| f.client_id != id);
        }
        Ok(removed)
    }

    async fn count_clients_created_between(
        &self,
        user_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        let tables = self.tables.read().await;
        let count = tables
            .clients
            .iter()
            .filter(|c| c.user_id == user_id)
            .filter(|c| start.is_none_or(|s| c.created_at >= s))
            .filter(|c| end.is_none_or(|e| c.created_at < e))
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl FollowupStore for MemoryStore {
    async fn list_followups(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<FollowupWithClient>, sqlx::Error> {
        let tables = self.tables.read().await;
        let owned: Vec<Followup> = tables
            .followups
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        let rows = newest_first(&owned, |f| f.created_at)
            .iter()
            .filter_map(|f| tables.join(f))
            .take(limit.map_or(usize::MAX, |l| l.max(0) as usize))
            .collect();
        Ok(rows)
    }

    async fn find_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FollowupWithClient>, sqlx::Error> {
        let tables = self.tables.read().await;
        Ok(tables
            .followups
            .iter()
            .find(|f| f.id == id && f.user_id == user_id)
            .and_then(|f| tables.join(f)))
    }

    async fn create_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Followup, sqlx::Error> {
        let mut tables = self.tables.write().await;
        tables.require_client(draft.client_id)?;
        let followup = Followup {
            id,
            user_id,
            client_id: draft.client_id,
            subject: draft.subject.clone(),
            body: draft.body.clone(),
            status: draft.plan.status,
            scheduled_at: draft.plan.scheduled_at,
            sent_at: draft.plan.sent_at,
            is_opened: false,
            opened_at: None,
            created_at,
            updated_at: created_at,
        };
        tables.followups.push(followup.clone());
        Ok(followup)
    }

    async fn update_followup(
        &self,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
    ) -> Result<Option<Followup>, sqlx::Error> {
        let mut tables = self.tables.write().await;
        tables.require_client(draft.client_id)?;
        let Some(followup) = tables
            .followups
            .iter_mut()
            .find(|f| f.id == id && f.user_id == user_id)
        else {
            return Ok(None);
        };
        followup.client_id = draft.client_id;
        followup.subject = draft.subject.clone();
        followup.body = draft.body.clone();
        followup.status = draft.plan.status;
        followup.scheduled_at = draft.plan.scheduled_at;
        followup.sent_at = draft.plan.sent_at;
        followup.is_opened = false;
        followup.opened_at = None;
        followup.updated_at = Utc::now();
        Ok(Some(followup.clone()))
    }

    async fn delete_followup(&self, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut tables = self.tables.write().await;
        let before = tables.followups.len();
        tables
            .followups
            .retain(|f| !(f.id == id && f.user_id == user_id));
        Ok((before - tables.followups.len()) as u64)
    }

    async fn mark_followup_opened(
        &self,
        id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let mut tables = self.tables.write().await;
        match tables
            .followups
            .iter_mut()
            .find(|f| f.id == id && f.status == FollowupStatus::Sent && !f.is_opened)
        {
            Some(followup) => {
                followup.is_opened = true;
                followup.opened_at = Some(opened_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn sent_followups_between(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SentFollowupStat>, sqlx::Error> {
        let tables = self.tables.read().await;
        let mut rows: Vec<SentFollowupStat> = tables
            .followups
            .iter()
            .filter(|f| f.user_id == user_id && f.status == FollowupStatus::Sent)
            .filter_map(|f| {
                f.sent_at.map(|sent_at| SentFollowupStat {
                    sent_at,
                    is_opened: f.is_opened,
                })
            })
            .filter(|s| s.sent_at >= start && end.is_none_or(|e| s.sent_at < e))
            .collect();
        rows.sort_by_key(|s| s.sent_at);
        Ok(rows)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn find_profile(&self, user_id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(
        &self,
        user_id: Uuid,
        data: &UpsertProfile,
    ) -> Result<Profile, sqlx::Error> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;
        let profile = tables
            .profiles
            .entry(user_id)
            .and_modify(|p| {
                p.email = data.email.trim().to_string();
                p.full_name = data.full_name.clone();
                p.updated_at = now;
            })
            .or_insert_with(|| Profile {
                id: user_id,
                email: data.email.trim().to_string(),
                full_name: data.full_name.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(profile.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
