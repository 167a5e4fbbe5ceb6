//! Follow-up lifecycle: create, edit, list and delete follow-up emails and
//! trigger delivery for the "send now" choice.
//!
//! Validation always runs before any external call. For "now" the email is
//! sent before the row is written, so a failed send leaves nothing behind.
//! Scheduled follow-ups only carry their timestamp; nothing in this process
//! promotes them to sent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use db::{
    Store,
    models::{
        ValidationError,
        client::Client,
        followup::{
            CreateFollowup, DeliveryPlan, FollowupDraft, FollowupView, FollowupWithClient,
            SendOption, UpdateFollowup,
        },
    },
};
use thiserror::Error;
use tracing::{debug, info, warn};
use utils::text::{plain_text_to_html, tracking_pixel};
use uuid::Uuid;

use super::delivery::{DeliveryError, EmailSender, OutgoingEmail};

/// Size of the dashboard's "recent follow-ups" list.
pub const RECENT_LIMIT: i64 = 5;

#[derive(Debug, Error)]
pub enum FollowupServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("follow-up not found")]
    NotFound,
    #[error("client not found")]
    ClientNotFound,
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct FollowupService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn EmailSender>,
    tracking_base_url: Option<String>,
}

/// Form content before it is checked against the store.
struct Submission<'a> {
    client_id: Uuid,
    subject: &'a str,
    body: &'a str,
    send_option: SendOption,
    scheduled_at: Option<DateTime<Utc>>,
}

impl FollowupService {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn EmailSender>,
        tracking_base_url: Option<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            tracking_base_url: tracking_base_url.map(|u| u.trim_end_matches('/').to_string()),
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<FollowupView>, FollowupServiceError> {
        let rows = self.store.list_followups(user_id, None).await?;
        Ok(rows
            .into_iter()
            .filter(|row| search.is_none_or(|term| row.matches(term)))
            .map(FollowupView::from)
            .collect())
    }

    pub async fn recent(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<FollowupView>, FollowupServiceError> {
        let rows = self.store.list_followups(user_id, Some(limit)).await?;
        Ok(rows.into_iter().map(FollowupView::from).collect())
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<FollowupView, FollowupServiceError> {
        self.store
            .find_followup(user_id, id)
            .await?
            .map(FollowupView::from)
            .ok_or(FollowupServiceError::NotFound)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        data: &CreateFollowup,
    ) -> Result<FollowupView, FollowupServiceError> {
        self.create_at(user_id, data, Utc::now()).await
    }

    /// Create against an explicit clock; `now` is both the validation
    /// reference and the row's `created_at`.
    pub async fn create_at(
        &self,
        user_id: Uuid,
        data: &CreateFollowup,
        now: DateTime<Utc>,
    ) -> Result<FollowupView, FollowupServiceError> {
        let submission = Submission {
            client_id: data.client_id,
            subject: &data.subject,
            body: &data.body,
            send_option: data.send_option,
            scheduled_at: data.scheduled_at,
        };
        let (draft, client) = self.prepare(user_id, submission, now).await?;

        let id = Uuid::new_v4();
        if draft.plan.sends_now() {
            self.deliver(id, &client, &draft).await?;
        }

        let followup = self.store.create_followup(user_id, id, &draft, now).await?;
        info!(
            user_id = %user_id,
            followup_id = %followup.id,
            status = %followup.status,
            "Follow-up created"
        );
        Ok(FollowupWithClient {
            followup,
            client_name: client.full_name,
            client_email: client.email,
        }
        .into())
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &UpdateFollowup,
    ) -> Result<FollowupView, FollowupServiceError> {
        self.update_at(user_id, id, data, Utc::now()).await
    }

    pub async fn update_at(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &UpdateFollowup,
        now: DateTime<Utc>,
    ) -> Result<FollowupView, FollowupServiceError> {
        let existing = self
            .store
            .find_followup(user_id, id)
            .await?
            .ok_or(FollowupServiceError::NotFound)?;

        let submission = Submission {
            client_id: data.client_id.unwrap_or(existing.client_id),
            subject: data.subject.as_deref().unwrap_or(&existing.subject),
            body: data.body.as_deref().unwrap_or(&existing.body),
            send_option: data.send_option,
            scheduled_at: data.scheduled_at,
        };
        let (draft, client) = self.prepare(user_id, submission, now).await?;

        if draft.plan.sends_now() {
            self.deliver(id, &client, &draft).await?;
        }

        let followup = self
            .store
            .update_followup(user_id, id, &draft)
            .await?
            .ok_or(FollowupServiceError::NotFound)?;
        info!(
            user_id = %user_id,
            followup_id = %id,
            status = %followup.status,
            "Follow-up updated"
        );
        Ok(FollowupWithClient {
            followup,
            client_name: client.full_name,
            client_email: client.email,
        }
        .into())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), FollowupServiceError> {
        if self.store.delete_followup(user_id, id).await? == 0 {
            return Err(FollowupServiceError::NotFound);
        }
        info!(user_id = %user_id, followup_id = %id, "Follow-up deleted");
        Ok(())
    }

    /// Record the first open of a sent follow-up. Unknown ids and unsent or
    /// already-opened rows are ignored.
    pub async fn mark_opened(&self, id: Uuid) -> Result<bool, FollowupServiceError> {
        let flipped = self.store.mark_followup_opened(id, Utc::now()).await?;
        if flipped {
            info!(followup_id = %id, "Follow-up opened");
        } else {
            debug!(followup_id = %id, "Open ignored");
        }
        Ok(flipped)
    }

    async fn prepare(
        &self,
        user_id: Uuid,
        submission: Submission<'_>,
        now: DateTime<Utc>,
    ) -> Result<(FollowupDraft, Client), FollowupServiceError> {
        if submission.subject.trim().is_empty() {
            return Err(ValidationError::new("subject is required").into());
        }
        if submission.body.trim().is_empty() {
            return Err(ValidationError::new("body is required").into());
        }
        let plan = DeliveryPlan::resolve(submission.send_option, submission.scheduled_at, now)?;

        let client = self
            .store
            .find_client(user_id, submission.client_id)
            .await?
            .ok_or(FollowupServiceError::ClientNotFound)?;
        if client.email.trim().is_empty() {
            return Err(ValidationError::new("client has no email address").into());
        }

        let draft = FollowupDraft {
            client_id: client.id,
            subject: submission.subject.trim().to_string(),
            body: submission.body.to_string(),
            plan,
        };
        Ok((draft, client))
    }

    async fn deliver(
        &self,
        followup_id: Uuid,
        client: &Client,
        draft: &FollowupDraft,
    ) -> Result<(), FollowupServiceError> {
        let email = OutgoingEmail {
            to: client.email.clone(),
            subject: draft.subject.clone(),
            html_body: self.render_html(followup_id, &draft.body),
        };
        match self.mailer.send(&email).await {
            Ok(receipt) => {
                debug!(followup_id = %followup_id, message_id = %receipt.message_id, "Follow-up delivered");
                Ok(())
            }
            Err(e) => {
                warn!(followup_id = %followup_id, error = %e, "Follow-up delivery failed, nothing saved");
                Err(e.into())
            }
        }
    }

    fn render_html(&self, followup_id: Uuid, body: &str) -> String {
        let mut html = plain_text_to_html(body);
        if let Some(base) = &self.tracking_base_url {
            html.push('\n');
            html.push_str(&tracking_pixel(&format!(
                "{base}/api/track/open/{followup_id}"
            )));
        }
        html
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use db::{
        ClientStore, MemoryStore,
        models::{
            client::CreateClient,
            followup::{DisplayStatus, FollowupStatus},
        },
    };
    use tokio::sync::Mutex;

    use super::*;
    use crate::services::delivery::DeliveryReceipt;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl EmailSender for RecordingSender {
        async fn send(&self, email: &OutgoingEmail) -> Result<DeliveryReceipt, DeliveryError> {
            self.sent.lock().await.push(email.clone());
            Ok(DeliveryReceipt {
                success: true,
                message_id: "msg_1".into(),
            })
        }
    }

    struct FailingSender;

    #[async_trait]
    impl EmailSender for FailingSender {
        async fn send(&self, _email: &OutgoingEmail) -> Result<DeliveryReceipt, DeliveryError> {
            Err(DeliveryError::Rejected("domain not verified".into()))
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        mailer: Arc<RecordingSender>,
        service: FollowupService,
        user: Uuid,
        client: Client,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingSender::default());
        let user = Uuid::new_v4();
        let client = store
            .create_client(
                user,
                Uuid::new_v4(),
                &CreateClient {
                    full_name: "Jane Doe".into(),
                    email: "jane@x.com".into(),
                    company: None,
                    phone: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
        let service = FollowupService::new(
            store.clone(),
            mailer.clone(),
            Some("https://app.example.com/".into()),
        );
        Fixture {
            store,
            mailer,
            service,
            user,
            client,
        }
    }

    fn create(client_id: Uuid, option: SendOption, at: Option<DateTime<Utc>>) -> CreateFollowup {
        CreateFollowup {
            client_id,
            subject: "Great meeting".into(),
            body: "Hi Jane,\n\nThanks for your time.".into(),
            send_option: option,
            scheduled_at: at,
        }
    }

    #[tokio::test]
    async fn send_now_delivers_then_stores_sent_row() {
        let fx = fixture().await;
        let now = Utc::now();
        let view = fx
            .service
            .create_at(fx.user, &create(fx.client.id, SendOption::Now, None), now)
            .await
            .unwrap();

        assert_eq!(view.followup.status, FollowupStatus::Sent);
        assert_eq!(view.followup.sent_at, Some(now));
        assert_eq!(view.followup.scheduled_at, None);
        assert_eq!(view.display_status, DisplayStatus::Sent);
        assert_eq!(view.client_name, "Jane Doe");

        let sent = fx.mailer.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jane@x.com");
        assert!(sent[0].html_body.starts_with("<p>Hi Jane,</p>"));
        assert!(sent[0].html_body.contains(&format!(
            "https://app.example.com/api/track/open/{}",
            view.followup.id
        )));
    }

    #[tokio::test]
    async fn failed_send_persists_nothing() {
        let fx = fixture().await;
        let service = FollowupService::new(fx.store.clone(), Arc::new(FailingSender), None);

        let err = service
            .create(fx.user, &create(fx.client.id, SendOption::Now, None))
            .await
            .unwrap_err();

        assert!(matches!(err, FollowupServiceError::Delivery(_)));
        assert_eq!(err.to_string(), "domain not verified");
        assert_eq!(fx.store.followup_count().await, 0);
    }

    #[tokio::test]
    async fn later_is_stored_as_scheduled_after_created_at() {
        let fx = fixture().await;
        let now = Utc::now();
        let at = now + Duration::days(1);
        let view = fx
            .service
            .create_at(fx.user, &create(fx.client.id, SendOption::Later, Some(at)), now)
            .await
            .unwrap();

        assert_eq!(view.followup.status, FollowupStatus::Scheduled);
        assert_eq!(view.followup.scheduled_at, Some(at));
        assert!(view.followup.scheduled_at.unwrap() > view.followup.created_at);
        assert_eq!(view.followup.sent_at, None);
        assert!(fx.mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn past_schedule_is_rejected_before_any_write() {
        let fx = fixture().await;
        let now = Utc::now();
        let err = fx
            .service
            .create_at(
                fx.user,
                &create(fx.client.id, SendOption::Later, Some(now - Duration::hours(2))),
                now,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FollowupServiceError::Validation(_)));
        assert_eq!(fx.store.followup_count().await, 0);
        assert!(fx.mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn draft_sends_nothing() {
        let fx = fixture().await;
        let view = fx
            .service
            .create(fx.user, &create(fx.client.id, SendOption::Draft, None))
            .await
            .unwrap();
        assert_eq!(view.display_status, DisplayStatus::Draft);
        assert!(fx.mailer.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn foreign_client_is_not_found() {
        let fx = fixture().await;
        let err = fx
            .service
            .create(
                Uuid::new_v4(),
                &create(fx.client.id, SendOption::Draft, None),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FollowupServiceError::ClientNotFound));
    }

    #[tokio::test]
    async fn blank_subject_is_rejected() {
        let fx = fixture().await;
        let mut data = create(fx.client.id, SendOption::Draft, None);
        data.subject = "   ".into();
        let err = fx.service.create(fx.user, &data).await.unwrap_err();
        assert!(matches!(err, FollowupServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn update_draft_to_now_sends_and_keeps_unchanged_fields() {
        let fx = fixture().await;
        let draft = fx
            .service
            .create(fx.user, &create(fx.client.id, SendOption::Draft, None))
            .await
            .unwrap();

        let now = Utc::now();
        let patch = UpdateFollowup {
            client_id: None,
            subject: Some("Updated subject".into()),
            body: None,
            send_option: SendOption::Now,
            scheduled_at: None,
        };
        let view = fx
            .service
            .update_at(fx.user, draft.followup.id, &patch, now)
            .await
            .unwrap();

        assert_eq!(view.followup.status, FollowupStatus::Sent);
        assert_eq!(view.followup.sent_at, Some(now));
        assert_eq!(view.followup.subject, "Updated subject");
        assert_eq!(view.followup.body, draft.followup.body);
        assert_eq!(fx.mailer.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_send_on_update_leaves_stored_draft_untouched() {
        let fx = fixture().await;
        let draft = fx
            .service
            .create(fx.user, &create(fx.client.id, SendOption::Draft, None))
            .await
            .unwrap();

        let service = FollowupService::new(fx.store.clone(), Arc::new(FailingSender), None);
        let patch = UpdateFollowup {
            client_id: None,
            subject: Some("Resent subject".into()),
            body: Some("A different body".into()),
            send_option: SendOption::Now,
            scheduled_at: None,
        };
        let err = service
            .update_at(fx.user, draft.followup.id, &patch, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, FollowupServiceError::Delivery(_)));

        let stored = fx.service.get(fx.user, draft.followup.id).await.unwrap();
        assert_eq!(stored.followup.status, FollowupStatus::Draft);
        assert_eq!(stored.followup.subject, draft.followup.subject);
        assert_eq!(stored.followup.body, draft.followup.body);
        assert_eq!(stored.followup.sent_at, None);
    }

    #[tokio::test]
    async fn list_searches_and_recent_is_capped() {
        let fx = fixture().await;
        for i in 0..7 {
            let mut data = create(fx.client.id, SendOption::Draft, None);
            data.subject = format!("Proposal {i}");
            fx.service.create(fx.user, &data).await.unwrap();
        }

        let recent = fx.service.recent(fx.user, RECENT_LIMIT).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].followup.subject, "Proposal 6");

        assert_eq!(fx.service.list(fx.user, Some("JANE")).await.unwrap().len(), 7);
        let hits = fx.service.list(fx.user, Some("proposal 3")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(fx.service.list(fx.user, Some("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn opens_only_count_on_sent_followups() {
        let fx = fixture().await;
        let draft = fx
            .service
            .create(fx.user, &create(fx.client.id, SendOption::Draft, None))
            .await
            .unwrap();
        assert!(!fx.service.mark_opened(draft.followup.id).await.unwrap());

        let sent = fx
            .service
            .create(fx.user, &create(fx.client.id, SendOption::Now, None))
            .await
            .unwrap();
        assert!(fx.service.mark_opened(sent.followup.id).await.unwrap());
        assert!(!fx.service.mark_opened(sent.followup.id).await.unwrap());

        let view = fx.service.get(fx.user, sent.followup.id).await.unwrap();
        assert_eq!(view.display_status, DisplayStatus::Opened);
        assert!(view.followup.opened_at.is_some());
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let fx = fixture().await;
        let view = fx
            .service
            .create(fx.user, &create(fx.client.id, SendOption::Draft, None))
            .await
            .unwrap();
        fx.service.delete(fx.user, view.followup.id).await.unwrap();
        assert!(matches!(
            fx.service.get(fx.user, view.followup.id).await,
            Err(FollowupServiceError::NotFound)
        ));
        assert!(matches!(
            fx.service.delete(fx.user, view.followup.id).await,
            Err(FollowupServiceError::NotFound)
        ));
    }
}
