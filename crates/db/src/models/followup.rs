use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use super::{ValidationError, contains_ci};

/// Stored lifecycle state. "Opened" is not a state; see [`DisplayStatus`].
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "followup_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FollowupStatus {
    #[default]
    Draft,
    Scheduled,
    Sent,
}

/// Delivery choice made on the follow-up form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SendOption {
    Now,
    Later,
    Draft,
}

/// Label shown to the user, projected from `(status, is_opened)` at read time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, Display)]
pub enum DisplayStatus {
    Draft,
    Scheduled,
    Sent,
    Opened,
}

impl DisplayStatus {
    pub fn derive(status: FollowupStatus, is_opened: bool) -> Self {
        match (status, is_opened) {
            (FollowupStatus::Draft, _) => DisplayStatus::Draft,
            (FollowupStatus::Scheduled, _) => DisplayStatus::Scheduled,
            (FollowupStatus::Sent, false) => DisplayStatus::Sent,
            (FollowupStatus::Sent, true) => DisplayStatus::Opened,
        }
    }
}

/// Status and timestamps that are always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub status: FollowupStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl DeliveryPlan {
    /// Resolve a delivery choice against `now`. A scheduled time must be
    /// strictly in the future.
    pub fn resolve(
        option: SendOption,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        match option {
            SendOption::Now => Ok(Self {
                status: FollowupStatus::Sent,
                scheduled_at: None,
                sent_at: Some(now),
            }),
            SendOption::Later => {
                let at = scheduled_at.ok_or_else(|| {
                    ValidationError::new("scheduled_at is required when scheduling for later")
                })?;
                if at <= now {
                    return Err(ValidationError::new("scheduled_at must be in the future"));
                }
                Ok(Self {
                    status: FollowupStatus::Scheduled,
                    scheduled_at: Some(at),
                    sent_at: None,
                })
            }
            SendOption::Draft => Ok(Self {
                status: FollowupStatus::Draft,
                scheduled_at: None,
                sent_at: None,
            }),
        }
    }

    pub fn sends_now(&self) -> bool {
        self.status == FollowupStatus::Sent
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Followup {
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: Uuid, // Foreign key to Client
    pub subject: String,
    pub body: String,
    pub status: FollowupStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub is_opened: bool,
    pub opened_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Followup {
    pub fn display_status(&self) -> DisplayStatus {
        DisplayStatus::derive(self.status, self.is_opened)
    }
}

/// Follow-up row joined with the client it is addressed to
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct FollowupWithClient {
    #[sqlx(flatten)]
    #[serde(flatten)]
    #[ts(flatten)]
    pub followup: Followup,
    pub client_name: String,
    pub client_email: String,
}

impl std::ops::Deref for FollowupWithClient {
    type Target = Followup;
    fn deref(&self) -> &Self::Target {
        &self.followup
    }
}

impl FollowupWithClient {
    /// True when `term` is blank or occurs in client name, client email or
    /// subject, ignoring case.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        contains_ci(&self.client_name, &term)
            || contains_ci(&self.client_email, &term)
            || contains_ci(&self.followup.subject, &term)
    }
}

/// What the API hands back: the joined row plus its display label
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct FollowupView {
    #[serde(flatten)]
    #[ts(flatten)]
    pub followup: Followup,
    pub client_name: String,
    pub client_email: String,
    pub display_status: DisplayStatus,
}

impl From<FollowupWithClient> for FollowupView {
    fn from(row: FollowupWithClient) -> Self {
        let display_status = row.followup.display_status();
        Self {
            followup: row.followup,
            client_name: row.client_name,
            client_email: row.client_email,
            display_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateFollowup {
    pub client_id: Uuid,
    pub subject: String,
    pub body: String,
    pub send_option: SendOption,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Edit-form resubmission. Content fields fall back to the stored values;
/// the delivery choice is always explicit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateFollowup {
    pub client_id: Option<Uuid>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub send_option: SendOption,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Fully resolved row content, built by the service after validation.
#[derive(Debug, Clone)]
pub struct FollowupDraft {
    pub client_id: Uuid,
    pub subject: String,
    pub body: String,
    pub plan: DeliveryPlan,
}

/// Minimal projection used by the analytics queries
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct SentFollowupStat {
    pub sent_at: DateTime<Utc>,
    pub is_opened: bool,
}

const FOLLOWUP_COLUMNS: &str = "id, user_id, client_id, subject, body, status, scheduled_at, \
     sent_at, is_opened, opened_at, created_at, updated_at";

const JOINED_SELECT: &str = r#"SELECT
    f.id, f.user_id, f.client_id, f.subject, f.body, f.status, f.scheduled_at,
    f.sent_at, f.is_opened, f.opened_at, f.created_at, f.updated_at,
    c.full_name AS client_name,
    c.email     AS client_email
FROM followups f
JOIN clients c ON c.id = f.client_id"#;

impl Followup {
    pub async fn find_by_user_id(
        pool: &PgPool,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<FollowupWithClient>, sqlx::Error> {
        sqlx::query_as::<_, FollowupWithClient>(&format!(
            "{JOINED_SELECT} WHERE f.user_id = $1 ORDER BY f.created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FollowupWithClient>, sqlx::Error> {
        sqlx::query_as::<_, FollowupWithClient>(&format!(
            "{JOINED_SELECT} WHERE f.id = $1 AND f.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
        created_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Followup>(&format!(
            r#"INSERT INTO followups
                   (id, user_id, client_id, subject, body, status, scheduled_at, sent_at,
                    is_opened, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, $9, $9)
               RETURNING {FOLLOWUP_COLUMNS}"#
        ))
        .bind(id)
        .bind(user_id)
        .bind(draft.client_id)
        .bind(&draft.subject)
        .bind(&draft.body)
        .bind(draft.plan.status)
        .bind(draft.plan.scheduled_at)
        .bind(draft.plan.sent_at)
        .bind(created_at)
        .fetch_one(pool)
        .await
    }

    /// Rewrite content and delivery state. Any previous open is cleared since
    /// the row now describes a different delivery.
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        draft: &FollowupDraft,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Followup>(&format!(
            r#"UPDATE followups
               SET client_id    = $3,
                   subject      = $4,
                   body         = $5,
                   status       = $6,
                   scheduled_at = $7,
                   sent_at      = $8,
                   is_opened    = FALSE,
                   opened_at    = NULL,
                   updated_at   = NOW()
               WHERE id = $1 AND user_id = $2
               RETURNING {FOLLOWUP_COLUMNS}"#
        ))
        .bind(id)
        .bind(user_id)
        .bind(draft.client_id)
        .bind(&draft.subject)
        .bind(&draft.body)
        .bind(draft.plan.status)
        .bind(draft.plan.scheduled_at)
        .bind(draft.plan.sent_at)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM followups WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Flag the first open of a sent follow-up. Returns false when the row is
    /// missing, not sent, or already opened.
    pub async fn mark_opened(
        pool: &PgPool,
        id: Uuid,
        opened_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE followups
               SET is_opened = TRUE,
                   opened_at = $2
               WHERE id = $1 AND status = $3 AND is_opened = FALSE"#,
        )
        .bind(id)
        .bind(opened_at)
        .bind(FollowupStatus::Sent)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Sent follow-ups with `sent_at` in `[start, end)`, oldest first.
    pub async fn find_sent_between(
        pool: &PgPool,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<SentFollowupStat>, sqlx::Error> {
        sqlx::query_as::<_, SentFollowupStat>(
            r#"SELECT sent_at, is_opened
               FROM followups
               WHERE user_id = $1
                 AND status = $2
                 AND sent_at IS NOT NULL
                 AND sent_at >= $3
                 AND ($4::timestamptz IS NULL OR sent_at < $4)
               ORDER BY sent_at ASC"#,
        )
        .bind(user_id)
        .bind(FollowupStatus::Sent)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn now_sets_sent_at_only() {
        let now = Utc::now();
        let plan = DeliveryPlan::resolve(SendOption::Now, Some(now + Duration::days(1)), now)
            .unwrap();
        assert_eq!(plan.status, FollowupStatus::Sent);
        assert_eq!(plan.sent_at, Some(now));
        assert_eq!(plan.scheduled_at, None);
        assert!(plan.sends_now());
    }

    #[test]
    fn later_requires_strictly_future_time() {
        let now = Utc::now();
        let future = now + Duration::minutes(30);

        let plan = DeliveryPlan::resolve(SendOption::Later, Some(future), now).unwrap();
        assert_eq!(plan.status, FollowupStatus::Scheduled);
        assert_eq!(plan.scheduled_at, Some(future));
        assert_eq!(plan.sent_at, None);
        assert!(!plan.sends_now());

        assert!(DeliveryPlan::resolve(SendOption::Later, Some(now), now).is_err());
        assert!(
            DeliveryPlan::resolve(SendOption::Later, Some(now - Duration::hours(1)), now).is_err()
        );
        assert!(DeliveryPlan::resolve(SendOption::Later, None, now).is_err());
    }

    #[test]
    fn draft_has_no_timestamps() {
        let now = Utc::now();
        let plan =
            DeliveryPlan::resolve(SendOption::Draft, Some(now + Duration::days(2)), now).unwrap();
        assert_eq!(
            plan,
            DeliveryPlan {
                status: FollowupStatus::Draft,
                scheduled_at: None,
                sent_at: None,
            }
        );
    }

    #[test]
    fn opened_is_a_projection_over_sent() {
        assert_eq!(
            DisplayStatus::derive(FollowupStatus::Sent, true),
            DisplayStatus::Opened
        );
        assert_eq!(
            DisplayStatus::derive(FollowupStatus::Sent, false),
            DisplayStatus::Sent
        );
        assert_eq!(
            DisplayStatus::derive(FollowupStatus::Draft, true),
            DisplayStatus::Draft
        );
        assert_eq!(DisplayStatus::Opened.to_string(), "Opened");
    }

    #[test]
    fn status_string_forms() {
        assert_eq!(FollowupStatus::Scheduled.to_string(), "scheduled");
        assert_eq!("sent".parse::<FollowupStatus>().unwrap(), FollowupStatus::Sent);
        assert_eq!(
            serde_json::to_string(&SendOption::Later).unwrap(),
            "\"later\""
        );
    }
}
