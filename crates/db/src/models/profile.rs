use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use ts_rs::TS;
use uuid::Uuid;

use super::{ValidationError, require};

/// The signed-in user's own details; `id` is the auth user id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpsertProfile {
    pub email: String,
    pub full_name: Option<String>,
}

impl UpsertProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.email, "email")
    }
}

impl Profile {
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            "SELECT id, email, full_name, created_at, updated_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn upsert(
        pool: &PgPool,
        id: Uuid,
        data: &UpsertProfile,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Profile>(
            r#"INSERT INTO profiles (id, email, full_name)
               VALUES ($1, $2, $3)
               ON CONFLICT (id) DO UPDATE SET
                   email = excluded.email,
                   full_name = excluded.full_name,
                   updated_at = NOW()
               RETURNING id, email, full_name, created_at, updated_at"#,
        )
        .bind(id)
        .bind(data.email.trim())
        .bind(&data.full_name)
        .fetch_one(pool)
        .await
    }
}
