use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use ts_rs::TS;
use uuid::Uuid;

use super::{ValidationError, contains_ci, require};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS, PartialEq)]
pub struct Client {
    pub id: Uuid,
    pub user_id: Uuid, // Owning user
    pub full_name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateClient {
    pub full_name: String,
    pub email: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl CreateClient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.full_name, "full_name")?;
        require(&self.email, "email")
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateClient {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
}

impl UpdateClient {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(full_name) = &self.full_name {
            require(full_name, "full_name")?;
        }
        if let Some(email) = &self.email {
            require(email, "email")?;
        }
        Ok(())
    }

    /// Apply the patch to an in-memory copy, mirroring the SQL `COALESCE`s.
    pub fn apply(&self, client: &mut Client) {
        if let Some(full_name) = &self.full_name {
            client.full_name = full_name.clone();
        }
        if let Some(email) = &self.email {
            client.email = email.clone();
        }
        if self.company.is_some() {
            client.company = self.company.clone();
        }
        if self.phone.is_some() {
            client.phone = self.phone.clone();
        }
        if self.notes.is_some() {
            client.notes = self.notes.clone();
        }
    }
}

const CLIENT_COLUMNS: &str =
    "id, user_id, full_name, email, company, phone, notes, created_at, updated_at";

impl Client {
    /// True when `term` is blank or occurs in name, email or company, ignoring case.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        contains_ci(&self.full_name, &term)
            || contains_ci(&self.email, &term)
            || self
                .company
                .as_deref()
                .is_some_and(|company| contains_ci(company, &term))
    }

    pub async fn find_by_user_id(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND user_id = $2"
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
        data: &CreateClient,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Client>(&format!(
            r#"INSERT INTO clients (id, user_id, full_name, email, company, phone, notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {CLIENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(user_id)
        .bind(data.full_name.trim())
        .bind(data.email.trim())
        .bind(&data.company)
        .bind(&data.phone)
        .bind(&data.notes)
        .fetch_one(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        id: Uuid,
        data: &UpdateClient,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Client>(&format!(
            r#"UPDATE clients
               SET full_name  = COALESCE($3, full_name),
                   email      = COALESCE($4, email),
                   company    = COALESCE($5, company),
                   phone      = COALESCE($6, phone),
                   notes      = COALESCE($7, notes),
                   updated_at = NOW()
               WHERE id = $1 AND user_id = $2
               RETURNING {CLIENT_COLUMNS}"#
        ))
        .bind(id)
        .bind(user_id)
        .bind(data.full_name.as_deref().map(str::trim))
        .bind(data.email.as_deref().map(str::trim))
        .bind(&data.company)
        .bind(&data.phone)
        .bind(&data.notes)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Clients created in `[start, end)`; an open `end` counts up to now.
    pub async fn count_created_between(
        pool: &PgPool,
        user_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM clients
               WHERE user_id = $1
                 AND ($2::timestamptz IS NULL OR created_at >= $2)
                 AND ($3::timestamptz IS NULL OR created_at < $3)"#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(full_name: &str, email: &str, company: Option<&str>) -> Client {
        Client {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            email: email.to_string(),
            company: company.map(str::to_string),
            phone: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let clients = [
            client("Alex Johnson", "alex@acme.com", None),
            client("Sam Lee", "sam@lee.io", None),
        ];

        for term in ["alex", "ALEX", "aLeX"] {
            let hits: Vec<_> = clients.iter().filter(|c| c.matches(term)).collect();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].full_name, "Alex Johnson");
        }
    }

    #[test]
    fn search_covers_email_and_company() {
        let c = client("Jane Doe", "jane@x.com", Some("Globex"));
        assert!(c.matches("X.CO"));
        assert!(c.matches("glob"));
        assert!(c.matches("   "));
        assert!(!c.matches("initech"));
    }

    #[test]
    fn create_requires_name_and_email() {
        let mut data = CreateClient {
            full_name: "Jane Doe".into(),
            email: " ".into(),
            company: None,
            phone: None,
            notes: None,
        };
        assert_eq!(
            data.validate(),
            Err(ValidationError::new("email is required"))
        );

        data.email = "jane@x.com".into();
        data.full_name = String::new();
        assert_eq!(
            data.validate(),
            Err(ValidationError::new("full_name is required"))
        );
    }

    #[test]
    fn update_rejects_blanking_required_fields() {
        let patch = UpdateClient {
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(UpdateClient::default().validate().is_ok());
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut c = client("Jane Doe", "jane@x.com", Some("Globex"));
        UpdateClient {
            phone: Some("555".into()),
            ..Default::default()
        }
        .apply(&mut c);
        assert_eq!(c.phone.as_deref(), Some("555"));
        assert_eq!(c.company.as_deref(), Some("Globex"));
        assert_eq!(c.full_name, "Jane Doe");
    }
}
