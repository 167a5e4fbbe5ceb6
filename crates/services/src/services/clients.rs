use std::sync::Arc;

use db::{
    Store,
    models::{
        ValidationError,
        client::{Client, CreateClient, UpdateClient},
    },
};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ClientServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("client not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Per-user client directory
#[derive(Clone)]
pub struct ClientService {
    store: Arc<dyn Store>,
}

impl ClientService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Newest first, optionally narrowed by a case-insensitive search term.
    pub async fn list(
        &self,
        user_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Client>, ClientServiceError> {
        let clients = self.store.list_clients(user_id).await?;
        Ok(match search {
            Some(term) => clients.into_iter().filter(|c| c.matches(term)).collect(),
            None => clients,
        })
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Client, ClientServiceError> {
        self.store
            .find_client(user_id, id)
            .await?
            .ok_or(ClientServiceError::NotFound)
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        data: &CreateClient,
    ) -> Result<Client, ClientServiceError> {
        data.validate()?;
        let client = self
            .store
            .create_client(user_id, Uuid::new_v4(), data)
            .await?;
        info!(user_id = %user_id, client_id = %client.id, "Client created");
        Ok(client)
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        data: &UpdateClient,
    ) -> Result<Client, ClientServiceError> {
        data.validate()?;
        self.store
            .update_client(user_id, id, data)
            .await?
            .ok_or(ClientServiceError::NotFound)
    }

    /// Deleting a client also removes its follow-ups.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), ClientServiceError> {
        let rows = self.store.delete_client(user_id, id).await?;
        if rows == 0 {
            return Err(ClientServiceError::NotFound);
        }
        info!(user_id = %user_id, client_id = %id, "Client deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::MemoryStore;

    use super::*;

    fn new_client(name: &str, email: &str, company: Option<&str>) -> CreateClient {
        CreateClient {
            full_name: name.into(),
            email: email.into(),
            company: company.map(Into::into),
            phone: None,
            notes: None,
        }
    }

    fn service() -> ClientService {
        ClientService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_then_list_newest_first() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.create(user, &new_client("Jane Doe", "jane@x.com", None))
            .await
            .unwrap();
        svc.create(user, &new_client("Bob Ray", "bob@y.com", Some("Acme")))
            .await
            .unwrap();

        let names: Vec<_> = svc
            .list(user, None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.full_name)
            .collect();
        assert_eq!(names, vec!["Bob Ray", "Jane Doe"]);
    }

    #[tokio::test]
    async fn search_matches_name_email_or_company() {
        let svc = service();
        let user = Uuid::new_v4();
        svc.create(user, &new_client("Alex Kim", "ak@x.com", None))
            .await
            .unwrap();
        svc.create(user, &new_client("Sam", "sam@alexco.io", None))
            .await
            .unwrap();
        svc.create(user, &new_client("Lee", "lee@z.com", Some("ALEXANDRIA Ltd")))
            .await
            .unwrap();
        svc.create(user, &new_client("Max", "max@z.com", None))
            .await
            .unwrap();

        let found = svc.list(user, Some("alex")).await.unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|c| c.full_name != "Max"));
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let svc = service();
        let err = svc
            .create(Uuid::new_v4(), &new_client("  ", "a@b.c", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn other_users_clients_are_invisible() {
        let svc = service();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let client = svc
            .create(owner, &new_client("Jane Doe", "jane@x.com", None))
            .await
            .unwrap();

        assert!(svc.list(other, None).await.unwrap().is_empty());
        assert!(matches!(
            svc.get(other, client.id).await,
            Err(ClientServiceError::NotFound)
        ));
        assert!(matches!(
            svc.delete(other, client.id).await,
            Err(ClientServiceError::NotFound)
        ));
        assert!(svc.get(owner, client.id).await.is_ok());
    }

    #[tokio::test]
    async fn update_patches_given_fields() {
        let svc = service();
        let user = Uuid::new_v4();
        let client = svc
            .create(user, &new_client("Jane Doe", "jane@x.com", None))
            .await
            .unwrap();

        let patch = UpdateClient {
            company: Some("Initech".into()),
            ..Default::default()
        };
        let updated = svc.update(user, client.id, &patch).await.unwrap();
        assert_eq!(updated.company.as_deref(), Some("Initech"));
        assert_eq!(updated.full_name, "Jane Doe");

        let blank = UpdateClient {
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(
            svc.update(user, client.id, &blank).await,
            Err(ClientServiceError::Validation(_))
        ));
    }
}
