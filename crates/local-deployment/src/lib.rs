use std::sync::Arc;

use db::{DBService, MemoryStore, Store};
use deployment::{Deployment, DeploymentError};
use secrecy::ExposeSecret;
use services::services::{
    claude_api::ClaudeApiClient,
    delivery::{DisabledSender, EmailSender, ResendClient},
    email_generator::{ClaudeEmailGenerator, EmailGenerator, TemplateEmailGenerator},
};
use tracing::{info, warn};
use utils::jwt::TokenVerifier;

pub mod config;

use config::Config;

#[derive(Clone)]
pub struct LocalDeployment {
    store: Arc<dyn Store>,
    mailer: Arc<dyn EmailSender>,
    generator: Arc<dyn EmailGenerator>,
    auth: TokenVerifier,
    tracking_base_url: Option<String>,
}

impl Deployment for LocalDeployment {
    fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn mailer(&self) -> &Arc<dyn EmailSender> {
        &self.mailer
    }

    fn generator(&self) -> &Arc<dyn EmailGenerator> {
        &self.generator
    }

    fn auth(&self) -> &TokenVerifier {
        &self.auth
    }

    fn tracking_base_url(&self) -> Option<&str> {
        self.tracking_base_url.as_deref()
    }
}

impl LocalDeployment {
    /// Wire up the store, mailer and generator described by `config`.
    pub async fn from_config(config: &Config) -> Result<Self, DeploymentError> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => Arc::new(DBService::new(url).await?),
            None => {
                warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let mailer: Arc<dyn EmailSender> = match &config.resend_api_key {
            Some(key) => {
                let mut client = ResendClient::new(key.clone(), config.email_from.clone())?;
                if let Some(url) = &config.resend_api_url {
                    client = client.with_base_url(url.clone());
                }
                Arc::new(client)
            }
            None => {
                warn!("RESEND_API_KEY not set, sending email is disabled");
                Arc::new(DisabledSender)
            }
        };

        let generator: Arc<dyn EmailGenerator> = match &config.anthropic_api_key {
            Some(key) => {
                let claude = ClaudeApiClient::new(key.clone(), config.anthropic_model.clone())?;
                Arc::new(ClaudeEmailGenerator::new(claude))
            }
            None => {
                info!("ANTHROPIC_API_KEY not set, generating emails from the built-in template");
                Arc::new(TemplateEmailGenerator)
            }
        };

        Ok(Self {
            store,
            mailer,
            generator,
            auth: TokenVerifier::new(config.jwt_secret.expose_secret().as_bytes()),
            tracking_base_url: config.tracking_base_url.clone(),
        })
    }

    /// Assemble a deployment from ready-made parts.
    pub fn from_parts(
        store: Arc<dyn Store>,
        mailer: Arc<dyn EmailSender>,
        generator: Arc<dyn EmailGenerator>,
        auth: TokenVerifier,
        tracking_base_url: Option<String>,
    ) -> Self {
        Self {
            store,
            mailer,
            generator,
            auth,
            tracking_base_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[tokio::test]
    async fn minimal_config_uses_local_fallbacks() {
        let config = Config::from_map(&HashMap::from([
            ("AUTH_JWT_SECRET", "s3cret"),
            ("TRACKING_BASE_URL", "http://localhost:3001"),
        ]))
        .unwrap();
        let deployment = LocalDeployment::from_config(&config).await.unwrap();

        assert!(deployment.store().ping().await.is_ok());
        assert_eq!(deployment.tracking_base_url(), Some("http://localhost:3001"));
        assert!(deployment.clients().list(uuid::Uuid::new_v4(), None).await.unwrap().is_empty());
    }
}
