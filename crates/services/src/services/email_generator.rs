//! Drafting follow-up email bodies from meeting notes.

use async_trait::async_trait;
use db::models::ValidationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use ts_rs::TS;

use super::claude_api::{ClaudeApiClient, ClaudeApiError};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("claude api error: {0}")]
    ClaudeApi(#[from] ClaudeApiError),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerateEmailRequest {
    pub client_name: String,
    pub meeting_context: String,
    pub tone: Option<String>,
    pub additional_notes: Option<String>,
}

impl GenerateEmailRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client_name.trim().is_empty() || self.meeting_context.trim().is_empty() {
            return Err(ValidationError::new(
                "clientName and meetingContext are required",
            ));
        }
        Ok(())
    }

    fn tone(&self) -> Option<&str> {
        non_blank(self.tone.as_deref())
    }

    fn notes(&self) -> Option<&str> {
        non_blank(self.additional_notes.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedEmail {
    pub success: bool,
    pub email_body: String,
}

/// Who the email is signed by
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub name: String,
    pub email: String,
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self {
            name: "Your Name".to_string(),
            email: "you@example.com".to_string(),
        }
    }
}

#[async_trait]
pub trait EmailGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateEmailRequest,
        sender: &SenderIdentity,
    ) -> Result<String, GenerationError>;
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Deterministic template used when no AI key is configured.
#[derive(Debug, Default, Clone)]
pub struct TemplateEmailGenerator;

#[async_trait]
impl EmailGenerator for TemplateEmailGenerator {
    async fn generate(
        &self,
        request: &GenerateEmailRequest,
        sender: &SenderIdentity,
    ) -> Result<String, GenerationError> {
        request.validate()?;
        Ok(render_template(request, sender))
    }
}

fn render_template(request: &GenerateEmailRequest, sender: &SenderIdentity) -> String {
    let mut paragraphs = vec![
        format!("Dear {},", request.client_name.trim()),
        "Thank you for taking the time to meet with me yesterday to discuss your project needs. \
         I appreciated the opportunity to learn more about your goals and challenges."
            .to_string(),
        format!(
            "Based on our conversation about {}, I wanted to follow up with some additional \
             thoughts and resources that might be helpful as you consider next steps.",
            request.meeting_context.trim()
        ),
    ];
    if let Some(notes) = request.notes() {
        paragraphs.push(notes.to_string());
    }
    paragraphs.push(
        "Would you be available for a brief call next week to discuss this further? \
         I'm available Tuesday or Thursday afternoon if either works for you."
            .to_string(),
    );
    paragraphs.push("Looking forward to hearing from you.".to_string());
    paragraphs.push(format!("Best regards,\n{}\n{}", sender.name, sender.email));
    paragraphs.join("\n\n")
}

pub struct ClaudeEmailGenerator {
    claude: ClaudeApiClient,
}

impl ClaudeEmailGenerator {
    const MAX_TOKENS: u32 = 1024;

    pub fn new(claude: ClaudeApiClient) -> Self {
        Self { claude }
    }

    fn prompt(request: &GenerateEmailRequest, sender: &SenderIdentity) -> String {
        let mut prompt = format!(
            r#"Write a follow-up email to {client} after a meeting.

## Meeting context
{context}

## Tone
{tone}
"#,
            client = request.client_name.trim(),
            context = request.meeting_context.trim(),
            tone = request.tone().unwrap_or("professional and friendly"),
        );
        if let Some(notes) = request.notes() {
            prompt.push_str(&format!("\n## Additional notes\n{notes}\n"));
        }
        prompt.push_str(&format!(
            r#"
## Instructions
- Return ONLY the email body as plain text, without a subject line.
- Keep it under 200 words and end with a clear next step.
- Sign off as:
{}
{}
"#,
            sender.name, sender.email
        ));
        prompt
    }
}

#[async_trait]
impl EmailGenerator for ClaudeEmailGenerator {
    async fn generate(
        &self,
        request: &GenerateEmailRequest,
        sender: &SenderIdentity,
    ) -> Result<String, GenerationError> {
        request.validate()?;

        let system = Some(
            "You write concise, warm business follow-up emails. Output plain text only."
                .to_string(),
        );
        debug!(client_name = %request.client_name, "Generating follow-up email");
        self.claude
            .ask(&Self::prompt(request, sender), system, Self::MAX_TOKENS)
            .await
            .map_err(|e| {
                error!(error = %e, "Follow-up email generation failed");
                e.into()
            })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use secrecy::SecretString;

    use super::*;

    fn request() -> GenerateEmailRequest {
        GenerateEmailRequest {
            client_name: "Jane Doe".into(),
            meeting_context: "the Q3 rollout".into(),
            tone: None,
            additional_notes: None,
        }
    }

    fn sender() -> SenderIdentity {
        SenderIdentity {
            name: "Pat Smith".into(),
            email: "pat@smith.io".into(),
        }
    }

    #[tokio::test]
    async fn template_substitutes_names_and_context() {
        let body = TemplateEmailGenerator
            .generate(&request(), &sender())
            .await
            .unwrap();
        assert!(body.starts_with("Dear Jane Doe,"));
        assert!(body.contains("our conversation about the Q3 rollout"));
        assert!(body.ends_with("Best regards,\nPat Smith\npat@smith.io"));
    }

    #[tokio::test]
    async fn template_includes_notes_when_given() {
        let mut req = request();
        req.additional_notes = Some("I've attached the pricing sheet.".into());
        let body = TemplateEmailGenerator.generate(&req, &sender()).await.unwrap();
        assert!(body.contains("\n\nI've attached the pricing sheet.\n\n"));
    }

    #[tokio::test]
    async fn missing_context_is_a_validation_error() {
        let mut req = request();
        req.meeting_context = "  ".into();
        let err = TemplateEmailGenerator
            .generate(&req, &sender())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Validation(_)));
    }

    #[test]
    fn prompt_carries_tone_and_signature() {
        let mut req = request();
        req.tone = Some("casual".into());
        let prompt = ClaudeEmailGenerator::prompt(&req, &sender());
        assert!(prompt.contains("## Tone\ncasual"));
        assert!(prompt.contains("Pat Smith\npat@smith.io"));
        assert!(!prompt.contains("Additional notes"));
    }

    #[tokio::test]
    async fn claude_generator_returns_text() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages").body_includes("Jane Doe");
                then.status(200).header("content-type", "application/json").body(
                    r#"{"id":"m","model":"m","stop_reason":"end_turn",
                        "content":[{"type":"text","text":"Hi Jane"}]}"#,
                );
            })
            .await;

        let claude = ClaudeApiClient::new(SecretString::from("k".to_string()), None)
            .unwrap()
            .with_base_url(server.base_url());
        let body = ClaudeEmailGenerator::new(claude)
            .generate(&request(), &sender())
            .await
            .unwrap();
        assert_eq!(body, "Hi Jane");
    }
}
