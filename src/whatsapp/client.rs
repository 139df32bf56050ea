use crate::config::WhatsAppConfig;
use crate::whatsapp::types::OutboundMessage;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::log::{debug, error, info};

#[derive(Debug, Error)]
pub enum WhatsAppError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// A successful Graph API response, relayed to HTTP callers as-is.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Sends messages on behalf of a single business phone number.
/// Read-only after construction, clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: Client,
    messages_url: String,
}
impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig) -> Result<Self, WhatsAppError> {
        if config.access_token.is_empty() {
            return Err(WhatsAppError::Configuration(
                "access_token is required".to_string(),
            ));
        }
        if config.phone_number_id.is_empty() {
            return Err(WhatsAppError::Configuration(
                "phone_number_id is required".to_string(),
            ));
        }

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", config.access_token))
            .map_err(|_| {
                WhatsAppError::Configuration(
                    "access_token contains invalid header characters".to_string(),
                )
            })?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(2);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let messages_url = format!(
            "{}/{}/{}/messages",
            config.graph_url.trim_end_matches('/'),
            config.api_version,
            config.phone_number_id
        );
        debug!("WhatsApp messages endpoint: {messages_url}");

        Ok(Self {
            client: builder.build()?,
            messages_url,
        })
    }

    pub fn messages_url(&self) -> &str {
        &self.messages_url
    }

    /// Sends a free-form text message, optionally as a reply to `reply_to` message ID.
    pub async fn send_text(
        &self,
        recipient: &str,
        message: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage, WhatsAppError> {
        let payload = OutboundMessage::text(recipient, message, reply_to);
        match self.post(&payload).await {
            Ok(sent) => {
                info!("Message sent to {recipient}: {}", sent.body);
                Ok(sent)
            }
            Err(e) => {
                error!("API request failed: {e}");
                Err(e)
            }
        }
    }

    /// Sends a pre-approved template message. Templates cannot be replies.
    pub async fn send_template(
        &self,
        recipient: &str,
        template_name: &str,
        language_code: &str,
    ) -> Result<SentMessage, WhatsAppError> {
        let payload = OutboundMessage::template(recipient, template_name, language_code);
        self.post(&payload).await.inspect_err(|e| {
            error!("Template send failed: {e}");
        })
    }

    async fn post<T: Serialize>(&self, payload: &T) -> Result<SentMessage, WhatsAppError> {
        let response = self
            .client
            .post(&self.messages_url)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(SentMessage {
            status: status.as_u16(),
            body: response.json().await?,
        })
    }
}
