use crate::agent::ReplyGenerator;
use crate::whatsapp::types::{InboundMessage, WebhookChange, WebhookEntry, WebhookPayload};
use crate::whatsapp::{WhatsAppClient, WhatsAppError};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::log::{debug, info};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Malformed webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Failed to reply to {recipient}: {source}")]
    Send {
        recipient: String,
        #[source]
        source: WhatsAppError,
    },
}

/// Connects inbound webhook messages to the reply generator and outbound client.
#[derive(Clone)]
pub struct MessageRelay {
    client: WhatsAppClient,
    agent: Arc<dyn ReplyGenerator>,
}
impl MessageRelay {
    pub fn new(client: WhatsAppClient, agent: Arc<dyn ReplyGenerator>) -> Self {
        Self { client, agent }
    }

    pub fn client(&self) -> &WhatsAppClient {
        &self.client
    }

    /// Replies to every text message in the payload, in payload order.
    /// Each level is decoded as it is reached, so a malformed message or a failed
    /// send aborts the rest of the batch while earlier replies stay sent.
    /// Returns the number of replies sent.
    pub async fn handle_payload(&self, payload: serde_json::Value) -> Result<usize, RelayError> {
        let payload = WebhookPayload::deserialize(&payload)?;

        let mut sent = 0;
        for entry in &payload.entry {
            for change in &WebhookEntry::deserialize(entry)?.changes {
                for message in &WebhookChange::deserialize(change)?.value.messages {
                    let InboundMessage::Text { from, id, text } = InboundMessage::deserialize(message)?
                    else {
                        continue;
                    };
                    info!("Received message from {from}: {}", text.body);

                    let reply = self.agent.reply(&text.body);
                    self.client
                        .send_text(&from, &reply, Some(&id))
                        .await
                        .map_err(|source| RelayError::Send {
                            recipient: from.clone(),
                            source,
                        })?;

                    sent += 1;
                }
            }
        }

        debug!("Webhook payload handled, sent {sent} replies");
        Ok(sent)
    }
}
