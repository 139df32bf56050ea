use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MESSAGING_PRODUCT: &str = "whatsapp";
pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "en_US";

/// Inbound webhook callback, `{entry: [{changes: [{value: {messages: [...]}}]}]}`.
/// Nested items stay undecoded until the relay reaches them, so a malformed
/// message only fails once every message before it has been handled.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub entry: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub changes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub value: WebhookValue,
}

#[derive(Debug, Deserialize)]
pub struct WebhookValue {
    /// Absent for status-only callbacks.
    #[serde(default)]
    pub messages: Vec<Value>,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Text {
        from: String,
        id: String,
        text: InboundTextBody,
    },

    /// Images, reactions, locations etc. Only the `type` field is required.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, PartialEq, Eq, Deserialize)]
pub struct InboundTextBody {
    pub body: String,
}

/// Request body for the Graph API `/messages` endpoint.
#[derive(Debug, Serialize)]
pub struct OutboundMessage<'a> {
    messaging_product: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    recipient_type: Option<&'static str>,

    to: &'a str,

    #[serde(flatten)]
    content: OutboundContent<'a>,

    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<ReplyContext<'a>>,
}
impl<'a> OutboundMessage<'a> {
    /// An empty `reply_to` is treated the same as none.
    pub fn text(to: &'a str, body: &'a str, reply_to: Option<&'a str>) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            recipient_type: Some("individual"),
            to,
            content: OutboundContent::Text {
                text: OutboundText { body },
            },
            context: reply_to
                .filter(|message_id| !message_id.is_empty())
                .map(|message_id| ReplyContext { message_id }),
        }
    }

    pub fn template(to: &'a str, name: &'a str, language_code: &'a str) -> Self {
        Self {
            messaging_product: MESSAGING_PRODUCT,
            recipient_type: None,
            to,
            content: OutboundContent::Template {
                template: OutboundTemplate {
                    name,
                    language: TemplateLanguage {
                        code: language_code,
                    },
                },
            },
            context: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundContent<'a> {
    Text { text: OutboundText<'a> },
    Template { template: OutboundTemplate<'a> },
}

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    body: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundTemplate<'a> {
    name: &'a str,
    language: TemplateLanguage<'a>,
}

#[derive(Debug, Serialize)]
struct TemplateLanguage<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct ReplyContext<'a> {
    message_id: &'a str,
}
