/// Produces the reply text for an inbound message.
pub trait ReplyGenerator: Send + Sync {
    fn reply(&self, message: &str) -> String;
}

/// Stand-in until a real agent backend is wired in, acknowledges the message verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderAgent;
impl ReplyGenerator for PlaceholderAgent {
    fn reply(&self, message: &str) -> String {
        format!("Received your message: '{message}'. This is an automated reply.")
    }
}
