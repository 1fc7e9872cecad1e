use async_trait::async_trait;

use dolmetsch_core::ConversationId;

/// Outbound side of a chat channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `text` to a conversation. With `render_as_markup` the text is
    /// in the constrained HTML dialect and must be sent with the channel's
    /// "render as HTML" directive; otherwise it is sent literally.
    async fn send(
        &self,
        conversation: &ConversationId,
        text: &str,
        render_as_markup: bool,
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The channel's renderer refused the markup; plain text may still work.
    #[error("markup rejected: {0}")]
    Rejected(String),

    #[error("delivery failed: {0}")]
    Failed(String),
}
