//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;

use crate::error::ChannelError;
use crate::registration::prompts::Button;
use crate::registration::session::ExternalIdentity;

/// Stream of inbound messages produced by [`Channel::start`].
pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A message received from a channel.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    /// Channel that produced the message (e.g. "telegram").
    pub channel: String,
    /// Stable numeric user id, as text.
    pub user_id: String,
    /// Display handle, if the user has one.
    pub user_name: Option<String>,
    /// Message text or the selected option identifier.
    pub content: String,
    /// Channel-specific routing data (chat id, callback id).
    pub metadata: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(channel: &str, user_id: &str, content: &str) -> Self {
        Self {
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            user_name: None,
            content: content.to_string(),
            metadata: serde_json::Value::Null,
            received_at: Utc::now(),
        }
    }

    pub fn with_user_name(mut self, name: &str) -> Self {
        self.user_name = Some(name.to_string());
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// The user's identity, parsed from `user_id`.
    pub fn identity(&self) -> Result<ExternalIdentity, ChannelError> {
        self.user_id.parse().map_err(|_| {
            ChannelError::InvalidMessage(format!(
                "{}: user id {:?} is not numeric",
                self.channel, self.user_id
            ))
        })
    }
}

/// A message to send back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub content: String,
    /// Inline options, rendered one per row.
    pub buttons: Vec<Button>,
}

impl OutgoingResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// A bidirectional messaging transport.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Begin receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Send a response in the conversation `msg` came from.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError>;

    async fn shutdown(&self) -> Result<(), ChannelError>;
}
