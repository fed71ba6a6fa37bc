//! Telegram channel that long-polls the Bot API for updates.
//!
//! Text messages and inline-keyboard callbacks both become
//! [`IncomingMessage`]s; responses carry their options as an inline keyboard.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;
use crate::registration::prompts::Button;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel over Bot API long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{TELEGRAM_API_BASE}/bot{}/{method}",
            self.bot_token.expose_secret()
        )
    }

    /// Send a text message, HTML first with plain text fallback.
    /// Splits long messages; the keyboard rides on the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        buttons: &[Button],
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let markup = inline_keyboard(buttons);

        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let markup = if i == last { markup.as_ref() } else { None };
            self.send_message_chunk(chat_id, chunk, markup).await?;
        }
        Ok(())
    }

    /// Send a single message chunk, HTML-first with fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        markup: Option<&Value>,
    ) -> Result<(), ChannelError> {
        let mut html_body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML"
        });
        if let Some(markup) = markup {
            html_body["reply_markup"] = markup.clone();
        }

        let html_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&html_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if html_resp.status().is_success() {
            return Ok(());
        }

        let html_status = html_resp.status();
        let _html_err = html_resp.text().await.unwrap_or_default();
        tracing::warn!(
            status = ?html_status,
            "Telegram sendMessage with HTML failed; retrying without parse_mode"
        );

        let mut plain_body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = markup {
            plain_body["reply_markup"] = markup.clone();
        }
        let plain_resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&plain_body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!(
                    "sendMessage failed (html: {}, plain: {})",
                    html_status, plain_err
                ),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let updates_url = self.api_url("getUpdates");
        let answer_url = self.api_url("answerCallbackQuery");
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&updates_url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {}", e.without_url());
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {}", e.without_url());
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(incoming) = parse_update(update) else {
                        continue;
                    };

                    // Stop the button spinner right away, whatever the outcome.
                    if let Some(callback_id) =
                        incoming.metadata.get("callback_query_id").and_then(Value::as_str)
                    {
                        let _ = client
                            .post(&answer_url)
                            .json(&json!({ "callback_query_id": callback_id }))
                            .send()
                            .await;
                    }

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        self.send_message(chat_id, &response.content, &response.buttons)
            .await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.without_url().to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Turn one `getUpdates` entry into an incoming message.
///
/// Handles text messages and callback queries; everything else (stickers,
/// edits, channel posts) yields `None`.
fn parse_update(update: &Value) -> Option<IncomingMessage> {
    if let Some(message) = update.get("message") {
        let text = message.get("text").and_then(Value::as_str)?;
        let from = message.get("from")?;
        let chat_id = message.get("chat").and_then(|c| c.get("id"))?.as_i64()?;
        return Some(build_incoming(from, chat_id, text, None));
    }

    if let Some(callback) = update.get("callback_query") {
        let data = callback.get("data").and_then(Value::as_str)?;
        let from = callback.get("from")?;
        let callback_id = callback.get("id").and_then(Value::as_str)?;
        let chat_id = callback
            .get("message")
            .and_then(|m| m.get("chat"))
            .and_then(|c| c.get("id"))
            .and_then(Value::as_i64)?;
        return Some(build_incoming(from, chat_id, data, Some(callback_id)));
    }

    None
}

fn build_incoming(
    from: &Value,
    chat_id: i64,
    content: &str,
    callback_id: Option<&str>,
) -> IncomingMessage {
    let user_id = from
        .get("id")
        .and_then(Value::as_i64)
        .map(|id| id.to_string())
        .unwrap_or_default();

    let mut metadata = json!({ "chat_id": chat_id.to_string() });
    if let Some(callback_id) = callback_id {
        metadata["callback_query_id"] = json!(callback_id);
    }

    let mut incoming =
        IncomingMessage::new("telegram", &user_id, content).with_metadata(metadata);
    if let Some(username) = from.get("username").and_then(Value::as_str) {
        incoming = incoming.with_user_name(username);
    }
    incoming
}

/// `reply_markup` with one button per row, or `None` without buttons.
fn inline_keyboard(buttons: &[Button]) -> Option<Value> {
    if buttons.is_empty() {
        return None;
    }
    let rows: Vec<Value> = buttons
        .iter()
        .map(|b| json!([{ "text": b.label, "callback_data": b.data }]))
        .collect();
    Some(json!({ "inline_keyboard": rows }))
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char
/// boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
