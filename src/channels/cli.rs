//! CLI channel: stdin/stdout REPL for local testing.
//!
//! Every line is sent as one fixed user. Options are printed with their
//! identifiers so they can be typed back.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;
use crate::registration::session::ExternalIdentity;

/// A simple CLI channel that reads from stdin and writes to stdout.
pub struct CliChannel {
    user_id: ExternalIdentity,
}

impl CliChannel {
    pub fn new(user_id: ExternalIdentity) -> Self {
        Self { user_id }
    }
}

/// Render a response as plain text, one `[id] label` line per option.
fn render(response: &OutgoingResponse) -> String {
    let mut out = response.content.clone();
    if !response.buttons.is_empty() {
        out.push('\n');
        for button in &response.buttons {
            out.push_str(&format!("\n  [{}] {}", button.data, button.label));
        }
    }
    out
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let user_id = self.user_id.to_string();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let msg = IncomingMessage::new("cli", &user_id, &line);
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        println!("\n{}\n", render(&response));
        eprint!("> ");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
