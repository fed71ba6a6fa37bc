//! Main message loop: channel stream in, service replies out.
//!
//! Each identity gets a worker task fed by its own queue, so one user's
//! turns are handled in arrival order while other users proceed in
//! parallel. A worker exits once its queue drains.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::error::ChannelError;
use crate::registration::service::{Event, RegistrationService, Reply};
use crate::registration::session::ExternalIdentity;

type Queues = Arc<Mutex<HashMap<ExternalIdentity, mpsc::UnboundedSender<IncomingMessage>>>>;

pub struct Dispatcher {
    service: Arc<RegistrationService>,
    channel: Arc<dyn Channel>,
    queues: Queues,
}

impl Dispatcher {
    pub fn new(service: Arc<RegistrationService>, channel: Arc<dyn Channel>) -> Self {
        Self {
            service,
            channel,
            queues: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run until the channel stream ends or Ctrl+C, then let in-flight
    /// turns finish.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let mut message_stream = self.channel.start().await?;
        let mut workers = JoinSet::new();

        tracing::info!(channel = self.channel.name(), "Registration bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("Channel stream ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            while workers.try_join_next().is_some() {}

            let identity = match message.identity() {
                Ok(identity) => identity,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping message without a usable identity");
                    continue;
                }
            };

            self.enqueue(identity, message, &mut workers).await;
        }

        while workers.join_next().await.is_some() {}
        self.channel.shutdown().await
    }

    /// Hand `message` to the identity's worker, starting one if needed.
    async fn enqueue(
        &self,
        identity: ExternalIdentity,
        message: IncomingMessage,
        workers: &mut JoinSet<()>,
    ) {
        let mut queues = self.queues.lock().await;

        let message = match queues.get(&identity) {
            Some(tx) => match tx.send(message) {
                Ok(()) => return,
                // Worker already exited; start a fresh one.
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(message);
        queues.insert(identity, tx);

        workers.spawn(worker(
            identity,
            rx,
            Arc::clone(&self.service),
            Arc::clone(&self.channel),
            Arc::clone(&self.queues),
        ));
    }
}

async fn worker(
    identity: ExternalIdentity,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
    service: Arc<RegistrationService>,
    channel: Arc<dyn Channel>,
    queues: Queues,
) {
    loop {
        let message = match rx.try_recv() {
            Ok(message) => message,
            Err(_) => {
                // Re-check under the map lock: enqueue sends while holding it.
                let mut queues = queues.lock().await;
                match rx.try_recv() {
                    Ok(message) => message,
                    Err(_) => {
                        queues.remove(&identity);
                        return;
                    }
                }
            }
        };

        let event = Event::from_text(identity, message.user_name.clone(), &message.content);
        let reply = service.handle(event).await;

        for response in responses(reply) {
            if let Err(e) = channel.respond(&message, response).await {
                tracing::warn!(telegram_id = %identity, error = %e, "Failed to send reply");
            }
        }
    }
}

/// Outgoing messages for a reply: the notice first, then the screen.
pub fn responses(reply: Reply) -> Vec<OutgoingResponse> {
    let mut out = Vec::new();
    if let Some(notice) = reply.notice {
        out.push(OutgoingResponse::text(notice));
    }
    if let Some(screen) = reply.screen {
        out.push(OutgoingResponse::text(screen.text).with_buttons(screen.buttons));
    }
    out
}
