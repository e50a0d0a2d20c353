// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::bot::keyboard::{parse_callback_data, ButtonEvent};
use crate::modules::bot::BotTransport;
use crate::modules::common::signal::SIGNAL_MANAGER;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Starts the long-poll loop over the chat API's update feed. Every callback
/// query is acknowledged at the transport level and forwarded as a decoded
/// `ButtonEvent`; the receiver closes once the shutdown signal fires.
pub fn start(transport: Arc<BotTransport>) -> mpsc::Receiver<ButtonEvent> {
    let (sender, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

    tokio::spawn(async move {
        let mut shutdown = SIGNAL_MANAGER.subscribe();
        let mut offset = 0i64;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("update poller shutting down");
                    break;
                }
                result = transport.get_updates(offset) => {
                    let updates = match result {
                        Ok(updates) => updates,
                        Err(e) => {
                            warn!("failed to fetch chat updates: {}", e);
                            tokio::time::sleep(RETRY_BACKOFF).await;
                            continue;
                        }
                    };
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(callback) = update.callback_query else {
                            continue;
                        };
                        if let Err(e) = transport.answer_callback(&callback.id).await {
                            warn!("failed to acknowledge callback: {}", e);
                        }
                        let Some(message) = callback.message else {
                            warn!("callback query without originating message");
                            continue;
                        };
                        let Some((unique, payload)) =
                            callback.data.as_deref().and_then(parse_callback_data)
                        else {
                            warn!("callback query with malformed data: {:?}", callback.data);
                            continue;
                        };
                        let event = ButtonEvent {
                            chat_id: message.chat.id,
                            unique: unique.to_string(),
                            payload: payload.to_string(),
                        };
                        if sender.send(event).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    });

    receiver
}
