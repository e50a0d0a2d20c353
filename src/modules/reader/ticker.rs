// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::bot::{BotTransport, MessageHandle};
use crate::modules::common::signal::SIGNAL_MANAGER;
use crate::modules::error::MailHeraldResult;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::warn;

/// Animated placeholder shown while a body fetch is in flight.
///
/// The ticker owns the placeholder message: it deletes it itself when the
/// stop signal arrives, so a caller can never race an edit against a delete.
/// Dropping the ticker without calling `stop` counts as a stop signal, which
/// is what tears the placeholder down when the enclosing task is cancelled.
pub struct ProgressTicker {
    stop: Option<oneshot::Sender<()>>,
}

impl ProgressTicker {
    /// Sends the initial placeholder and starts the per-second edit loop.
    pub async fn start(
        transport: Arc<BotTransport>,
        chat_id: i64,
        from: &str,
    ) -> MailHeraldResult<ProgressTicker> {
        let placeholder = transport
            .send_text(chat_id, &tick_text(from, 0), None)
            .await?;
        let (stop_sender, stop_receiver) = oneshot::channel();
        tokio::spawn(tick_loop(
            transport,
            placeholder,
            from.to_string(),
            stop_receiver,
        ));
        Ok(ProgressTicker {
            stop: Some(stop_sender),
        })
    }

    /// Signals the tick loop to delete the placeholder and exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(sender) = self.stop.take() {
            let _ = sender.send(());
        }
    }
}

async fn tick_loop(
    transport: Arc<BotTransport>,
    placeholder: MessageHandle,
    from: String,
    mut stop: oneshot::Receiver<()>,
) {
    let mut shutdown = SIGNAL_MANAGER.subscribe();
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await; // discard the immediate first tick
    let mut seconds = 0u64;

    loop {
        tokio::select! {
            // Completes on stop() and on sender drop alike.
            _ = &mut stop => break,
            _ = shutdown.recv() => break,
            _ = interval.tick() => {
                seconds += 1;
                if let Err(e) = transport.edit_text(placeholder, &tick_text(&from, seconds)).await {
                    warn!("failed to edit progress message: {}", e);
                }
            }
        }
    }

    // Best-effort teardown; the placeholder may already be gone.
    if let Err(e) = transport.delete(placeholder).await {
        warn!("failed to delete progress message: {}", e);
    }
}

/// Placeholder text for tick `seconds`; 0 is the initial message.
pub(crate) fn tick_text(from: &str, seconds: u64) -> String {
    if seconds == 0 {
        return format!("⌛ Reading a mail from {}", from);
    }
    if seconds % 2 == 0 {
        format!("⏳ Reading a mail from {} ({}sec)", from, seconds)
    } else {
        format!("⌛ Reading a mail from {} ({}sec)", from, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_text_has_no_counter() {
        assert_eq!(
            tick_text("alice@example.com", 0),
            "⌛ Reading a mail from alice@example.com"
        );
    }

    #[test]
    fn glyph_alternates_by_parity() {
        assert_eq!(
            tick_text("alice@example.com", 1),
            "⌛ Reading a mail from alice@example.com (1sec)"
        );
        assert_eq!(
            tick_text("alice@example.com", 2),
            "⏳ Reading a mail from alice@example.com (2sec)"
        );
        assert_eq!(
            tick_text("alice@example.com", 3),
            "⌛ Reading a mail from alice@example.com (3sec)"
        );
    }
}
