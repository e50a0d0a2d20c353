// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::bot::keyboard::{envelope_keyboard, ButtonEvent, BTN_MARK, BTN_READ};
use crate::modules::bot::BotTransport;
use crate::modules::common::signal::SIGNAL_MANAGER;
use crate::modules::config::AccountConfig;
use crate::modules::error::MailHeraldResult;
use crate::modules::imap::ImapGateway;
use crate::modules::ledger::Ledger;
use crate::modules::message::Envelope;
use crate::modules::render::{format_envelope, FormattedOutbound, Formatter};
use crate::modules::reader::ticker::ProgressTicker;
use std::sync::Arc;
use tracing::{error, info, warn};

pub mod ticker;

/// Per-account scan-and-announce loop plus the button-press side of the
/// pipeline. Collaborators arrive as explicit constructor parameters; the
/// orchestrator holds no state beyond them.
pub struct Orchestrator {
    account: AccountConfig,
    gateway: Arc<ImapGateway>,
    ledger: Arc<Ledger>,
    formatter: Arc<Formatter>,
    transport: Arc<BotTransport>,
}

impl Orchestrator {
    pub fn new(
        account: AccountConfig,
        gateway: Arc<ImapGateway>,
        ledger: Arc<Ledger>,
        formatter: Arc<Formatter>,
        transport: Arc<BotTransport>,
    ) -> Self {
        Self {
            account,
            gateway,
            ledger,
            formatter,
            transport,
        }
    }

    pub fn login(&self) -> &str {
        &self.account.login
    }

    /// True when this account's ledger has an envelope memo for `uid`; used
    /// by the supervisor to route button presses across accounts.
    pub async fn owns_uid(&self, uid: u32) -> bool {
        self.ledger
            .has_envelope(&self.account.login, uid)
            .await
            .unwrap_or(false)
    }

    /// One poll cycle: list unseen envelopes, oldest first, and announce
    /// each to every configured recipient that has not seen it yet. The
    /// announcement is recorded only after the chat API acknowledged the
    /// send, so a crash between the two re-announces rather than losing the
    /// message.
    pub async fn scan(&self) -> MailHeraldResult<()> {
        info!("scanning unseen mail for {}", self.account.login);

        let mut envelopes = match self.gateway.list_unseen(&self.account).await {
            Ok(envelopes) => envelopes,
            Err(e) => {
                error!("scan for {} aborted: {}", self.account.login, e);
                return Ok(());
            }
        };
        order_envelopes(&mut envelopes);

        let mut shutdown = SIGNAL_MANAGER.subscribe();
        for envelope in &envelopes {
            if !self.announce(envelope, &mut shutdown).await {
                info!("scan for {} interrupted by shutdown", self.account.login);
                break;
            }
        }
        Ok(())
    }

    /// Returns false when the shutdown signal was observed; the in-flight
    /// send (and its ledger write) always completes first.
    async fn announce(
        &self,
        envelope: &Envelope,
        shutdown: &mut tokio::sync::broadcast::Receiver<()>,
    ) -> bool {
        if let Err(e) = self
            .ledger
            .record_envelope(&self.account.login, envelope)
            .await
        {
            warn!("error save msg info: {}", e);
        }

        let text = format_envelope(envelope);
        for &chat_id in &self.account.recipients {
            if shutdown.try_recv().is_ok() {
                return false;
            }
            match self
                .ledger
                .was_announced(&self.account.login, envelope.uid, chat_id)
                .await
            {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    // Unknown announcement state: skip rather than risk a
                    // duplicate announcement.
                    warn!("error get msg state from ledger: {}; skipping chat {}", e, chat_id);
                    continue;
                }
            }

            let keyboard = envelope_keyboard(envelope.uid);
            if let Err(e) = self
                .transport
                .send_text(chat_id, &text, Some(&keyboard))
                .await
            {
                warn!("error send msg: {}", e);
                continue;
            }
            if let Err(e) = self
                .ledger
                .mark_announced(&self.account.login, envelope.uid, chat_id)
                .await
            {
                warn!(
                    "error save announcement to ledger: {}; uid {} will be re-announced",
                    e, envelope.uid
                );
            }
        }
        true
    }

    /// Dispatcher for a decoded button press. `BTN_READ` spawns an
    /// independent fetch-render-deliver task; multiple presses may run
    /// concurrently, including for the same UID.
    pub fn handle_button(self: &Arc<Self>, event: ButtonEvent) {
        match event.unique.as_str() {
            BTN_MARK => {
                // Reserved; the callback is acknowledged by the transport.
            }
            BTN_READ => {
                let uid = match event.payload.parse::<u32>() {
                    Ok(uid) => uid,
                    Err(e) => {
                        warn!("err parse button payload '{}': {}", event.payload, e);
                        return;
                    }
                };
                let orchestrator = Arc::clone(self);
                tokio::spawn(async move {
                    orchestrator.read_and_deliver(event.chat_id, uid).await;
                });
            }
            other => warn!("unknown btn type {}", other),
        }
    }

    async fn read_and_deliver(&self, chat_id: i64, uid: u32) {
        let from = match self.ledger.lookup_from(&self.account.login, uid).await {
            Ok(from) => from,
            Err(e) => {
                warn!("error get msg info: {}", e);
                return;
            }
        };

        let mut ticker =
            match ProgressTicker::start(Arc::clone(&self.transport), chat_id, &from).await {
                Ok(ticker) => ticker,
                Err(e) => {
                    warn!("error send progress msg to chat {}: {}", chat_id, e);
                    return;
                }
            };

        let message = match self.gateway.fetch_message(&self.account, uid).await {
            Ok(message) => message,
            Err(e) => {
                warn!("error read msg #{}: {}", uid, e);
                ticker.stop();
                return;
            }
        };
        let outbound = match self
            .formatter
            .format_message(&message, &self.account.login)
            .await
        {
            Ok(outbound) => outbound,
            Err(e) => {
                warn!("error print msg #{}: {}", uid, e);
                ticker.stop();
                return;
            }
        };

        ticker.stop();
        self.deliver(chat_id, &outbound).await;
    }

    async fn deliver(&self, chat_id: i64, outbound: &FormattedOutbound) {
        if let Some(image_path) = &outbound.image_path {
            if let Err(e) = self
                .transport
                .send_photo(chat_id, image_path, &outbound.text)
                .await
            {
                warn!("error send photo: {}", e);
                return;
            }
        } else if let Err(e) = self.transport.send_text(chat_id, &outbound.text, None).await {
            warn!("error send msg: {}", e);
            return;
        }

        for attachment in &outbound.attachments {
            if let Err(e) = self.transport.send_document(chat_id, attachment).await {
                warn!("error send document: {}", e);
                return;
            }
        }
    }
}

/// Oldest first; UID breaks date ties so reordering is deterministic.
fn order_envelopes(envelopes: &mut [Envelope]) {
    envelopes.sort_by(|a, b| a.date.cmp(&b.date).then(a.uid.cmp(&b.uid)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(uid: u32, date: i64) -> Envelope {
        Envelope {
            uid,
            date,
            subject: format!("msg {}", uid),
            from_address: "alice@example.com".into(),
            from_name: String::new(),
            to_address: "bob@example.com".into(),
            to_name: String::new(),
        }
    }

    #[test]
    fn envelopes_are_ordered_by_date_then_uid() {
        let mut envelopes = vec![
            envelope(3, 3000),
            envelope(2, 1000),
            envelope(5, 2000),
            envelope(4, 1000),
        ];
        order_envelopes(&mut envelopes);
        let uids: Vec<u32> = envelopes.iter().map(|e| e.uid).collect();
        assert_eq!(uids, vec![2, 4, 5, 3]);
    }
}
