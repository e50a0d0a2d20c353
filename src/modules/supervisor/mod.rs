// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::bot::keyboard::ButtonEvent;
use crate::modules::bot::{updates, BotTransport};
use crate::modules::common::signal::SIGNAL_MANAGER;
use crate::modules::config::AppConfig;
use crate::modules::error::MailHeraldResult;
use crate::modules::imap::ImapGateway;
use crate::modules::ledger::Ledger;
use crate::modules::reader::Orchestrator;
use crate::modules::render::Formatter;
use crate::modules::scheduler::periodic::PeriodicTask;
use crate::modules::settings::cli::SETTINGS;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Runs one orchestrator per configured account and routes button presses
/// to the account whose ledger knows the pressed UID.
pub struct Supervisor {
    orchestrators: Vec<Arc<Orchestrator>>,
    transport: Arc<BotTransport>,
}

impl Supervisor {
    pub fn new(
        config: &AppConfig,
        gateway: Arc<ImapGateway>,
        ledger: Arc<Ledger>,
        formatter: Arc<Formatter>,
        transport: Arc<BotTransport>,
    ) -> Self {
        let orchestrators = config
            .resolved_accounts()
            .into_iter()
            .map(|account| {
                if account.recipients.is_empty() {
                    warn!("account {} has no recipients configured", account.login);
                }
                Arc::new(Orchestrator::new(
                    account,
                    Arc::clone(&gateway),
                    Arc::clone(&ledger),
                    Arc::clone(&formatter),
                    Arc::clone(&transport),
                ))
            })
            .collect();
        Self {
            orchestrators,
            transport,
        }
    }

    /// Blocks until the shutdown signal fires, then drains the scan tasks.
    /// In-flight button-handler tasks observe the same signal through their
    /// tickers and session suspension points.
    pub async fn run(self) -> MailHeraldResult<()> {
        let mut events = updates::start(Arc::clone(&self.transport));

        let interval = Duration::from_secs(SETTINGS.mailherald_poll_interval_seconds);
        let mut scan_handles = Vec::with_capacity(self.orchestrators.len());
        for orchestrator in &self.orchestrators {
            let task = PeriodicTask::new(&format!("mailbox-scan-{}", orchestrator.login()));
            let scanner = Arc::clone(orchestrator);
            let handle = task.start(
                move || {
                    let scanner = Arc::clone(&scanner);
                    async move { scanner.scan().await }
                },
                interval,
                true,
                true,
            );
            scan_handles.push(handle);
        }

        let mut shutdown = SIGNAL_MANAGER.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => break,
                }
            }
        }

        for handle in scan_handles {
            handle.cancel().await;
        }
        info!("supervisor stopped");
        Ok(())
    }

    async fn dispatch(&self, event: ButtonEvent) {
        let Ok(uid) = event.payload.parse::<u32>() else {
            warn!("button press with non-numeric payload '{}'", event.payload);
            return;
        };
        for orchestrator in &self.orchestrators {
            if orchestrator.owns_uid(uid).await {
                orchestrator.handle_button(event);
                return;
            }
        }
        warn!("button press for uid {} not known to any account", uid);
    }
}
