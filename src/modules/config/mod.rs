// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, MailHeraldResult};
use crate::raise_error;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_MAX_TEXT_MESSAGE_SIZE: usize = 4096;

/// Top-level configuration file, one document per deployment.
///
/// Accounts, the bot token and the app options live in a JSON file so that
/// credentials never travel through the process environment; everything
/// process-shaped (paths, log level, poll cadence) stays on `SETTINGS`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub bot: BotConfig,
    #[serde(default)]
    pub app: AppOptions,
    pub accounts: Vec<AccountEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Telegram bot API token.
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppOptions {
    /// Attachment cache root. Falls back to `<root_dir>/files` when unset.
    pub file_directory: Option<PathBuf>,
    /// When set, message fetches open the mailbox writable so the fetch
    /// marks the message `\Seen` on the server.
    #[serde(default)]
    pub mark_as_read_messages: bool,
    /// Plain-text bodies longer than this are rasterised instead.
    pub max_text_message_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountEntry {
    pub imap: ImapEndpoint,
    #[serde(default)]
    pub recipients: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImapEndpoint {
    pub login: String,
    pub password: String,
    /// `host:port`, TLS-only.
    pub server: String,
}

/// One polled mailbox with everything its orchestrator needs resolved.
#[derive(Debug, Clone)]
pub struct AccountConfig {
    pub login: String,
    pub password: String,
    pub imap_host: String,
    pub imap_port: u16,
    pub recipients: Vec<i64>,
    pub mark_as_read: bool,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> MailHeraldResult<AppConfig> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            raise_error!(
                format!("failed to read config file {}: {}", path.display(), e),
                ErrorCode::ConfigLoadFailed
            )
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|e| {
            raise_error!(
                format!("failed to parse config file {}: {}", path.display(), e),
                ErrorCode::ConfigLoadFailed
            )
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn max_text_message_size(&self) -> usize {
        self.app
            .max_text_message_size
            .unwrap_or(DEFAULT_MAX_TEXT_MESSAGE_SIZE)
    }

    /// Resolves each configured account into the form the orchestrators
    /// consume. Only call after `validate` succeeded.
    pub fn resolved_accounts(&self) -> Vec<AccountConfig> {
        self.accounts
            .iter()
            .map(|entry| {
                let (host, port) = split_server(&entry.imap.server)
                    .expect("validated server endpoint");
                AccountConfig {
                    login: entry.imap.login.clone(),
                    password: entry.imap.password.clone(),
                    imap_host: host.to_string(),
                    imap_port: port,
                    recipients: entry.recipients.clone(),
                    mark_as_read: self.app.mark_as_read_messages,
                }
            })
            .collect()
    }

    fn validate(&self) -> MailHeraldResult<()> {
        if self.bot.token.trim().is_empty() {
            return Err(raise_error!(
                "'bot.token' must not be empty".into(),
                ErrorCode::MissingConfiguration
            ));
        }
        if self.accounts.is_empty() {
            return Err(raise_error!(
                "at least one account must be configured".into(),
                ErrorCode::MissingConfiguration
            ));
        }
        if let Some(size) = self.app.max_text_message_size {
            if size == 0 {
                return Err(raise_error!(
                    "'app.max_text_message_size' must be greater than 0".into(),
                    ErrorCode::InvalidParameter
                ));
            }
        }
        for entry in &self.accounts {
            if entry.imap.login.trim().is_empty() || entry.imap.password.is_empty() {
                return Err(raise_error!(
                    "'imap.login' and 'imap.password' must not be empty".into(),
                    ErrorCode::MissingConfiguration
                ));
            }
            if split_server(&entry.imap.server).is_none() {
                return Err(raise_error!(
                    format!(
                        "'imap.server' must be host:port, got '{}'",
                        entry.imap.server
                    ),
                    ErrorCode::InvalidParameter
                ));
            }
        }
        Ok(())
    }
}

fn split_server(server: &str) -> Option<(&str, u16)> {
    let (host, port) = server.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse::<u16>().ok()?;
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"{
            "bot": { "token": "12345:token" },
            "app": { "mark_as_read_messages": true, "max_text_message_size": 2048 },
            "accounts": [
                {
                    "imap": {
                        "login": "alice@example.com",
                        "password": "secret",
                        "server": "imap.example.com:993"
                    },
                    "recipients": [100, 200]
                }
            ]
        }"#
    }

    #[test]
    fn parses_and_resolves_accounts() {
        let config: AppConfig = serde_json::from_str(sample()).unwrap();
        config.validate().unwrap();

        let accounts = config.resolved_accounts();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].login, "alice@example.com");
        assert_eq!(accounts[0].imap_host, "imap.example.com");
        assert_eq!(accounts[0].imap_port, 993);
        assert_eq!(accounts[0].recipients, vec![100, 200]);
        assert!(accounts[0].mark_as_read);
        assert_eq!(config.max_text_message_size(), 2048);
    }

    #[test]
    fn rejects_server_without_port() {
        let mut config: AppConfig = serde_json::from_str(sample()).unwrap();
        config.accounts[0].imap.server = "imap.example.com".into();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidParameter);
    }

    #[test]
    fn rejects_empty_bot_token() {
        let mut config: AppConfig = serde_json::from_str(sample()).unwrap();
        config.bot.token = "  ".into();
        let err = config.validate().unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingConfiguration);
    }
}
