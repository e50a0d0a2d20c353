// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::{async_find_impl, upsert_impl};
use crate::modules::error::{code::ErrorCode, MailHeraldResult};
use crate::modules::message::Envelope;
use crate::{raise_error, utc_now};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Envelope memo, keyed per (account, uid). Written on every poll that sees
/// the message; the payload is identical across rewrites, so the upsert is
/// an idempotent no-op after the first cycle.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 1, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct EnvelopeRecord {
    #[secondary_key]
    pub account_login: String,
    pub uid: u32,
    pub date: i64,
    pub subject: String,
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
    pub to_name: String,
    /// Creation timestamp (UNIX epoch milliseconds)
    pub recorded_at: i64,
}

impl EnvelopeRecord {
    fn pk(&self) -> String {
        envelope_key(&self.account_login, self.uid)
    }
}

/// One row per delivered announcement; its existence is the dedup fact.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[native_model(id = 2, version = 1)]
#[native_db(primary_key(pk -> String))]
pub struct AnnouncementRecord {
    #[secondary_key]
    pub account_login: String,
    pub uid: u32,
    pub chat_id: i64,
    /// Delivery timestamp (UNIX epoch milliseconds)
    pub announced_at: i64,
}

impl AnnouncementRecord {
    fn pk(&self) -> String {
        announcement_key(&self.account_login, self.uid, self.chat_id)
    }
}

fn envelope_key(account_login: &str, uid: u32) -> String {
    format!("{}_{:010}", account_login, uid)
}

fn announcement_key(account_login: &str, uid: u32, chat_id: i64) -> String {
    format!("{}_{:010}_{}", account_login, uid, chat_id)
}

/// Durable dedup ledger over the embedded KV store. Each write commits its
/// own transaction, so a `mark_announced` is either fully visible on restart
/// or absent.
pub struct Ledger {
    db: Arc<Database<'static>>,
}

impl Ledger {
    pub fn new(db: Arc<Database<'static>>) -> Self {
        Self { db }
    }

    pub async fn record_envelope(
        &self,
        account_login: &str,
        envelope: &Envelope,
    ) -> MailHeraldResult<()> {
        let record = EnvelopeRecord {
            account_login: account_login.to_string(),
            uid: envelope.uid,
            date: envelope.date,
            subject: envelope.subject.clone(),
            from_address: envelope.from_address.clone(),
            from_name: envelope.from_name.clone(),
            to_address: envelope.to_address.clone(),
            to_name: envelope.to_name.clone(),
            recorded_at: utc_now!(),
        };
        upsert_impl(&self.db, record).await.map_err(|e| {
            raise_error!(
                format!("ledger envelope write failed: {}", e),
                ErrorCode::LedgerWriteFailed
            )
        })
    }

    pub async fn has_envelope(&self, account_login: &str, uid: u32) -> MailHeraldResult<bool> {
        let record: Option<EnvelopeRecord> =
            async_find_impl(&self.db, envelope_key(account_login, uid))
                .await
                .map_err(|e| {
                    raise_error!(
                        format!("ledger envelope read failed: {}", e),
                        ErrorCode::LedgerReadFailed
                    )
                })?;
        Ok(record.is_some())
    }

    pub async fn lookup_from(&self, account_login: &str, uid: u32) -> MailHeraldResult<String> {
        let record: Option<EnvelopeRecord> =
            async_find_impl(&self.db, envelope_key(account_login, uid))
                .await
                .map_err(|e| {
                    raise_error!(
                        format!("ledger envelope read failed: {}", e),
                        ErrorCode::LedgerReadFailed
                    )
                })?;
        let record = record.ok_or_else(|| {
            raise_error!(
                format!("no envelope recorded for {} uid {}", account_login, uid),
                ErrorCode::MessageNotFound
            )
        })?;
        Ok(record.from_address)
    }

    pub async fn was_announced(
        &self,
        account_login: &str,
        uid: u32,
        chat_id: i64,
    ) -> MailHeraldResult<bool> {
        let record: Option<AnnouncementRecord> =
            async_find_impl(&self.db, announcement_key(account_login, uid, chat_id))
                .await
                .map_err(|e| {
                    raise_error!(
                        format!("ledger announcement read failed: {}", e),
                        ErrorCode::LedgerReadFailed
                    )
                })?;
        Ok(record.is_some())
    }

    pub async fn mark_announced(
        &self,
        account_login: &str,
        uid: u32,
        chat_id: i64,
    ) -> MailHeraldResult<()> {
        let record = AnnouncementRecord {
            account_login: account_login.to_string(),
            uid,
            chat_id,
            announced_at: utc_now!(),
        };
        upsert_impl(&self.db, record).await.map_err(|e| {
            raise_error!(
                format!("ledger announcement write failed: {}", e),
                ErrorCode::LedgerWriteFailed
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::database::{list_all_impl, LEDGER_MODELS};
    use native_db::Builder;

    fn memory_ledger() -> Ledger {
        let db = Builder::new().create_in_memory(&LEDGER_MODELS).unwrap();
        Ledger::new(Arc::new(db))
    }

    fn envelope(uid: u32) -> Envelope {
        Envelope {
            uid,
            date: 1_754_300_000_000,
            subject: "Quarterly report".into(),
            from_address: "alice@example.com".into(),
            from_name: "Alice".into(),
            to_address: "bob@example.com".into(),
            to_name: "Bob".into(),
        }
    }

    #[tokio::test]
    async fn lookup_from_returns_recorded_address() {
        let ledger = memory_ledger();
        ledger
            .record_envelope("bob@example.com", &envelope(42))
            .await
            .unwrap();

        let from = ledger.lookup_from("bob@example.com", 42).await.unwrap();
        assert_eq!(from, "alice@example.com");
        assert!(ledger.has_envelope("bob@example.com", 42).await.unwrap());
    }

    #[tokio::test]
    async fn lookup_from_unknown_uid_is_not_found() {
        let ledger = memory_ledger();
        let err = ledger.lookup_from("bob@example.com", 7).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::MessageNotFound);
    }

    #[tokio::test]
    async fn record_envelope_is_idempotent() {
        let ledger = memory_ledger();
        ledger
            .record_envelope("bob@example.com", &envelope(42))
            .await
            .unwrap();
        ledger
            .record_envelope("bob@example.com", &envelope(42))
            .await
            .unwrap();

        let from = ledger.lookup_from("bob@example.com", 42).await.unwrap();
        assert_eq!(from, "alice@example.com");
    }

    #[tokio::test]
    async fn announcements_are_scoped_per_recipient() {
        let ledger = memory_ledger();

        assert!(!ledger
            .was_announced("bob@example.com", 42, 100)
            .await
            .unwrap());

        ledger.mark_announced("bob@example.com", 42, 100).await.unwrap();

        assert!(ledger
            .was_announced("bob@example.com", 42, 100)
            .await
            .unwrap());
        // same uid, different chat: still unannounced
        assert!(!ledger
            .was_announced("bob@example.com", 42, 200)
            .await
            .unwrap());
        // same chat, different account: still unannounced
        assert!(!ledger
            .was_announced("carol@example.com", 42, 100)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn mark_announced_is_idempotent() {
        let ledger = memory_ledger();
        ledger.mark_announced("bob@example.com", 42, 100).await.unwrap();
        ledger.mark_announced("bob@example.com", 42, 100).await.unwrap();
        assert!(ledger
            .was_announced("bob@example.com", 42, 100)
            .await
            .unwrap());

        // a re-mark upserts in place, it never duplicates the row
        let rows: Vec<AnnouncementRecord> = list_all_impl(&ledger.db).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
