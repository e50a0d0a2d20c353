// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::config::AccountConfig;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailHeraldResult;
use crate::modules::imap::client::Client;
use crate::modules::imap::decoder::try_decode_string;
use crate::modules::imap::session::SessionStream;
use crate::modules::message::{decode, Envelope, Message};
use crate::raise_error;
use async_imap::types::Fetch;
use async_imap::Session as ImapSession;
use futures::TryStreamExt;
use imap_proto::types::Address;
use itertools::Itertools;
use std::path::PathBuf;
use tracing::{error, warn};

pub mod client;
pub mod decoder;
pub mod session;

type Session = ImapSession<Box<dyn SessionStream>>;

const BODY_FETCH_QUERY: &str = "(UID BODY[])";
const ENVELOPE_FETCH_QUERY: &str = "(UID ENVELOPE)";

/// Gateway over the remote mailbox. Every operation owns its own session:
/// connect, login, do the work, logout. Nothing is pooled; the poll cadence
/// bounds connection churn.
pub struct ImapGateway {
    file_root: PathBuf,
}

impl ImapGateway {
    pub fn new(file_root: PathBuf) -> Self {
        Self { file_root }
    }

    /// Lists the envelopes of all messages in `INBOX` that do not carry the
    /// `\Seen` flag. The mailbox is opened read-only, so listing never
    /// mutates server state.
    pub async fn list_unseen(&self, account: &AccountConfig) -> MailHeraldResult<Vec<Envelope>> {
        let mut session = Self::open_session(account).await?;
        let result = Self::unseen_envelopes(&mut session).await;
        Self::logout(&mut session).await;
        result
    }

    /// Fetches the full message body for `uid`, decodes its MIME parts and
    /// persists inline/attachment files under the per-message directory.
    ///
    /// The mailbox is opened writable iff the account asks for mark-as-read;
    /// the body fetch deliberately omits `.PEEK`, so a writable open lets
    /// the server set `\Seen` on fetch.
    pub async fn fetch_message(
        &self,
        account: &AccountConfig,
        uid: u32,
    ) -> MailHeraldResult<Message> {
        let mut session = Self::open_session(account).await?;
        let result = self.read_full_message(&mut session, account, uid).await;
        Self::logout(&mut session).await;
        result
    }

    async fn open_session(account: &AccountConfig) -> MailHeraldResult<Session> {
        let client = Client::connect(&account.imap_host, account.imap_port).await?;
        client.login(&account.login, &account.password).await
    }

    // Exactly one logout attempt per session, error or not.
    async fn logout(session: &mut Session) {
        if let Err(e) = session.logout().await {
            error!("error logout from imap server: {:?}", e);
        }
    }

    async fn unseen_envelopes(session: &mut Session) -> MailHeraldResult<Vec<Envelope>> {
        session
            .examine("INBOX")
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapSelectFailed))?;

        let uids = session
            .uid_search("UNSEEN")
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapSearchFailed))?;
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let uid_set = uids.iter().sorted().join(",");
        let fetches = {
            let stream = session
                .uid_fetch(&uid_set, ENVELOPE_FETCH_QUERY)
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapFetchFailed))?;
            stream
                .try_collect::<Vec<Fetch>>()
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapFetchFailed))?
        };

        let mut envelopes = Vec::with_capacity(fetches.len());
        for fetch in &fetches {
            match extract_envelope(fetch) {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => warn!("skipping unseen message with undecodable envelope: {}", e),
            }
        }
        Ok(envelopes)
    }

    async fn read_full_message(
        &self,
        session: &mut Session,
        account: &AccountConfig,
        uid: u32,
    ) -> MailHeraldResult<Message> {
        let mailbox = if account.mark_as_read {
            session.select("INBOX").await
        } else {
            session.examine("INBOX").await
        }
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapSelectFailed))?;

        if mailbox.exists == 0 {
            return Err(raise_error!(
                "no message in mailbox".into(),
                ErrorCode::MessageNotFound
            ));
        }

        let fetches = {
            let stream = session
                .uid_fetch(uid.to_string(), BODY_FETCH_QUERY)
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapFetchFailed))?;
            stream
                .try_collect::<Vec<Fetch>>()
                .await
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapFetchFailed))?
        };

        let raw = fetches.iter().find_map(|fetch| fetch.body()).ok_or_else(|| {
            raise_error!(
                format!("server returned no body for uid {}", uid),
                ErrorCode::MessageNotFound
            )
        })?;

        decode::decode_message(raw, &account.login, uid, &self.file_root).await
    }
}

fn extract_envelope(fetch: &Fetch) -> MailHeraldResult<Envelope> {
    let uid = fetch
        .uid
        .ok_or_else(|| raise_error!("No uid available".into(), ErrorCode::ImapFetchFailed))?;
    let envelope = fetch
        .envelope()
        .ok_or_else(|| raise_error!("No envelope available".into(), ErrorCode::ImapFetchFailed))?;

    let from = envelope
        .from
        .as_ref()
        .and_then(|addresses| addresses.first())
        .ok_or_else(|| {
            raise_error!(
                format!("uid {}: envelope has no From address", uid),
                ErrorCode::ImapFetchFailed
            )
        })?;
    let to = envelope
        .to
        .as_ref()
        .and_then(|addresses| addresses.first())
        .ok_or_else(|| {
            raise_error!(
                format!("uid {}: envelope has no To address", uid),
                ErrorCode::ImapFetchFailed
            )
        })?;

    let subject = envelope
        .subject
        .as_deref()
        .map(|raw| try_decode_string(&decode_bytes(raw)))
        .unwrap_or_default();

    Ok(Envelope {
        uid,
        date: envelope_date_millis(uid, envelope.date.as_deref()),
        subject,
        from_address: address_text(from),
        from_name: display_name(from),
        to_address: address_text(to),
        to_name: display_name(to),
    })
}

fn decode_bytes(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Joins the mailbox and host parts of an IMAP envelope address verbatim.
/// Downstream consumers key on this joined form.
fn address_text(address: &Address<'_>) -> String {
    let mailbox = address.mailbox.as_deref().map(decode_bytes).unwrap_or_default();
    let host = address.host.as_deref().map(decode_bytes).unwrap_or_default();
    format!("{}{}", mailbox, host)
}

fn display_name(address: &Address<'_>) -> String {
    address
        .name
        .as_deref()
        .map(|raw| try_decode_string(&decode_bytes(raw)))
        .unwrap_or_default()
}

fn envelope_date_millis(uid: u32, raw: Option<&[u8]>) -> i64 {
    let Some(raw) = raw else {
        warn!("uid {}: envelope has no date", uid);
        return 0;
    };
    let text = decode_bytes(raw);
    match chrono::DateTime::parse_from_rfc2822(text.trim()) {
        Ok(date) => date.timestamp_millis(),
        Err(e) => {
            warn!("uid {}: unparseable envelope date '{}': {}", uid, text, e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn address(name: Option<&'static str>, mailbox: &'static str, host: &'static str) -> Address<'static> {
        Address {
            name: name.map(|n| Cow::Borrowed(n.as_bytes())),
            adl: None,
            mailbox: Some(Cow::Borrowed(mailbox.as_bytes())),
            host: Some(Cow::Borrowed(host.as_bytes())),
        }
    }

    #[test]
    fn address_text_joins_mailbox_and_host_verbatim() {
        let addr = address(Some("Alice"), "alice", "example.com");
        assert_eq!(address_text(&addr), "aliceexample.com");
        assert_eq!(display_name(&addr), "Alice");
    }

    #[test]
    fn envelope_date_parses_rfc2822() {
        let millis = envelope_date_millis(1, Some(b"Tue, 05 Aug 2025 10:30:00 +0000"));
        assert_eq!(millis, 1_754_389_800_000);
    }

    #[test]
    fn envelope_date_falls_back_to_zero() {
        assert_eq!(envelope_date_millis(1, Some(b"not a date")), 0);
        assert_eq!(envelope_date_millis(1, None), 0);
    }
}
