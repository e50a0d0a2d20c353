// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::{code::ErrorCode, MailHeraldResult};
use crate::modules::message::{AttachmentFile, Envelope, InlineFile, Message, MessageBody};
use crate::raise_error;
use mail_parser::{MessagePart, MessageParser, MimeHeaders, PartType};
use std::path::{Path, PathBuf};
use tracing::{error, warn};

/// Parses a raw RFC 822 body into the structured `Message`, persisting every
/// inline/attachment part under `<file_root>/<account_login>/<uid>/`.
///
/// The message's own `Date`, `From`, `To` and `Subject` headers are required;
/// a missing or unparseable one fails the whole decode.
pub async fn decode_message(
    raw: &[u8],
    account_login: &str,
    uid: u32,
    file_root: &Path,
) -> MailHeraldResult<Message> {
    let parsed = MessageParser::new().parse(raw).ok_or_else(|| {
        raise_error!(
            format!("uid {}: failed to parse message body", uid),
            ErrorCode::MimeDecodeFailed
        )
    })?;

    let envelope = extract_header_envelope(&parsed, uid)?;
    let body = extract_body(&parsed, account_login, uid, file_root).await?;

    Ok(Message { envelope, body })
}

pub(crate) fn message_dir(file_root: &Path, account_login: &str, uid: u32) -> PathBuf {
    file_root.join(account_login).join(uid.to_string())
}

pub(crate) async fn ensure_message_dir(
    file_root: &Path,
    account_login: &str,
    uid: u32,
) -> MailHeraldResult<PathBuf> {
    let dir = message_dir(file_root, account_login, uid);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        raise_error!(
            format!("failed to create {}: {}", dir.display(), e),
            ErrorCode::FileWriteFailed
        )
    })?;
    set_mode(&dir, 0o755).await?;
    Ok(dir)
}

fn extract_header_envelope(
    parsed: &mail_parser::Message<'_>,
    uid: u32,
) -> MailHeraldResult<Envelope> {
    let date = parsed.date().ok_or_else(|| {
        raise_error!(
            format!("uid {}: error get 'Date' from header", uid),
            ErrorCode::MimeDecodeFailed
        )
    })?;

    let from = parsed
        .from()
        .and_then(|address| address.first())
        .and_then(|addr| addr.address.as_deref().map(|a| (a, addr)))
        .ok_or_else(|| {
            raise_error!(
                format!("uid {}: error get 'From' from header", uid),
                ErrorCode::MimeDecodeFailed
            )
        })?;

    let to = parsed
        .to()
        .and_then(|address| address.first())
        .and_then(|addr| addr.address.as_deref().map(|a| (a, addr)))
        .ok_or_else(|| {
            raise_error!(
                format!("uid {}: error get 'To' from header", uid),
                ErrorCode::MimeDecodeFailed
            )
        })?;

    let subject = parsed.subject().ok_or_else(|| {
        raise_error!(
            format!("uid {}: error get 'Subject' from header", uid),
            ErrorCode::MimeDecodeFailed
        )
    })?;

    Ok(Envelope {
        uid,
        date: date.to_timestamp() * 1000,
        subject: subject.to_string(),
        from_address: from.0.to_string(),
        from_name: from.1.name.as_deref().unwrap_or_default().to_string(),
        to_address: to.0.to_string(),
        to_name: to.1.name.as_deref().unwrap_or_default().to_string(),
    })
}

async fn extract_body(
    parsed: &mail_parser::Message<'_>,
    account_login: &str,
    uid: u32,
    file_root: &Path,
) -> MailHeraldResult<MessageBody> {
    let mut body = MessageBody::default();
    // The per-message directory is created on the first persisted part.
    let mut dir_cache: Option<PathBuf> = None;

    for part in &parsed.parts {
        if matches!(part.body, PartType::Multipart(_)) {
            continue;
        }

        let disposition = part.content_disposition();
        let is_attachment = disposition
            .map(|d| d.ctype().eq_ignore_ascii_case("attachment"))
            .unwrap_or(false);

        if is_attachment {
            let mut file_name = part
                .attachment_name()
                .map(str::to_string)
                .unwrap_or_default();
            if file_name.is_empty() {
                file_name = part.content_id().map(content_id_value).unwrap_or_default();
            }
            if file_name.is_empty() {
                warn!("uid: {} - attachment file name is empty", uid);
                continue;
            }
            let dir = dir_for(&mut dir_cache, file_root, account_login, uid).await?;
            let file_path = persist_part(dir, &file_name, part.contents()).await?;
            body.attachment_files.push(AttachmentFile {
                file_name,
                file_path,
            });
            continue;
        }

        match media_type(part).as_str() {
            "text/plain" => body.text_plain = part_text(part),
            "text/html" => body.text_html = part_text(part),
            media => {
                let is_inline = disposition
                    .map(|d| d.ctype().eq_ignore_ascii_case("inline"))
                    .unwrap_or(false);
                if !is_inline {
                    error!(
                        "uid: {} - unhandled part: content-type {}, disposition {:?}",
                        uid,
                        media,
                        disposition.map(|d| d.ctype())
                    );
                    continue;
                }

                let attachment_id = inline_attachment_id(part);
                let mut file_name = disposition
                    .and_then(|d| d.attribute("filename"))
                    .map(str::to_string)
                    .unwrap_or_default();
                if file_name.is_empty() {
                    file_name = attachment_id.clone();
                }
                if attachment_id.is_empty() && file_name.is_empty() {
                    warn!("uid: {} - inline attachment id is empty", uid);
                    continue;
                }

                // Inline parts persist under their attachment id so that the
                // stored name matches the `cid:` reference in the HTML body.
                let stored_name = if attachment_id.is_empty() {
                    file_name.clone()
                } else {
                    attachment_id.clone()
                };
                let dir = dir_for(&mut dir_cache, file_root, account_login, uid).await?;
                let file_path = persist_part(dir, &stored_name, part.contents()).await?;
                body.inline_files.push(InlineFile {
                    file_name,
                    file_path,
                    attachment_id,
                });
            }
        }
    }

    Ok(body)
}

async fn dir_for<'a>(
    cache: &'a mut Option<PathBuf>,
    file_root: &Path,
    account_login: &str,
    uid: u32,
) -> MailHeraldResult<&'a PathBuf> {
    if let Some(dir) = cache {
        return Ok(dir);
    }
    let dir = ensure_message_dir(file_root, account_login, uid).await?;
    Ok(cache.insert(dir))
}

async fn persist_part(dir: &Path, name: &str, contents: &[u8]) -> MailHeraldResult<PathBuf> {
    let file_path = dir.join(sanitize_file_name(name));
    tokio::fs::write(&file_path, contents).await.map_err(|e| {
        raise_error!(
            format!("error write file {}: {}", file_path.display(), e),
            ErrorCode::FileWriteFailed
        )
    })?;
    set_mode(&file_path, 0o644).await?;
    Ok(file_path)
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> MailHeraldResult<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| {
            raise_error!(
                format!("failed to chmod {}: {}", path.display(), e),
                ErrorCode::FileWriteFailed
            )
        })
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> MailHeraldResult<()> {
    Ok(())
}

fn part_text(part: &MessagePart<'_>) -> String {
    match part.text_contents() {
        Some(text) => text.to_string(),
        None => String::from_utf8_lossy(part.contents()).into_owned(),
    }
}

fn media_type(part: &MessagePart<'_>) -> String {
    match part.content_type() {
        Some(ct) => match ct.subtype() {
            Some(subtype) => format!(
                "{}/{}",
                ct.ctype().to_ascii_lowercase(),
                subtype.to_ascii_lowercase()
            ),
            None => ct.ctype().to_ascii_lowercase(),
        },
        // Parts without a content type default to text/plain per RFC 2045.
        None => "text/plain".to_string(),
    }
}

fn inline_attachment_id(part: &MessagePart<'_>) -> String {
    let x_attachment_id = part
        .headers
        .iter()
        .find(|header| header.name.as_str().eq_ignore_ascii_case("X-Attachment-Id"))
        .and_then(|header| header.value.as_text())
        .map(|value| value.trim().to_string())
        .unwrap_or_default();
    if !x_attachment_id.is_empty() {
        return x_attachment_id;
    }
    part.content_id().map(content_id_value).unwrap_or_default()
}

/// `Content-Id` values arrive as `<id>`; the angle brackets and surrounding
/// whitespace are not part of the id.
fn content_id_value(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim()
        .to_string()
}

fn sanitize_file_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::error::code::ErrorCode;

    const LOGIN: &str = "bob@example.com";
    const UID: u32 = 42;

    fn mixed_message() -> Vec<u8> {
        concat!(
            "Date: Tue, 05 Aug 2025 10:30:00 +0000\r\n",
            "From: Alice <alice@example.com>\r\n",
            "To: Bob <bob@example.com>\r\n",
            "Subject: Quarterly report\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/mixed; boundary=\"xyz\"\r\n",
            "\r\n",
            "--xyz\r\n",
            "Content-Type: text/plain; charset=utf-8\r\n",
            "\r\n",
            "hello body\r\n",
            "--xyz\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "<p>hello body</p>\r\n",
            "--xyz\r\n",
            "Content-Type: application/pdf\r\n",
            "Content-Disposition: attachment; filename=\"report.pdf\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "JVBERi0xLjQgZmFrZQ==\r\n",
            "--xyz--\r\n",
        )
        .into()
    }

    fn inline_image_message() -> Vec<u8> {
        concat!(
            "Date: Tue, 05 Aug 2025 10:30:00 +0000\r\n",
            "From: Alice <alice@example.com>\r\n",
            "To: Bob <bob@example.com>\r\n",
            "Subject: Photo\r\n",
            "MIME-Version: 1.0\r\n",
            "Content-Type: multipart/related; boundary=\"rel\"\r\n",
            "\r\n",
            "--rel\r\n",
            "Content-Type: text/html; charset=utf-8\r\n",
            "\r\n",
            "<img src=\"cid:img1\">\r\n",
            "--rel\r\n",
            "Content-Type: image/png\r\n",
            "Content-Disposition: inline\r\n",
            "Content-Id: <img1>\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "iVBORw0KGgo=\r\n",
            "--rel--\r\n",
        )
        .into()
    }

    #[tokio::test]
    async fn decodes_text_html_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let message = decode_message(&mixed_message(), LOGIN, UID, dir.path())
            .await
            .unwrap();

        assert_eq!(message.envelope.subject, "Quarterly report");
        assert_eq!(message.envelope.from_address, "alice@example.com");
        assert_eq!(message.envelope.from_name, "Alice");
        assert_eq!(message.envelope.to_address, "bob@example.com");
        assert_eq!(message.envelope.date, 1_754_389_800_000);

        assert!(message.body.text_plain.contains("hello body"));
        assert!(message.body.text_html.contains("<p>hello body</p>"));

        assert_eq!(message.body.attachment_files.len(), 1);
        let attachment = &message.body.attachment_files[0];
        assert_eq!(attachment.file_name, "report.pdf");
        assert_eq!(
            attachment.file_path,
            dir.path().join(LOGIN).join("42").join("report.pdf")
        );
        // decoded MIME part body lands on disk byte-for-byte
        let on_disk = std::fs::read(&attachment.file_path).unwrap();
        assert_eq!(on_disk, b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn persists_inline_parts_under_their_content_id() {
        let dir = tempfile::tempdir().unwrap();
        let message = decode_message(&inline_image_message(), LOGIN, UID, dir.path())
            .await
            .unwrap();

        assert_eq!(message.body.inline_files.len(), 1);
        let inline = &message.body.inline_files[0];
        assert_eq!(inline.attachment_id, "img1");
        assert_eq!(inline.file_name, "img1");
        assert_eq!(
            inline.file_path,
            dir.path().join(LOGIN).join("42").join("img1")
        );
        assert!(inline.file_path.exists());
        assert!(message.body.text_html.contains("src=\"cid:img1\""));
        assert!(message.body.attachment_files.is_empty());
    }

    #[tokio::test]
    async fn missing_from_header_fails_decode() {
        let raw: Vec<u8> = concat!(
            "Date: Tue, 05 Aug 2025 10:30:00 +0000\r\n",
            "To: Bob <bob@example.com>\r\n",
            "Subject: No sender\r\n",
            "\r\n",
            "hello\r\n",
        )
        .into();

        let dir = tempfile::tempdir().unwrap();
        let err = decode_message(&raw, LOGIN, UID, dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MimeDecodeFailed);
    }

    #[tokio::test]
    async fn message_without_files_creates_no_directory() {
        let raw: Vec<u8> = concat!(
            "Date: Tue, 05 Aug 2025 10:30:00 +0000\r\n",
            "From: Alice <alice@example.com>\r\n",
            "To: Bob <bob@example.com>\r\n",
            "Subject: Plain\r\n",
            "\r\n",
            "just text\r\n",
        )
        .into();

        let dir = tempfile::tempdir().unwrap();
        let message = decode_message(&raw, LOGIN, UID, dir.path()).await.unwrap();
        assert!(message.body.text_plain.contains("just text"));
        assert!(!message_dir(dir.path(), LOGIN, UID).exists());
    }

    #[test]
    fn content_id_value_strips_brackets() {
        assert_eq!(content_id_value(" <abc@mailer> "), "abc@mailer");
        assert_eq!(content_id_value("abc"), "abc");
    }
}
