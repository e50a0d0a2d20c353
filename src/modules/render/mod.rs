// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::MailHeraldResult;
use crate::modules::message::decode::ensure_message_dir;
use crate::modules::message::{Envelope, Message, MessageBody};
use std::path::PathBuf;

pub mod html;

/// Fully assembled outbound payload for one message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormattedOutbound {
    /// Bot-markup text: the caption when `image_path` is set, otherwise the
    /// standalone message.
    pub text: String,
    /// Rasterised HTML body, when the plain text form was unusable.
    pub image_path: Option<PathBuf>,
    /// File paths delivered as documents, in part order.
    pub attachments: Vec<PathBuf>,
}

/// Renders the fixed envelope block used in every announcement and caption.
pub fn format_envelope(envelope: &Envelope) -> String {
    let mut result = String::new();
    if !envelope.to_name.is_empty() {
        result += &format!(
            "<b>📫 {}</b>\t ({})\n\n",
            envelope.to_name, envelope.to_address
        );
    } else {
        result += &format!("<b>📫 {}</b>\n\n", envelope.to_address);
    }

    if !envelope.from_name.is_empty() {
        result += &format!(
            "<b>📨 {}</b>\t ({})\n\n",
            envelope.from_name, envelope.from_address
        );
    } else {
        result += &format!("<b>📨 {}</b>\n\n", envelope.from_address);
    }

    result += &format!("⏰ <b>{}</b>\n\n", envelope.display_date());
    result += &format!("📝 <b>{}</b>\n\n", envelope.subject);

    result
}

pub struct Formatter {
    file_root: PathBuf,
    max_text_message_size: usize,
}

impl Formatter {
    pub fn new(file_root: PathBuf, max_text_message_size: usize) -> Self {
        Self {
            file_root,
            max_text_message_size,
        }
    }

    /// A body is rasterised when the plain text form is missing, oversized,
    /// or when the HTML references inline `cid:` content the text cannot
    /// carry.
    pub fn needs_raster(&self, body: &MessageBody) -> bool {
        if body.text_plain.is_empty() {
            return true;
        }
        if body.text_plain.len() > self.max_text_message_size {
            return true;
        }
        if body.text_html.contains("src=\"cid:") {
            return true;
        }
        false
    }

    /// Builds the outbound payload: envelope block, then either the plain
    /// body appended to the text or the HTML rendered to an image, then one
    /// `📎` line per attachment.
    pub async fn format_message(
        &self,
        message: &Message,
        account_login: &str,
    ) -> MailHeraldResult<FormattedOutbound> {
        let mut text = format_envelope(&message.envelope);
        let mut image_path = None;

        if self.needs_raster(&message.body) {
            let dir =
                ensure_message_dir(&self.file_root, account_login, message.envelope.uid).await?;
            image_path = Some(html::render_html_to_png(&message.body.text_html, &dir).await?);
        } else {
            text += &message.body.text_plain;
        }

        let mut attachments = Vec::with_capacity(message.body.attachment_files.len());
        for attachment in &message.body.attachment_files {
            text += &format!("\n📎 {}", attachment.file_name);
            attachments.push(attachment.file_path.clone());
        }

        Ok(FormattedOutbound {
            text,
            image_path,
            attachments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::message::AttachmentFile;
    use std::path::Path;

    fn envelope() -> Envelope {
        Envelope {
            uid: 42,
            date: 1_754_389_800_000,
            subject: "Quarterly report".into(),
            from_address: "alice@example.com".into(),
            from_name: "Alice".into(),
            to_address: "bob@example.com".into(),
            to_name: "Bob".into(),
        }
    }

    fn formatter() -> Formatter {
        Formatter::new(PathBuf::from("/tmp/mailherald-test"), 4096)
    }

    #[test]
    fn envelope_block_with_names() {
        let text = format_envelope(&envelope());
        assert!(text.starts_with("<b>📫 Bob</b>\t (bob@example.com)\n\n"));
        assert!(text.contains("<b>📨 Alice</b>\t (alice@example.com)\n\n"));
        assert!(text.contains("📝 <b>Quarterly report</b>\n\n"));
    }

    #[test]
    fn envelope_block_without_names() {
        let mut bare = envelope();
        bare.from_name.clear();
        bare.to_name.clear();
        let text = format_envelope(&bare);
        assert!(text.starts_with("<b>📫 bob@example.com</b>\n\n"));
        assert!(text.contains("<b>📨 alice@example.com</b>\n\n"));
    }

    #[test]
    fn raster_mode_law() {
        let formatter = Formatter::new(PathBuf::from("/tmp"), 5);

        // empty plain text
        let mut body = MessageBody::default();
        body.text_html = "<p>hi</p>".into();
        assert!(formatter.needs_raster(&body));

        // short plain text, no cid
        body.text_plain = "hello".into();
        assert!(!formatter.needs_raster(&body));

        // oversized plain text (max + 1 bytes)
        body.text_plain = "hello!".into();
        assert!(formatter.needs_raster(&body));

        // inline cid reference
        body.text_plain = "hi".into();
        body.text_html = "<img src=\"cid:img1\">".into();
        assert!(formatter.needs_raster(&body));
    }

    #[tokio::test]
    async fn text_mode_appends_plain_body() {
        let message = Message {
            envelope: envelope(),
            body: MessageBody {
                text_plain: "hello".into(),
                text_html: "<p>hello</p>".into(),
                inline_files: vec![],
                attachment_files: vec![],
            },
        };

        let outbound = formatter()
            .format_message(&message, "bob@example.com")
            .await
            .unwrap();
        assert!(outbound.text.ends_with("hello"));
        assert!(outbound.image_path.is_none());
        assert!(outbound.attachments.is_empty());
    }

    #[tokio::test]
    async fn attachments_add_lines_and_paths() {
        let path = Path::new("/data/files/bob@example.com/42/report.pdf").to_path_buf();
        let message = Message {
            envelope: envelope(),
            body: MessageBody {
                text_plain: "hello".into(),
                text_html: String::new(),
                inline_files: vec![],
                attachment_files: vec![AttachmentFile {
                    file_name: "report.pdf".into(),
                    file_path: path.clone(),
                }],
            },
        };

        let outbound = formatter()
            .format_message(&message, "bob@example.com")
            .await
            .unwrap();
        assert!(outbound.text.contains("\n📎 report.pdf"));
        assert_eq!(outbound.attachments, vec![path]);
    }
}
