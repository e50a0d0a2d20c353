// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod decode;

/// Message metadata sans body. `date` is UNIX epoch milliseconds.
///
/// Only the first `From` and first `To` address are retained; empty
/// `from_name`/`to_name` means the header carried no display name.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Envelope {
    pub uid: u32,
    pub date: i64,
    pub subject: String,
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
    pub to_name: String,
}

impl Envelope {
    /// Local-time display form used in outbound chat text.
    pub fn display_date(&self) -> String {
        match Local.timestamp_millis_opt(self.date).single() {
            Some(date) => date.format("%Y-%m-%d %H:%M").to_string(),
            None => String::new(),
        }
    }
}

/// MIME part referenced from the HTML body by `cid:<attachment_id>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InlineFile {
    pub file_name: String,
    pub file_path: PathBuf,
    pub attachment_id: String,
}

/// Non-inline MIME part offered as a downloadable file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttachmentFile {
    pub file_name: String,
    pub file_path: PathBuf,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MessageBody {
    pub text_plain: String,
    pub text_html: String,
    pub inline_files: Vec<InlineFile>,
    pub attachment_files: Vec<AttachmentFile>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub envelope: Envelope,
    pub body: MessageBody,
}
