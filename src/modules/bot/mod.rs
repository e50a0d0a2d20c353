// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::bot::keyboard::InlineKeyboard;
use crate::modules::error::{code::ErrorCode, MailHeraldResult};
use crate::raise_error;
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::Duration;

pub mod keyboard;
pub mod updates;

// getUpdates long-polls for up to LONG_POLL_SECONDS; the HTTP timeout must
// sit comfortably above it.
const LONG_POLL_SECONDS: u64 = 30;
const HTTP_TIMEOUT: Duration = Duration::from_secs(90);

/// Handle to a sent chat message, usable for later edit/delete.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageHandle {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiReply<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    chat: Chat,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    pub message: Option<CallbackMessage>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMessage {
    pub message_id: i64,
    pub chat: Chat,
}

/// Thin façade over the Telegram bot HTTP API. Single attempt per call, no
/// retries; callers log failures and decide what the abort scope is. The
/// client is cheap to clone and safe to share across tasks.
pub struct BotTransport {
    http: reqwest::Client,
    base_url: String,
}

impl BotTransport {
    pub fn new(token: &str) -> MailHeraldResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(Self {
            http,
            base_url: format!("https://api.telegram.org/bot{}", token),
        })
    }

    pub async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> MailHeraldResult<MessageHandle> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
        });
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = keyboard.markup();
        }
        let sent: SentMessage = self
            .call("sendMessage", &payload, ErrorCode::ChatSendFailed)
            .await?;
        Ok(MessageHandle {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }

    pub async fn send_photo(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> MailHeraldResult<MessageHandle> {
        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "HTML");
        form = form.part("photo", file_part(path).await?);
        self.upload("sendPhoto", form).await
    }

    pub async fn send_document(&self, chat_id: i64, path: &Path) -> MailHeraldResult<MessageHandle> {
        let mut form = multipart::Form::new().text("chat_id", chat_id.to_string());
        form = form.part("document", file_part(path).await?);
        self.upload("sendDocument", form).await
    }

    pub async fn edit_text(&self, handle: MessageHandle, text: &str) -> MailHeraldResult<()> {
        let payload = json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id,
            "text": text,
            "parse_mode": "HTML",
        });
        let _: serde_json::Value = self
            .call("editMessageText", &payload, ErrorCode::ChatEditFailed)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, handle: MessageHandle) -> MailHeraldResult<()> {
        let payload = json!({
            "chat_id": handle.chat_id,
            "message_id": handle.message_id,
        });
        let _: serde_json::Value = self
            .call("deleteMessage", &payload, ErrorCode::ChatEditFailed)
            .await?;
        Ok(())
    }

    /// Stops the client-side button spinner; called for every callback,
    /// including ones that end up as no-ops.
    pub async fn answer_callback(&self, callback_id: &str) -> MailHeraldResult<()> {
        let payload = json!({ "callback_query_id": callback_id });
        let _: serde_json::Value = self
            .call("answerCallbackQuery", &payload, ErrorCode::ChatSendFailed)
            .await?;
        Ok(())
    }

    pub async fn get_updates(&self, offset: i64) -> MailHeraldResult<Vec<Update>> {
        let payload = json!({
            "offset": offset,
            "timeout": LONG_POLL_SECONDS,
            "allowed_updates": ["callback_query"],
        });
        self.call("getUpdates", &payload, ErrorCode::ChatUpdatesFailed)
            .await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
        code: ErrorCode,
    ) -> MailHeraldResult<T> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .json(payload)
            .send()
            .await
            .map_err(|e| raise_error!(format!("chat api {}: {}", method, e), code))?;
        let reply: ApiReply<T> = response
            .json()
            .await
            .map_err(|e| raise_error!(format!("chat api {}: {}", method, e), code))?;
        into_result(method, reply, code)
    }

    async fn upload(
        &self,
        method: &str,
        form: multipart::Form,
    ) -> MailHeraldResult<MessageHandle> {
        let response = self
            .http
            .post(format!("{}/{}", self.base_url, method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                raise_error!(
                    format!("chat api {}: {}", method, e),
                    ErrorCode::ChatSendFailed
                )
            })?;
        let reply: ApiReply<SentMessage> = response.json().await.map_err(|e| {
            raise_error!(
                format!("chat api {}: {}", method, e),
                ErrorCode::ChatSendFailed
            )
        })?;
        let sent = into_result(method, reply, ErrorCode::ChatSendFailed)?;
        Ok(MessageHandle {
            chat_id: sent.chat.id,
            message_id: sent.message_id,
        })
    }
}

fn into_result<T>(method: &str, reply: ApiReply<T>, code: ErrorCode) -> MailHeraldResult<T> {
    if !reply.ok {
        return Err(raise_error!(
            format!(
                "chat api {} failed: {}",
                method,
                reply.description.unwrap_or_default()
            ),
            code
        ));
    }
    reply.result.ok_or_else(|| {
        raise_error!(
            format!("chat api {} returned no result", method),
            code
        )
    })
}

async fn file_part(path: &Path) -> MailHeraldResult<multipart::Part> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file")
        .to_string();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        raise_error!(
            format!("failed to read {}: {}", path.display(), e),
            ErrorCode::ChatSendFailed
        )
    })?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    multipart::Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime.as_ref())
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ChatSendFailed))
}
