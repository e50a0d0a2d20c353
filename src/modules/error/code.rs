// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    InvalidParameter = 10000,
    MissingConfiguration = 10020,
    ConfigLoadFailed = 10030,

    // Network connection errors (40000–40999)
    NetworkError = 40000,

    // Mail service errors (50000–50999)
    ImapConnectFailed = 50000,
    ImapAuthenticationFailed = 50010,
    ImapSelectFailed = 50020,
    ImapSearchFailed = 50030,
    ImapFetchFailed = 50040,
    MessageNotFound = 50050,
    MimeDecodeFailed = 50060,

    // Chat transport errors (60000–60999)
    ChatSendFailed = 60000,
    ChatEditFailed = 60010,
    ChatUpdatesFailed = 60020,

    // Internal system errors (70000–70999)
    InternalError = 70000,
    LedgerReadFailed = 70010,
    LedgerWriteFailed = 70020,
    FileWriteFailed = 70030,
    HtmlRenderFailed = 70040,
}
