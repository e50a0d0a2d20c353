// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod bot;
pub mod common;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod imap;
pub mod ledger;
pub mod logger;
pub mod message;
pub mod reader;
pub mod render;
pub mod scheduler;
pub mod settings;
pub mod supervisor;
pub mod utils;
