// Copyright © 2025 mailherald.dev
// Licensed under MailHerald License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::Parser;
use std::sync::LazyLock;

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "mailherald",
    about = "A bridge that watches IMAP mailboxes for unseen mail and announces
    each envelope to Telegram chats, with inline buttons to pull the rendered body on demand.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// mailherald log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for mailherald"
    )]
    pub mailherald_log_level: String,

    /// Path to the accounts/bot configuration file
    #[clap(
        long,
        default_value = "config/mailherald.json",
        env,
        help = "Path to the JSON configuration file holding accounts, bot token and app options"
    )]
    pub mailherald_config_path: String,

    /// Root data directory (ledger database, attachment cache, logs)
    #[clap(
        long,
        default_value = "mailherald_data",
        env,
        help = "Set the root data directory for mailherald"
    )]
    pub mailherald_root_dir: String,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub mailherald_ansi_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub mailherald_log_to_file: bool,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of rotated log files to keep"
    )]
    pub mailherald_max_log_files: usize,

    /// Mailbox scan interval in seconds (default: 60)
    #[clap(
        long,
        default_value = "60",
        env,
        help = "Interval in seconds between unseen-mail scans, per account",
        value_parser = clap::value_parser!(u64).range(5..)
    )]
    pub mailherald_poll_interval_seconds: u64,

    /// Executable used to rasterise HTML bodies to PNG
    #[clap(
        long,
        default_value = "wkhtmltoimage",
        env,
        help = "Executable invoked to convert an HTML body into a PNG image"
    )]
    pub mailherald_html_render_bin: String,
}

impl Settings {
    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            mailherald_log_level: "info".to_string(),
            mailherald_config_path: "config/mailherald.json".to_string(),
            mailherald_root_dir: std::env::temp_dir()
                .join("mailherald_test_data")
                .to_string_lossy()
                .into_owned(),
            mailherald_ansi_logs: false,
            mailherald_log_to_file: false,
            mailherald_max_log_files: 5,
            mailherald_poll_interval_seconds: 60,
            mailherald_html_render_bin: "wkhtmltoimage".to_string(),
        }
    }
}
