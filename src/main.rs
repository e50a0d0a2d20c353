use mimalloc::MiMalloc;
use modules::{
    bot::BotTransport,
    common::signal::SignalManager,
    config::AppConfig,
    context::Initialize,
    database::manager::{DatabaseManager, DB_MANAGER},
    error::MailHeraldResult,
    imap::ImapGateway,
    ledger::Ledger,
    logger,
    render::Formatter,
    settings::cli::SETTINGS,
    settings::dir::{DataDirManager, DATA_DIR_MANAGER},
    supervisor::Supervisor,
};
use std::sync::Arc;
use tracing::info;

mod modules;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

static LOGO: &str = r#"
  __  __       _ _ _   _                _     _
 |  \/  | __ _(_) | | | | ___ _ __ __ _| | __| |
 | |\/| |/ _` | | | |_| |/ _ \ '__/ _` | |/ _` |
 | |  | | (_| | | |  _  |  __/ | | (_| | | (_| |
 |_|  |_|\__,_|_|_|_| |_|\___|_|  \__,_|_|\__,_|

"#;

#[tokio::main]
async fn main() -> MailHeraldResult<()> {
    logger::initialize_logging();
    info!("{}", LOGO);
    info!("Starting mailherald");
    info!("Version:  {}", mailherald_version!());

    let config = match AppConfig::load(&SETTINGS.mailherald_config_path) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{:?}", error);
            return Err(error);
        }
    };

    if let Err(error) = initialize().await {
        eprintln!("{:?}", error);
        return Err(error);
    }

    let file_root = config
        .app
        .file_directory
        .clone()
        .unwrap_or_else(|| DATA_DIR_MANAGER.files_dir.clone());

    let transport = Arc::new(BotTransport::new(&config.bot.token)?);
    let ledger = Arc::new(Ledger::new(DB_MANAGER.ledger_db().clone()));
    let gateway = Arc::new(ImapGateway::new(file_root.clone()));
    let formatter = Arc::new(Formatter::new(file_root, config.max_text_message_size()));

    Supervisor::new(&config, gateway, ledger, formatter, transport)
        .run()
        .await
}

/// Initialize the system by validating settings and starting necessary tasks.
async fn initialize() -> MailHeraldResult<()> {
    SignalManager::initialize().await?;
    DataDirManager::initialize().await?;
    DatabaseManager::initialize().await?;
    Ok(())
}
