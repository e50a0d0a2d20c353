use crate::modules::context::Initialize;
use crate::modules::database::LEDGER_MODELS;
use crate::modules::error::{code::ErrorCode, MailHeraldError, MailHeraldResult};
use crate::modules::settings::dir::DATA_DIR_MANAGER;
use crate::raise_error;
use native_db::{Builder, Database};
use std::sync::{Arc, LazyLock};
use tracing::info;

pub static DB_MANAGER: LazyLock<DatabaseManager> = LazyLock::new(DatabaseManager::new);

pub struct DatabaseManager {
    /// Ledger database instance
    ledger_db: Arc<Database<'static>>,
}

impl DatabaseManager {
    fn new() -> Self {
        let ledger_db =
            Self::init_ledger_database().expect("Failed to initialize ledger database");
        DatabaseManager { ledger_db }
    }

    /// Get a reference to the ledger database
    pub fn ledger_db(&self) -> &Arc<Database<'static>> {
        &self.ledger_db
    }

    fn init_ledger_database() -> MailHeraldResult<Arc<Database<'static>>> {
        info!(
            "Initializing ledger database at: {:?}",
            &DATA_DIR_MANAGER.ledger_db
        );

        let mut database = Builder::new()
            .create(&LEDGER_MODELS, DATA_DIR_MANAGER.ledger_db.clone())
            .map_err(Self::handle_database_error)?;
        database
            .compact()
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(Arc::new(database))
    }

    fn handle_database_error(error: native_db::db_type::Error) -> MailHeraldError {
        match error {
            native_db::db_type::Error::RedbDatabaseError(database_error) => match database_error {
                redb::DatabaseError::DatabaseAlreadyOpen => {
                    raise_error!(
                        "Database is already open by another instance".into(),
                        ErrorCode::InternalError
                    )
                }
                other => {
                    raise_error!(
                        format!("Database error: {:?}", other),
                        ErrorCode::InternalError
                    )
                }
            },
            other => {
                raise_error!(
                    format!("Failed to create database: {:?}", other),
                    ErrorCode::InternalError
                )
            }
        }
    }
}

impl Initialize for DatabaseManager {
    async fn initialize() -> MailHeraldResult<()> {
        LazyLock::force(&DB_MANAGER);
        Ok(())
    }
}
