//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database. Every
//! collection is a table of JSON documents keyed by a string.

use redb::{Database, TableDefinition};
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;

/// Category documents
///
/// Key: document id (24 hex chars)
/// Value: JSON-serialized `Category`
pub const TABLE_CATALOGUE: TableDefinition<&str, &str> = TableDefinition::new("catalogue_v1");

/// Item documents
///
/// Key: document id (24 hex chars)
/// Value: JSON-serialized `Item`
pub const TABLE_ITEMS: TableDefinition<&str, &str> = TableDefinition::new("items_v1");

/// Secondary index of items by category reference
///
/// Key: composite key in format "{category_id}:{created_at_micros:020}:{item_id}"
/// Value: item id
///
/// Example:
/// - Key: "65a1f0c2e4b0a1b2c3d4e5f6:00001705501234567890:65a1f0d9e4b0a1b2c3d4e5f7"
/// - Value: "65a1f0d9e4b0a1b2c3d4e5f7"
///
/// The zero-padded timestamp keeps keys of one category in creation order.
pub const TABLE_ITEM_CATEGORY_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("item_category_index_v1");

/// Dashboard accounts
///
/// Key: username
/// Value: JSON-serialized `AdminUser`
pub const TABLE_ADMIN_USERS: TableDefinition<&str, &str> = TableDefinition::new("admin_users_v1");

/// Login sessions
///
/// Key: session token
/// Value: JSON-serialized `Session`
pub const TABLE_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions_v1");

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] redb::DatabaseError),
    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),
    #[error(transparent)]
    Table(#[from] redb::TableError),
    #[error(transparent)]
    Storage(#[from] redb::StorageError),
    #[error(transparent)]
    Commit(#[from] redb::CommitError),
    #[error("document codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,
    /// Runtime settings (upload directory, session lifetime, cookie flags)
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }
}

/// Initializes the embedded database and creates required tables
///
/// Creates or opens the database file at `db_path`, opens every table once
/// so read transactions never hit a missing table, then commits.
///
/// # Example
///
/// ```no_run
/// # use jewellery_catalogue::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> StoreResult<Database> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_CATALOGUE)?;
        write_txn.open_table(TABLE_ITEMS)?;
        write_txn.open_table(TABLE_ITEM_CATEGORY_INDEX)?;
        write_txn.open_table(TABLE_ADMIN_USERS)?;
        write_txn.open_table(TABLE_SESSIONS)?;
    }
    write_txn.commit()?;

    Ok(db)
}
