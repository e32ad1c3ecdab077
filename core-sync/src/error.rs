use bridge_traits::error::BridgeError;
use core_ledger::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Public token exchange failed: {0}")]
    CredentialExchange(#[source] BridgeError),

    #[error("Validation failed: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Provider call {method} failed: {source}")]
    Provider {
        method: &'static str,
        #[source]
        source: BridgeError,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Item {item_id} not found")]
    ItemNotFound { item_id: String },

    #[error("Account {account_id} not found")]
    AccountNotFound { account_id: String },

    #[error("Sync already in progress for item {item_id}")]
    SyncInProgress { item_id: String },

    #[error("Downstream sync of account {account_id} failed: {source}")]
    AccountSync {
        account_id: String,
        #[source]
        source: BridgeError,
    },

    #[error("Scheduler error: {0}")]
    Scheduler(#[source] BridgeError),
}

impl SyncError {
    pub(crate) fn provider(method: &'static str, source: BridgeError) -> Self {
        Self::Provider { method, source }
    }

    /// Surface ledger input validation as a sync validation failure.
    pub(crate) fn from_ledger_input(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidInput { field, message } => Self::Validation { field, message },
            other => Self::Ledger(other),
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Ledger(LedgerError::Database(err))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
