//! Pocket Ledger is the local-first core of a personal household finance
//! tracker.
//!
//! The crate owns the durable ledger of transactions, debts and savings goals,
//! pushes live snapshots of that ledger to observers, mirrors new transactions
//! to a remote backup on a best-effort basis, and derives reports (category
//! totals, budget utilization, chart shares) from ledger snapshots.
//!
//! Screens, authentication and app wiring live outside this crate. They talk to
//! the ledger through [SessionState] (or [LedgerFacade] directly) and must
//! present a [SessionToken] issued by the authentication layer.

#![warn(missing_docs)]

pub mod config;
pub mod dashboard;
mod database_id;
pub mod db;
mod debt;
mod ledger;
pub mod live_query;
pub mod logging;
pub mod mirror;
mod savings_goal;
mod session;
pub mod settings;
mod store;
mod timestamp;
mod transaction;

pub use config::LedgerConfig;
pub use debt::{Debt, DebtBuilder, DebtDirection, DebtId};
pub use ledger::{LedgerFacade, PendingWrite};
pub use savings_goal::{SavingsGoal, SavingsGoalBuilder, SavingsGoalId};
pub use session::{Observer, SessionState, SessionToken};
pub use store::{LedgerStore, Table};
pub use transaction::{
    Frequency, Tags, Transaction, TransactionBuilder, TransactionId, TransactionKind,
};

/// The errors that may occur in the ledger core.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An amount that must be positive was zero, negative or not a number.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    InvalidAmount(f64),

    /// The amount saved towards a goal was negative or not a number.
    #[error("{0} is not a valid saved amount, it must be zero or more")]
    InvalidSavedAmount(f64),

    /// A transaction was created with an empty category.
    #[error("category cannot be empty")]
    EmptyCategory,

    /// A debt or savings goal was created with an empty name.
    #[error("name cannot be empty")]
    EmptyName,

    /// A tag contained the tag separator.
    ///
    /// Tags are persisted as a comma separated list, so a comma inside a tag
    /// cannot be stored without corrupting its neighbours.
    #[error("the tag \"{0}\" contains a comma, which is not allowed")]
    InvalidTag(String),

    /// The transaction kind column held a value other than `INCOME` or `EXPENSE`.
    #[error("unknown transaction kind \"{0}\"")]
    UnknownTransactionKind(String),

    /// The recurrence column held a value other than `WEEKLY` or `MONTHLY`.
    #[error("unknown recurrence frequency \"{0}\"")]
    UnknownFrequency(String),

    /// The debt type column held a value other than `OWE` or `OWED`.
    #[error("unknown debt direction \"{0}\"")]
    UnknownDebtDirection(String),

    /// The requested record was not found.
    #[error("the requested record could not be found")]
    NotFound,

    /// Tried to update a savings goal that does not exist.
    #[error("tried to update a savings goal that is not in the database")]
    UpdateMissingSavingsGoal,

    /// A schema migration step could not be applied.
    ///
    /// The whole upgrade is rolled back, the store refuses to open.
    #[error("could not migrate the database to schema version {version}: {reason}")]
    MigrationFailed {
        /// The schema version whose step failed.
        version: u32,
        /// The underlying database error as text.
        reason: String,
    },

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// A blocking database task panicked or was cancelled.
    #[error("a background ledger task failed: {0}")]
    BackgroundTask(String),

    /// The writer for an entity kind has shut down and can no longer accept commands.
    #[error("the ledger writer has shut down")]
    WriterClosed,

    /// A command was issued with a session token that has expired.
    #[error("the session has expired, sign in again")]
    SessionExpired,

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The settings file could not be read or written.
    #[error("could not access the settings file: {0}")]
    SettingsIo(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Error::BackgroundTask(value.to_string())
    }
}
