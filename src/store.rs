//! The SQLite backed ledger store.
//!
//! All access goes through one connection behind a mutex, so writes are
//! applied one at a time and a reader sees either the whole of a write or
//! none of it. After each committed write the store bumps the version of the
//! table it touched, which is what live queries wait on.

use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;
use tokio::sync::watch;

use crate::{
    Error,
    db::{initialize, schema_version},
    debt::{Debt, DebtBuilder, create_debt, get_all_debts},
    savings_goal::{
        SavingsGoal, SavingsGoalBuilder, create_savings_goal, get_all_savings_goals,
        update_savings_goal,
    },
    transaction::{
        Transaction, TransactionBuilder, TransactionKind, create_transaction, get_transactions,
    },
};

/// A table in the ledger that live queries can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    /// Income and expense transactions.
    Transactions,
    /// Debts owed by or to the user.
    Debts,
    /// Savings goals.
    SavingsGoals,
}

/// One version counter per table, bumped after every committed write.
#[derive(Debug)]
struct ChangeFeed {
    transactions: watch::Sender<u64>,
    debts: watch::Sender<u64>,
    savings_goals: watch::Sender<u64>,
}

impl ChangeFeed {
    fn new() -> Self {
        Self {
            transactions: watch::Sender::new(0),
            debts: watch::Sender::new(0),
            savings_goals: watch::Sender::new(0),
        }
    }

    fn sender(&self, table: Table) -> &watch::Sender<u64> {
        match table {
            Table::Transactions => &self.transactions,
            Table::Debts => &self.debts,
            Table::SavingsGoals => &self.savings_goals,
        }
    }
}

/// Durable storage for transactions, debts and savings goals.
///
/// Cloning the store is cheap, clones share the same connection and change
/// feed. The methods block on database I/O, async callers should run them
/// with [tokio::task::spawn_blocking].
#[derive(Debug, Clone)]
pub struct LedgerStore {
    connection: Arc<Mutex<Connection>>,
    changes: Arc<ChangeFeed>,
}

impl LedgerStore {
    /// Open the ledger database at `path`, creating it if needed, and bring
    /// its schema up to date.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the file cannot be opened, or an
    /// [Error::MigrationFailed] if the schema cannot be upgraded.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        tracing::info!("opening ledger database at {path:?}");

        let connection = Connection::open(path)?;
        connection.busy_timeout(Duration::from_secs(5))?;

        Self::new(connection)
    }

    /// Open a ledger that lives only in memory.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Create a store for `connection`, migrating its schema first.
    ///
    /// # Errors
    /// Returns an [Error::MigrationFailed] if the schema cannot be upgraded.
    /// The store is not created in that case.
    pub fn new(mut connection: Connection) -> Result<Self, Error> {
        initialize(&mut connection)?;
        tracing::info!(
            "ledger database ready at schema version {}",
            schema_version(&connection)?
        );

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            changes: Arc::new(ChangeFeed::new()),
        })
    }

    /// Store a new transaction and return it with its assigned ID.
    ///
    /// # Errors
    /// Returns a validation error for an invalid builder, or an
    /// [Error::SqlError] if the write is rejected.
    pub fn insert_transaction(&self, builder: TransactionBuilder) -> Result<Transaction, Error> {
        let transaction = self.write(Table::Transactions, |connection| {
            create_transaction(builder, connection)
        })?;
        tracing::debug!("inserted transaction {}", transaction.id);

        Ok(transaction)
    }

    /// Store a new debt and return it with its assigned ID.
    ///
    /// # Errors
    /// Returns a validation error for an invalid builder, or an
    /// [Error::SqlError] if the write is rejected.
    pub fn insert_debt(&self, builder: DebtBuilder) -> Result<Debt, Error> {
        let debt = self.write(Table::Debts, |connection| create_debt(builder, connection))?;
        tracing::debug!("inserted debt {}", debt.id);

        Ok(debt)
    }

    /// Store a new savings goal and return it with its assigned ID.
    ///
    /// # Errors
    /// Returns a validation error for an invalid builder, or an
    /// [Error::SqlError] if the write is rejected.
    pub fn insert_savings_goal(&self, builder: SavingsGoalBuilder) -> Result<SavingsGoal, Error> {
        let goal = self.write(Table::SavingsGoals, |connection| {
            create_savings_goal(builder, connection)
        })?;
        tracing::debug!("inserted savings goal {}", goal.id);

        Ok(goal)
    }

    /// Replace the stored savings goal with the same ID as `goal`.
    ///
    /// # Returns
    /// The goal as stored, which may differ from `goal` by a trimmed name.
    ///
    /// # Errors
    /// Returns an [Error::UpdateMissingSavingsGoal] if there is no such goal.
    pub fn update_savings_goal(&self, goal: &SavingsGoal) -> Result<SavingsGoal, Error> {
        let stored = self.write(Table::SavingsGoals, |connection| {
            update_savings_goal(goal, connection)
        })?;
        tracing::debug!("updated savings goal {}", stored.id);

        Ok(stored)
    }

    /// All transactions, or only those of `kind`, latest first.
    ///
    /// Ties on the transaction instant are ordered by most recently inserted first.
    pub fn transactions(&self, kind: Option<TransactionKind>) -> Result<Vec<Transaction>, Error> {
        self.read(|connection| get_transactions(kind, connection))
    }

    /// All debts in the order they were recorded.
    pub fn debts(&self) -> Result<Vec<Debt>, Error> {
        self.read(get_all_debts)
    }

    /// All savings goals in the order they were created.
    pub fn savings_goals(&self) -> Result<Vec<SavingsGoal>, Error> {
        self.read(get_all_savings_goals)
    }

    /// Subscribe to the version counter of `table`.
    pub(crate) fn watch(&self, table: Table) -> watch::Receiver<u64> {
        self.changes.sender(table).subscribe()
    }

    /// Run `query` and return its result with the version of `table` it reflects.
    pub(crate) fn read_versioned<T>(
        &self,
        table: Table,
        query: impl FnOnce(&Connection) -> Result<T, Error>,
    ) -> Result<(u64, T), Error> {
        let connection = self.lock()?;
        let version = *self.changes.sender(table).borrow();

        Ok((version, query(&connection)?))
    }

    fn read<T>(&self, query: impl FnOnce(&Connection) -> Result<T, Error>) -> Result<T, Error> {
        let connection = self.lock()?;

        query(&connection)
    }

    /// Apply `write` while holding the connection, then announce the change.
    ///
    /// The version is bumped before the lock is released, so a reader that
    /// sees the new rows also sees the new version.
    fn write<T>(
        &self,
        table: Table,
        write: impl FnOnce(&Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let connection = self.lock()?;
        let result = write(&connection)?;

        self.changes
            .sender(table)
            .send_modify(|version| *version += 1);

        Ok(result)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLockError)
    }
}
