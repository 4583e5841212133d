//! Live queries over the ledger store.
//!
//! A [Subscription] yields the full result set of its query straight away and
//! then again after every write to the table the query reads. Subscribers
//! never see diffs, and never see a result older than one they already saw.
//! Several writes that land while a subscriber is busy are folded into one
//! snapshot that contains all of them.

use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::watch;

use crate::{
    Debt, Error, LedgerStore, SavingsGoal, Table, Transaction, TransactionKind,
    debt::get_all_debts, savings_goal::get_all_savings_goals, transaction::get_transactions,
};

/// An immutable, point-in-time copy of a query's result set.
pub type Snapshot<T> = Arc<[T]>;

/// A read over one table of the ledger that can be re-run whenever that table changes.
pub trait Query: Clone + Send + 'static {
    /// The record type the query returns.
    type Row: Send + Sync + 'static;

    /// The table whose writes can change the result.
    fn table(&self) -> Table;

    /// Run the query.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the read fails.
    fn fetch(&self, connection: &Connection) -> Result<Vec<Self::Row>, Error>;
}

/// Transactions, latest first, optionally only those of one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    /// Only include transactions of this kind. `None` includes all transactions.
    pub kind: Option<TransactionKind>,
}

impl Query for TransactionQuery {
    type Row = Transaction;

    fn table(&self) -> Table {
        Table::Transactions
    }

    fn fetch(&self, connection: &Connection) -> Result<Vec<Transaction>, Error> {
        get_transactions(self.kind, connection)
    }
}

/// All debts in the order they were recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebtQuery;

impl Query for DebtQuery {
    type Row = Debt;

    fn table(&self) -> Table {
        Table::Debts
    }

    fn fetch(&self, connection: &Connection) -> Result<Vec<Debt>, Error> {
        get_all_debts(connection)
    }
}

/// All savings goals in the order they were created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavingsGoalQuery;

impl Query for SavingsGoalQuery {
    type Row = SavingsGoal;

    fn table(&self) -> Table {
        Table::SavingsGoals
    }

    fn fetch(&self, connection: &Connection) -> Result<Vec<SavingsGoal>, Error> {
        get_all_savings_goals(connection)
    }
}

/// A live, restartable view of a [Query].
///
/// Dropping the subscription (or the future returned by [Subscription::next])
/// cancels it. Writes in flight are not affected.
#[derive(Debug)]
pub struct Subscription<Q: Query> {
    store: LedgerStore,
    query: Q,
    changes: watch::Receiver<u64>,
    last_version: Option<u64>,
    /// A change was taken from `changes` but no snapshot was emitted for it.
    unread: bool,
}

impl<Q: Query> Subscription<Q> {
    /// Subscribe to `query` on `store`.
    pub fn new(store: LedgerStore, query: Q) -> Self {
        let changes = store.watch(query.table());

        Self {
            store,
            query,
            changes,
            last_version: None,
            unread: false,
        }
    }

    /// Wait for the next snapshot.
    ///
    /// The first call returns the current result set without waiting. Later
    /// calls wait until a write to the query's table commits, then return the
    /// result set as of that write or later. A call after a failed read
    /// retries straight away.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the read fails. The subscription stays
    /// usable, see [Subscription::changed] for waiting before a retry.
    pub async fn next(&mut self) -> Result<Snapshot<Q::Row>, Error> {
        loop {
            if self.last_version.is_some() && !self.unread {
                self.changed().await?;
            }
            self.changes.borrow_and_update();
            self.unread = true;

            let store = self.store.clone();
            let query = self.query.clone();
            let (version, rows) = tokio::task::spawn_blocking(move || {
                store.read_versioned(query.table(), |connection| query.fetch(connection))
            })
            .await??;
            self.unread = false;

            if self.last_version.is_some_and(|last| version <= last) {
                continue;
            }

            self.last_version = Some(version);
            return Ok(rows.into());
        }
    }

    /// Wait until another write to the query's table commits.
    ///
    /// # Errors
    /// Returns an [Error::WriterClosed] if the store has gone away.
    pub async fn changed(&mut self) -> Result<(), Error> {
        self.changes
            .changed()
            .await
            .map_err(|_| Error::WriterClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Debt, DebtDirection, Error, LedgerStore, Transaction, TransactionBuilder, TransactionKind,
    };

    use super::{DebtQuery, Subscription, TransactionQuery};

    fn transaction(amount: f64, kind: TransactionKind) -> TransactionBuilder {
        Transaction::build(amount, kind, "Food", datetime!(2025-06-01 12:00 UTC))
    }

    /// Write a row the store cannot read back, without bumping the table version.
    fn insert_unknown_kind(connection: &Connection) {
        connection
            .execute(
                "INSERT INTO transactions (amount, category, date, note, type, paymentMethod)
                 VALUES (1.0, 'Food', 0, '', 'TRANSFER', '')",
                [],
            )
            .unwrap();
    }

    #[tokio::test]
    async fn first_snapshot_is_immediate() {
        let store = LedgerStore::open_in_memory().unwrap();
        store
            .insert_transaction(transaction(5.0, TransactionKind::Expense))
            .unwrap();
        let mut subscription = Subscription::new(store, TransactionQuery::default());

        let snapshot = tokio::time::timeout(Duration::from_secs(1), subscription.next())
            .await
            .expect("first snapshot should not wait for a write")
            .unwrap();

        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn write_triggers_new_snapshot() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut subscription = Subscription::new(store.clone(), TransactionQuery::default());
        assert!(subscription.next().await.unwrap().is_empty());

        let inserted = store
            .insert_transaction(transaction(5.0, TransactionKind::Expense))
            .unwrap();
        let snapshot = subscription.next().await.unwrap();

        assert_eq!(&snapshot[..], &[inserted]);
    }

    #[tokio::test]
    async fn burst_of_writes_is_never_missed() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut subscription = Subscription::new(store.clone(), TransactionQuery::default());
        subscription.next().await.unwrap();

        for amount in [1.0, 2.0, 3.0] {
            store
                .insert_transaction(transaction(amount, TransactionKind::Expense))
                .unwrap();
        }
        let snapshot = subscription.next().await.unwrap();

        assert_eq!(snapshot.len(), 3);
    }

    #[tokio::test]
    async fn subscribers_are_independent() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut first = Subscription::new(store.clone(), TransactionQuery::default());
        let mut second = Subscription::new(store.clone(), TransactionQuery::default());
        first.next().await.unwrap();

        store
            .insert_transaction(transaction(5.0, TransactionKind::Income))
            .unwrap();

        assert_eq!(first.next().await.unwrap().len(), 1);
        assert_eq!(second.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn kind_filter_applies_to_snapshots() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut income = Subscription::new(
            store.clone(),
            TransactionQuery {
                kind: Some(TransactionKind::Income),
            },
        );
        income.next().await.unwrap();

        store
            .insert_transaction(transaction(5.0, TransactionKind::Expense))
            .unwrap();
        store
            .insert_transaction(transaction(7.0, TransactionKind::Income))
            .unwrap();
        let snapshot = income.next().await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].amount, 7.0);
    }

    #[tokio::test]
    async fn writes_to_other_tables_do_not_wake_subscriber() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut debts = Subscription::new(store.clone(), DebtQuery);
        debts.next().await.unwrap();

        store
            .insert_transaction(transaction(5.0, TransactionKind::Expense))
            .unwrap();
        let result = tokio::time::timeout(Duration::from_millis(50), debts.next()).await;
        assert!(
            result.is_err(),
            "debt subscription woke for a transaction write"
        );

        store
            .insert_debt(Debt::build(
                "Sam",
                15.0,
                datetime!(2025-07-01 0:00 UTC),
                DebtDirection::OwedToUser,
            ))
            .unwrap();
        assert_eq!(debts.next().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dropping_a_subscription_leaves_writes_alone() {
        let store = LedgerStore::open_in_memory().unwrap();
        let mut subscription = Subscription::new(store.clone(), TransactionQuery::default());
        subscription.next().await.unwrap();
        drop(subscription);

        store
            .insert_transaction(transaction(5.0, TransactionKind::Expense))
            .unwrap();

        assert_eq!(store.transactions(None).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_first_read_waits_for_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let store = LedgerStore::open(&path).unwrap();
        insert_unknown_kind(&Connection::open(&path).unwrap());
        let mut subscription = Subscription::new(store.clone(), TransactionQuery::default());

        assert!(matches!(subscription.next().await, Err(Error::SqlError(_))));
        let waited = tokio::time::timeout(Duration::from_millis(50), subscription.changed()).await;
        assert!(waited.is_err(), "woke up without a write");

        store
            .insert_transaction(transaction(5.0, TransactionKind::Expense))
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), subscription.changed())
            .await
            .expect("a write should wake the subscription")
            .unwrap();
    }

    #[tokio::test]
    async fn read_after_failure_retries_without_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let store = LedgerStore::open(&path).unwrap();
        let raw = Connection::open(&path).unwrap();
        store
            .insert_transaction(transaction(5.0, TransactionKind::Expense))
            .unwrap();
        let mut subscription = Subscription::new(store.clone(), TransactionQuery::default());
        assert_eq!(subscription.next().await.unwrap().len(), 1);

        insert_unknown_kind(&raw);
        store
            .insert_transaction(transaction(6.0, TransactionKind::Expense))
            .unwrap();
        assert!(subscription.next().await.is_err());

        raw.execute("DELETE FROM transactions WHERE type = 'TRANSFER'", [])
            .unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(1), subscription.next())
            .await
            .expect("the write seen before the failure should be re-read")
            .unwrap();

        assert_eq!(snapshot.len(), 2);
    }
}
