//! The ledger facade: named live views plus write commands.
//!
//! Writes for each entity kind go through their own writer task, so two
//! `add_transaction` calls are applied in the order they were made even when
//! the caller does not wait for the first before issuing the second. Writes
//! to different kinds do not wait on each other.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::{mpsc, oneshot};

use crate::{
    Debt, DebtBuilder, Error, LedgerStore, SavingsGoal, SavingsGoalBuilder, SessionToken, Table,
    Transaction, TransactionBuilder, TransactionKind,
    live_query::{DebtQuery, SavingsGoalQuery, Subscription, TransactionQuery},
    mirror::{RemoteLedger, SyncMirror},
};

type WriteJob = Box<dyn FnOnce(&LedgerStore) + Send>;

/// The result of a write command that has been queued.
///
/// The write goes ahead whether or not this future is awaited. Awaiting it
/// gives the stored record, or the reason the write failed.
#[derive(Debug)]
#[must_use = "the write is queued either way, await this to learn whether it succeeded"]
pub struct PendingWrite<T> {
    receiver: oneshot::Receiver<Result<T, Error>>,
}

impl<T> PendingWrite<T> {
    fn failed(error: Error) -> Self {
        let (respond, receiver) = oneshot::channel();
        let _ = respond.send(Err(error));

        Self { receiver }
    }
}

impl<T> Future for PendingWrite<T> {
    type Output = Result<T, Error>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(Error::WriterClosed)))
    }
}

/// Applies the writes for one table one at a time, in the order they were queued.
#[derive(Debug, Clone)]
struct Writer {
    table: Table,
    jobs: mpsc::UnboundedSender<WriteJob>,
}

impl Writer {
    fn spawn(table: Table, store: LedgerStore) -> Self {
        let (jobs, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(table, store, receiver));

        Self { table, jobs }
    }

    fn submit<T, F>(&self, write: F) -> PendingWrite<T>
    where
        T: Send + 'static,
        F: FnOnce(&LedgerStore) -> Result<T, Error> + Send + 'static,
    {
        let (respond, receiver) = oneshot::channel();
        let job: WriteJob = Box::new(move |store| {
            let _ = respond.send(write(store));
        });

        if self.jobs.send(job).is_err() {
            tracing::error!("the {:?} writer has stopped, dropping write", self.table);
        }

        PendingWrite { receiver }
    }
}

async fn run_writer(table: Table, store: LedgerStore, mut jobs: mpsc::UnboundedReceiver<WriteJob>) {
    while let Some(job) = jobs.recv().await {
        let store = store.clone();

        if let Err(error) = tokio::task::spawn_blocking(move || job(&store)).await {
            tracing::error!("a {table:?} write panicked: {error}");
        }
    }

    tracing::debug!("{table:?} writer stopped");
}

/// Live views of the ledger and the commands that change it.
///
/// Cloning the facade is cheap, clones share the same writers.
#[derive(Debug)]
pub struct LedgerFacade<R> {
    store: LedgerStore,
    mirror: SyncMirror<R>,
    transactions: Writer,
    debts: Writer,
    savings_goals: Writer,
}

impl<R> Clone for LedgerFacade<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mirror: self.mirror.clone(),
            transactions: self.transactions.clone(),
            debts: self.debts.clone(),
            savings_goals: self.savings_goals.clone(),
        }
    }
}

impl<R: RemoteLedger> LedgerFacade<R> {
    /// Create a facade over `store` that mirrors new transactions with `mirror`.
    ///
    /// Must be called from within a tokio runtime, the writers run as tasks on it.
    pub fn new(store: LedgerStore, mirror: SyncMirror<R>) -> Self {
        Self {
            transactions: Writer::spawn(Table::Transactions, store.clone()),
            debts: Writer::spawn(Table::Debts, store.clone()),
            savings_goals: Writer::spawn(Table::SavingsGoals, store.clone()),
            store,
            mirror,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// The mirror new transactions are sent through.
    pub fn mirror(&self) -> &SyncMirror<R> {
        &self.mirror
    }

    /// Queue a new transaction.
    ///
    /// Once the transaction is stored it is mirrored to the remote ledger in
    /// the background. The mirror cannot fail or undo the insert.
    ///
    /// # Errors
    /// The returned future resolves to an [Error::SessionExpired] if `session`
    /// has expired, a validation error for an invalid builder, or an
    /// [Error::SqlError] if the store rejects the write.
    pub fn add_transaction(
        &self,
        session: &SessionToken,
        builder: TransactionBuilder,
    ) -> PendingWrite<Transaction> {
        if let Err(error) = session.ensure_valid() {
            return PendingWrite::failed(error);
        }

        let mirror = self.mirror.clone();
        self.transactions.submit(move |store| {
            let transaction = store.insert_transaction(builder)?;
            mirror.mirror(&transaction);

            Ok(transaction)
        })
    }

    /// Queue a new debt.
    ///
    /// # Errors
    /// The returned future resolves to an [Error::SessionExpired] if `session`
    /// has expired, or an error from [LedgerStore::insert_debt].
    pub fn add_debt(&self, session: &SessionToken, builder: DebtBuilder) -> PendingWrite<Debt> {
        if let Err(error) = session.ensure_valid() {
            return PendingWrite::failed(error);
        }

        self.debts.submit(move |store| store.insert_debt(builder))
    }

    /// Queue a new savings goal.
    ///
    /// # Errors
    /// The returned future resolves to an [Error::SessionExpired] if `session`
    /// has expired, or an error from [LedgerStore::insert_savings_goal].
    pub fn add_savings_goal(
        &self,
        session: &SessionToken,
        builder: SavingsGoalBuilder,
    ) -> PendingWrite<SavingsGoal> {
        if let Err(error) = session.ensure_valid() {
            return PendingWrite::failed(error);
        }

        self.savings_goals
            .submit(move |store| store.insert_savings_goal(builder))
    }

    /// Queue an update that replaces the stored goal with the same ID as `goal`.
    ///
    /// # Errors
    /// The returned future resolves to an [Error::SessionExpired] if `session`
    /// has expired, or an [Error::UpdateMissingSavingsGoal] if there is no
    /// such goal.
    pub fn update_savings_goal(
        &self,
        session: &SessionToken,
        goal: SavingsGoal,
    ) -> PendingWrite<SavingsGoal> {
        if let Err(error) = session.ensure_valid() {
            return PendingWrite::failed(error);
        }

        self.savings_goals
            .submit(move |store| store.update_savings_goal(&goal))
    }

    /// All transactions, latest first.
    pub fn all_transactions(&self) -> Subscription<TransactionQuery> {
        Subscription::new(self.store.clone(), TransactionQuery { kind: None })
    }

    /// Expenses only, latest first.
    pub fn expenses(&self) -> Subscription<TransactionQuery> {
        Subscription::new(
            self.store.clone(),
            TransactionQuery {
                kind: Some(TransactionKind::Expense),
            },
        )
    }

    /// Income only, latest first.
    pub fn income(&self) -> Subscription<TransactionQuery> {
        Subscription::new(
            self.store.clone(),
            TransactionQuery {
                kind: Some(TransactionKind::Income),
            },
        )
    }

    /// All debts in the order they were recorded.
    pub fn debts(&self) -> Subscription<DebtQuery> {
        Subscription::new(self.store.clone(), DebtQuery)
    }

    /// All savings goals in the order they were created.
    pub fn savings_goals(&self) -> Subscription<SavingsGoalQuery> {
        Subscription::new(self.store.clone(), SavingsGoalQuery)
    }
}
