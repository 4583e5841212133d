//! The latest ledger views, kept for whoever is observing the session.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{sync::watch, task::AbortHandle};

use crate::{
    Debt, DebtBuilder, Error, LedgerFacade, PendingWrite, SavingsGoal, SavingsGoalBuilder,
    SessionToken, Transaction, TransactionBuilder,
    dashboard::{BudgetLimits, Report},
    live_query::{Query, Snapshot, Subscription},
    mirror::RemoteLedger,
};

/// Which forwarding tasks are running and who is watching.
#[derive(Debug, Default)]
struct Lifecycle {
    observers: usize,
    /// Bumped on every attach and detach so a stale teardown can tell it lost the race.
    generation: u64,
    tasks: Vec<AbortHandle>,
}

#[derive(Debug)]
struct Inner<R> {
    facade: LedgerFacade<R>,
    grace: Duration,
    transactions: watch::Sender<Snapshot<Transaction>>,
    expenses: watch::Sender<Snapshot<Transaction>>,
    income: watch::Sender<Snapshot<Transaction>>,
    debts: watch::Sender<Snapshot<Debt>>,
    savings_goals: watch::Sender<Snapshot<SavingsGoal>>,
    lifecycle: Mutex<Lifecycle>,
}

impl<R> Inner<R> {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        match self.lifecycle.lock() {
            Ok(lifecycle) => lifecycle,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<R> Drop for Inner<R> {
    fn drop(&mut self) {
        for task in self.lifecycle().tasks.drain(..) {
            task.abort();
        }
    }
}

/// Holds the latest value of every ledger view for UI collaborators.
///
/// Views are kept up to date only while at least one [Observer] is alive.
/// When the last observer goes away the live queries keep running for a grace
/// period, so a consumer that detaches and quickly reattaches does not restart
/// them. Values are kept after teardown and refreshed on the next attach.
///
/// Cloning the state is cheap, clones share the same views.
#[derive(Debug)]
pub struct SessionState<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for SessionState<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteLedger> SessionState<R> {
    /// Create session state over `facade`, tearing views down `grace` after
    /// the last observer leaves.
    pub fn new(facade: LedgerFacade<R>, grace: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                facade,
                grace,
                transactions: watch::Sender::new(empty()),
                expenses: watch::Sender::new(empty()),
                income: watch::Sender::new(empty()),
                debts: watch::Sender::new(empty()),
                savings_goals: watch::Sender::new(empty()),
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        }
    }

    /// Start observing the ledger views.
    ///
    /// The views stay live for as long as the returned guard is held.
    ///
    /// # Errors
    /// Returns an [Error::SessionExpired] if `session` has expired.
    pub fn observe(&self, session: &SessionToken) -> Result<Observer<R>, Error> {
        session.ensure_valid()?;

        let mut lifecycle = self.inner.lifecycle();
        lifecycle.observers += 1;
        lifecycle.generation += 1;

        if lifecycle.tasks.is_empty() {
            tracing::debug!("starting session views");
            lifecycle.tasks = self.start_views();
        }

        Ok(Observer {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Whether the live queries behind the views are running.
    pub fn is_live(&self) -> bool {
        !self.inner.lifecycle().tasks.is_empty()
    }

    /// The number of observers currently attached.
    pub fn observer_count(&self) -> usize {
        self.inner.lifecycle().observers
    }

    /// All transactions, latest first.
    pub fn transactions(&self) -> watch::Receiver<Snapshot<Transaction>> {
        self.inner.transactions.subscribe()
    }

    /// Expenses only, latest first.
    pub fn expenses(&self) -> watch::Receiver<Snapshot<Transaction>> {
        self.inner.expenses.subscribe()
    }

    /// Income only, latest first.
    pub fn income(&self) -> watch::Receiver<Snapshot<Transaction>> {
        self.inner.income.subscribe()
    }

    /// Debts in the order they were recorded.
    pub fn debts(&self) -> watch::Receiver<Snapshot<Debt>> {
        self.inner.debts.subscribe()
    }

    /// Savings goals in the order they were created.
    pub fn savings_goals(&self) -> watch::Receiver<Snapshot<SavingsGoal>> {
        self.inner.savings_goals.subscribe()
    }

    /// Compute the dashboard report from the latest expense and income views.
    pub fn report(&self, limits: &BudgetLimits) -> Report {
        let expenses = self.inner.expenses.borrow().clone();
        let income = self.inner.income.borrow().clone();

        Report::from_snapshots(&expenses, &income, limits)
    }

    /// Forward [LedgerFacade::add_transaction].
    pub fn add_transaction(
        &self,
        session: &SessionToken,
        builder: TransactionBuilder,
    ) -> PendingWrite<Transaction> {
        self.inner.facade.add_transaction(session, builder)
    }

    /// Forward [LedgerFacade::add_debt].
    pub fn add_debt(&self, session: &SessionToken, builder: DebtBuilder) -> PendingWrite<Debt> {
        self.inner.facade.add_debt(session, builder)
    }

    /// Forward [LedgerFacade::add_savings_goal].
    pub fn add_savings_goal(
        &self,
        session: &SessionToken,
        builder: SavingsGoalBuilder,
    ) -> PendingWrite<SavingsGoal> {
        self.inner.facade.add_savings_goal(session, builder)
    }

    /// Forward [LedgerFacade::update_savings_goal].
    pub fn update_savings_goal(
        &self,
        session: &SessionToken,
        goal: SavingsGoal,
    ) -> PendingWrite<SavingsGoal> {
        self.inner.facade.update_savings_goal(session, goal)
    }

    fn start_views(&self) -> Vec<AbortHandle> {
        let facade = &self.inner.facade;

        vec![
            forward(facade.all_transactions(), self.inner.transactions.clone()),
            forward(facade.expenses(), self.inner.expenses.clone()),
            forward(facade.income(), self.inner.income.clone()),
            forward(facade.debts(), self.inner.debts.clone()),
            forward(facade.savings_goals(), self.inner.savings_goals.clone()),
        ]
    }
}

/// Keeps the session views live while held.
///
/// Dropping the last observer schedules teardown after the grace period.
#[derive(Debug)]
pub struct Observer<R: RemoteLedger> {
    inner: Arc<Inner<R>>,
}

impl<R: RemoteLedger> Drop for Observer<R> {
    fn drop(&mut self) {
        let generation = {
            let mut lifecycle = self.inner.lifecycle();
            lifecycle.observers = lifecycle.observers.saturating_sub(1);
            if lifecycle.observers > 0 {
                return;
            }

            lifecycle.generation += 1;
            lifecycle.generation
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            teardown(&self.inner, generation);
            return;
        };

        let inner = Arc::downgrade(&self.inner);
        let grace = self.inner.grace;
        runtime.spawn(async move {
            tokio::time::sleep(grace).await;

            if let Some(inner) = inner.upgrade() {
                teardown(&inner, generation);
            }
        });
    }
}

/// Stop the views unless someone attached since `generation` was taken.
fn teardown<R>(inner: &Inner<R>, generation: u64) {
    let mut lifecycle = inner.lifecycle();
    if lifecycle.observers > 0 || lifecycle.generation != generation {
        return;
    }

    for task in lifecycle.tasks.drain(..) {
        task.abort();
    }
    tracing::debug!("stopped session views after grace period");
}

fn empty<T>() -> Snapshot<T> {
    Arc::from(Vec::new())
}

/// Copy every snapshot from `subscription` into `latest`.
///
/// A failed read is retried after the next write to the table.
fn forward<Q: Query>(
    mut subscription: Subscription<Q>,
    latest: watch::Sender<Snapshot<Q::Row>>,
) -> AbortHandle {
    tokio::spawn(async move {
        loop {
            match subscription.next().await {
                Ok(snapshot) => {
                    latest.send_replace(snapshot);
                }
                Err(Error::WriterClosed) => break,
                Err(error) => {
                    tracing::warn!("could not refresh a session view: {error}");

                    if subscription.changed().await.is_err() {
                        break;
                    }
                }
            }
        }
    })
    .abort_handle()
}
