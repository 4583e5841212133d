//! Best-effort mirroring of new transactions to a remote ledger.
//!
//! The mirror is one-directional and at-most-once. Each attempt runs in its
//! own task after the local insert has committed. A failed or timed out
//! attempt is logged and dropped, it is never retried and never reported to
//! the caller that inserted the transaction.

mod remote;

use std::{future::Future, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};

use crate::{Transaction, timestamp::to_millis};

pub use remote::{HttpRemoteLedger, InMemoryRemoteLedger};

/// The copy of a transaction sent to the remote ledger.
///
/// Tags and recurrence are not mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorDocument {
    /// The transaction amount, always positive.
    pub amount: f64,
    /// The transaction category.
    pub category: String,
    /// When the transaction happened, as Unix epoch milliseconds.
    pub date: i64,
    /// `INCOME` or `EXPENSE`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The free text note, may be empty.
    pub note: String,
    /// How the transaction was paid.
    pub payment_method: String,
}

impl From<&Transaction> for MirrorDocument {
    fn from(transaction: &Transaction) -> Self {
        Self {
            amount: transaction.amount,
            category: transaction.category.clone(),
            date: to_millis(transaction.occurred_at),
            kind: transaction.kind.as_str().to_owned(),
            note: transaction.note.clone(),
            payment_method: transaction.payment_method.clone(),
        }
    }
}

/// Why a mirror attempt failed.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SyncError {
    /// The remote could not be reached.
    #[error("could not reach the remote ledger: {0}")]
    Transport(String),

    /// The remote did not answer in time.
    #[error("the remote ledger did not answer within {0:?}")]
    Timeout(Duration),

    /// The remote answered with a non-success status code.
    #[error("the remote ledger rejected the document with status {0}")]
    Rejected(u16),
}

/// An append-only remote collection of mirrored transactions.
pub trait RemoteLedger: Send + Sync + 'static {
    /// Append `document` to the remote collection.
    fn append(
        &self,
        document: MirrorDocument,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// Sends a copy of each newly inserted transaction to a [RemoteLedger].
#[derive(Debug)]
pub struct SyncMirror<R> {
    remote: Arc<R>,
    timeout: Duration,
    in_flight: Arc<watch::Sender<usize>>,
}

impl<R> Clone for SyncMirror<R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            timeout: self.timeout,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

/// Counts one mirror attempt as in flight until dropped.
struct Attempt(Arc<watch::Sender<usize>>);

impl Attempt {
    fn start(in_flight: &Arc<watch::Sender<usize>>) -> Self {
        in_flight.send_modify(|count| *count += 1);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        self.0.send_modify(|count| *count = count.saturating_sub(1));
    }
}

impl<R: RemoteLedger> SyncMirror<R> {
    /// Create a mirror that gives each attempt at most `timeout` to complete.
    pub fn new(remote: Arc<R>, timeout: Duration) -> Self {
        Self {
            remote,
            timeout,
            in_flight: Arc::new(watch::Sender::new(0)),
        }
    }

    /// The remote ledger that transactions are mirrored to.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Mirror `transaction` in the background.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// resolves once the attempt has finished, successfully or not, and can
    /// be dropped without cancelling the attempt.
    pub fn mirror(&self, transaction: &Transaction) -> JoinHandle<()> {
        let remote = Arc::clone(&self.remote);
        let timeout = self.timeout;
        let id = transaction.id;
        let document = MirrorDocument::from(transaction);
        let attempt = Attempt::start(&self.in_flight);

        tokio::spawn(async move {
            let _attempt = attempt;
            let result = match tokio::time::timeout(timeout, remote.append(document)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::Timeout(timeout)),
            };

            match result {
                Ok(()) => tracing::debug!("mirrored transaction {id}"),
                Err(error) => tracing::warn!("could not mirror transaction {id}: {error}"),
            }
        })
    }

    /// Wait until every attempt started so far has finished.
    ///
    /// Useful before shutting down, since attempts still in flight when the
    /// runtime stops are lost.
    pub async fn idle(&self) {
        let mut in_flight = self.in_flight.subscribe();
        let _ = in_flight.wait_for(|count| *count == 0).await;
    }
}
