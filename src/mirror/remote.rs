//! [RemoteLedger] adapters.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use reqwest::Client;

use super::{MirrorDocument, RemoteLedger, SyncError};

/// Appends mirror documents to a collection over HTTP.
///
/// Each document is POSTed as JSON to the collection URL. Any status other
/// than 2xx counts as a failed attempt.
#[derive(Debug, Clone)]
pub struct HttpRemoteLedger {
    client: Client,
    collection_url: String,
}

impl HttpRemoteLedger {
    /// Create an adapter for the collection at `collection_url`.
    pub fn new(collection_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), collection_url)
    }

    /// Create an adapter that sends requests with `client`, for example one
    /// configured with custom timeouts or proxy settings.
    pub fn with_client(client: Client, collection_url: impl Into<String>) -> Self {
        Self {
            client,
            collection_url: collection_url.into(),
        }
    }

    /// The URL documents are posted to.
    pub fn collection_url(&self) -> &str {
        &self.collection_url
    }
}

impl RemoteLedger for HttpRemoteLedger {
    async fn append(&self, document: MirrorDocument) -> Result<(), SyncError> {
        let response = self
            .client
            .post(&self.collection_url)
            .json(&document)
            .send()
            .await
            .map_err(|error| SyncError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Rejected(status.as_u16()));
        }

        Ok(())
    }
}

/// Keeps mirrored documents in memory.
///
/// Useful for running without a network and for tests. The adapter can be
/// told to fail every append to simulate an outage.
#[derive(Debug, Default)]
pub struct InMemoryRemoteLedger {
    documents: Mutex<Vec<MirrorDocument>>,
    failing: AtomicBool,
}

impl InMemoryRemoteLedger {
    /// Create an empty, working remote.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following append fail (`true`) or succeed (`false`).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The documents appended so far, oldest first.
    pub fn documents(&self) -> Vec<MirrorDocument> {
        match self.documents.lock() {
            Ok(documents) => documents.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RemoteLedger for InMemoryRemoteLedger {
    async fn append(&self, document: MirrorDocument) -> Result<(), SyncError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("remote ledger is offline".to_owned()));
        }

        let mut documents = self
            .documents
            .lock()
            .map_err(|_| SyncError::Transport("remote ledger lock poisoned".to_owned()))?;
        documents.push(document);

        Ok(())
    }
}
