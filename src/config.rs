//! Runtime configuration for the ledger.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{Error, dashboard::BudgetLimits};

/// How long a mirror attempt may take before it is abandoned.
pub const DEFAULT_MIRROR_TIMEOUT: Duration = Duration::from_secs(10);

/// How long session views stay live after the last observer leaves.
pub const DEFAULT_TEARDOWN_GRACE: Duration = Duration::from_secs(5);

/// Where the ledger lives and how it talks to the outside world.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// Path to the SQLite ledger database.
    pub db_path: PathBuf,
    /// URL of the remote collection new transactions are mirrored to.
    ///
    /// `None` keeps mirrored documents in memory only.
    pub remote_url: Option<String>,
    /// How long a mirror attempt may take.
    pub mirror_timeout: Duration,
    /// How long session views stay live after the last observer leaves.
    pub teardown_grace: Duration,
    /// Spending limits per category for budget reports.
    pub budget_limits: BudgetLimits,
}

impl LedgerConfig {
    /// A configuration for the database at `db_path` with default settings,
    /// no remote and no budget limits.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            remote_url: None,
            mirror_timeout: DEFAULT_MIRROR_TIMEOUT,
            teardown_grace: DEFAULT_TEARDOWN_GRACE,
            budget_limits: BudgetLimits::new(),
        }
    }

    /// Set the remote collection URL.
    pub fn remote_url(mut self, remote_url: Option<String>) -> Self {
        self.remote_url = remote_url.filter(|url| !url.trim().is_empty());
        self
    }

    /// Set the mirror timeout.
    pub fn mirror_timeout(mut self, mirror_timeout: Duration) -> Self {
        self.mirror_timeout = mirror_timeout;
        self
    }

    /// Set the teardown grace period.
    pub fn teardown_grace(mut self, teardown_grace: Duration) -> Self {
        self.teardown_grace = teardown_grace;
        self
    }

    /// Load budget limits from the JSON file at `path`.
    ///
    /// # Errors
    /// Returns an [Error::InvalidConfig] if the file cannot be read or does
    /// not hold a JSON object of category limits.
    pub fn budget_limits_file(mut self, path: &Path) -> Result<Self, Error> {
        let json = fs::read_to_string(path).map_err(|error| {
            Error::InvalidConfig(format!(
                "could not read budget limits from {path:?}: {error}"
            ))
        })?;
        self.budget_limits = BudgetLimits::from_json(&json)?;

        Ok(self)
    }
}
