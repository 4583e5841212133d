//! The capability that lets a caller issue ledger commands.

use time::{Duration, OffsetDateTime};

use crate::Error;

/// Proof that the caller has signed in, issued by the authentication layer.
///
/// Every ledger command takes a token and refuses to run once it has expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    subject: String,
    expires_at: OffsetDateTime,
}

impl SessionToken {
    /// Create a token for `subject` that is valid until `expires_at`.
    pub fn new(subject: &str, expires_at: OffsetDateTime) -> Self {
        Self {
            subject: subject.to_owned(),
            expires_at,
        }
    }

    /// Create a token for `subject` that is valid for `duration` from now.
    pub fn valid_for(subject: &str, duration: Duration) -> Self {
        Self::new(subject, OffsetDateTime::now_utc() + duration)
    }

    /// Who the token was issued to.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// When the token stops being accepted.
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Whether the token is still accepted at `now`.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }

    /// Check that the token has not expired.
    ///
    /// # Errors
    /// Returns an [Error::SessionExpired] once the expiry time has passed.
    pub fn ensure_valid(&self) -> Result<(), Error> {
        if self.is_valid_at(OffsetDateTime::now_utc()) {
            Ok(())
        } else {
            Err(Error::SessionExpired)
        }
    }
}
