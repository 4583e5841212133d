//! Session scoped access to the ledger.

mod state;
mod token;

pub use state::{Observer, SessionState};
pub use token::SessionToken;
