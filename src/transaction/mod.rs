//! Transactions recorded in the ledger.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Tags and recurrence attached to a transaction
//! - Database functions for storing and querying transactions

mod core;
mod tags;

pub use self::core::{Transaction, TransactionBuilder, TransactionKind};
pub use tags::{Frequency, Tags};

pub(crate) use self::core::{conversion_error, create_transaction, get_transactions};
pub use crate::database_id::TransactionId;
