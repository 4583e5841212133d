//! Defines the core data model and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::TransactionId,
    timestamp::{from_millis, to_millis},
    transaction::tags::{Frequency, Tags, recurrence_from_columns},
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(TransactionKind::Income),
            "EXPENSE" => Ok(TransactionKind::Expense),
            _ => Err(Error::UnknownTransactionKind(s.to_owned())),
        }
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// The amount is always positive, [Transaction::kind] gives the direction.
/// Transactions are immutable once stored.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// A free-form label such as "Food" or "Salary".
    pub category: String,
    /// When the transaction happened, which need not be when it was recorded.
    pub occurred_at: OffsetDateTime,
    /// A free text note, may be empty.
    pub note: String,
    /// Whether this is income or an expense.
    pub kind: TransactionKind,
    /// How the transaction was paid, e.g. "Cash" or "Card".
    pub payment_method: String,
    /// Free-form labels in the order they were given.
    pub tags: Tags,
    /// How often the transaction repeats, if it does.
    pub recurrence: Option<Frequency>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(
        amount: f64,
        kind: TransactionKind,
        category: &str,
        occurred_at: OffsetDateTime,
    ) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            kind,
            category: category.to_owned(),
            occurred_at,
            note: String::new(),
            payment_method: String::new(),
            tags: Tags::default(),
            recurrence: None,
        }
    }

    /// The amount with the sign implied by the kind: negative for expenses.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// Required fields are given to [Transaction::build], the rest default to
/// empty and can be set with the chained setters.
///
/// # Examples
///
/// ```
/// use pocket_ledger::{Frequency, Tags, Transaction, TransactionKind};
/// use time::macros::datetime;
///
/// let builder = Transaction::build(
///         1500.0,
///         TransactionKind::Expense,
///         "Rent",
///         datetime!(2025-01-01 09:00 UTC),
///     )
///     .payment_method("Bank Transfer")
///     .tags(Tags::new(["home"]).unwrap())
///     .recurrence(Some(Frequency::Monthly));
///
/// assert_eq!(builder.category, "Rent");
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction, must be greater than zero.
    pub amount: f64,

    /// Whether money came in or went out.
    pub kind: TransactionKind,

    /// A free-form label, must not be blank.
    pub category: String,

    /// When the transaction happened.
    pub occurred_at: OffsetDateTime,

    /// A free text note.
    pub note: String,

    /// How the transaction was paid.
    pub payment_method: String,

    /// Free-form labels.
    pub tags: Tags,

    /// How often the transaction repeats, if it does.
    pub recurrence: Option<Frequency>,
}

impl TransactionBuilder {
    /// Set the note for the transaction.
    pub fn note(mut self, note: &str) -> Self {
        self.note = note.to_owned();
        self
    }

    /// Set the payment method for the transaction.
    pub fn payment_method(mut self, payment_method: &str) -> Self {
        self.payment_method = payment_method.to_owned();
        self
    }

    /// Set the tags for the transaction.
    pub fn tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Set how often the transaction repeats.
    pub fn recurrence(mut self, recurrence: Option<Frequency>) -> Self {
        self.recurrence = recurrence;
        self
    }

    /// Check the builder describes a transaction that may be stored.
    ///
    /// # Errors
    /// Returns an [Error::InvalidAmount] if the amount is not a finite number
    /// greater than zero, or an [Error::EmptyCategory] if the category is blank.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        if self.category.trim().is_empty() {
            return Err(Error::EmptyCategory);
        }

        Ok(())
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_COLUMNS: &str = "id, amount, category, date, note, type, paymentMethod, tags, \
    isRecurring, recurringFrequency";

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] or [Error::EmptyCategory] if the builder is invalid,
/// - or [Error::SqlError] if there is some SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    builder.validate()?;

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO transactions
                (amount, category, date, note, type, paymentMethod, tags, isRecurring, recurringFrequency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            (
                builder.amount,
                builder.category.trim(),
                to_millis(builder.occurred_at),
                &builder.note,
                builder.kind.as_str(),
                &builder.payment_method,
                builder.tags.to_column(),
                builder.recurrence.is_some(),
                builder.recurrence.map_or("", |frequency| frequency.as_str()),
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve transactions, newest first.
///
/// Transactions are ordered by when they happened, latest first. Transactions
/// that happened at the same instant are ordered by insertion, most recently
/// inserted first. If `kind` is given, only transactions of that kind are
/// returned.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn get_transactions(
    kind: Option<TransactionKind>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let query = match kind {
        Some(_) => format!(
            "SELECT {SELECT_COLUMNS} FROM transactions WHERE type = :type
             ORDER BY date DESC, id DESC"
        ),
        None => format!("SELECT {SELECT_COLUMNS} FROM transactions ORDER BY date DESC, id DESC"),
    };

    let mut statement = connection.prepare(&query)?;

    let rows = match kind {
        Some(kind) => statement.query_map(&[(":type", kind.as_str())], map_transaction_row)?,
        None => statement.query_map([], map_transaction_row)?,
    };

    rows.map(|maybe_transaction| maybe_transaction.map_err(|error| error.into()))
        .collect()
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
#[cfg(test)]
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM transactions WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)
        .map_err(|error| error.into())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let category = row.get(2)?;
    let occurred_at = from_millis(row.get(3)?, 3)?;
    let note = row.get(4)?;
    let raw_kind: String = row.get(5)?;
    let kind = raw_kind
        .parse()
        .map_err(|error| conversion_error(5, error))?;
    let payment_method = row.get(6)?;
    let raw_tags: String = row.get(7)?;
    let is_recurring = row.get(8)?;
    let raw_frequency: String = row.get(9)?;
    let recurrence = recurrence_from_columns(is_recurring, &raw_frequency)
        .map_err(|error| conversion_error(9, error))?;

    Ok(Transaction {
        id,
        amount,
        category,
        occurred_at,
        note,
        kind,
        payment_method,
        tags: Tags::from_column(&raw_tags),
        recurrence,
    })
}

pub(crate) fn conversion_error(column: usize, error: Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(error))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{
        Error,
        db::initialize,
        transaction::{Frequency, Tags, Transaction, TransactionKind},
    };

    use super::{create_transaction, get_transaction, get_transactions};

    fn get_test_connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn).unwrap();
        conn
    }

    #[test]
    fn create_succeeds() {
        let conn = get_test_connection();
        let builder = Transaction::build(
            12.3,
            TransactionKind::Expense,
            "Food",
            datetime!(2025-10-05 12:30 UTC),
        )
        .note("lunch")
        .payment_method("Card")
        .tags(Tags::new(["work", "treat"]).unwrap())
        .recurrence(Some(Frequency::Weekly));

        let transaction = create_transaction(builder.clone(), &conn).unwrap();

        assert!(transaction.id > 0);
        assert_eq!(transaction.amount, builder.amount);
        assert_eq!(transaction.category, "Food");
        assert_eq!(transaction.occurred_at, builder.occurred_at);
        assert_eq!(transaction.note, "lunch");
        assert_eq!(transaction.kind, TransactionKind::Expense);
        assert_eq!(transaction.payment_method, "Card");
        assert_eq!(transaction.tags, builder.tags);
        assert_eq!(transaction.recurrence, Some(Frequency::Weekly));
        assert_eq!(get_transaction(transaction.id, &conn), Ok(transaction));
    }

    #[test]
    fn create_fails_on_non_positive_amount() {
        let conn = get_test_connection();

        for amount in [0.0, -5.0, f64::NAN] {
            let result = create_transaction(
                Transaction::build(
                    amount,
                    TransactionKind::Income,
                    "Salary",
                    datetime!(2025-10-05 0:00 UTC),
                ),
                &conn,
            );

            assert!(matches!(result, Err(Error::InvalidAmount(_))), "{result:?}");
        }
    }

    #[test]
    fn create_fails_on_blank_category() {
        let conn = get_test_connection();

        let result = create_transaction(
            Transaction::build(
                1.0,
                TransactionKind::Income,
                "  ",
                datetime!(2025-10-05 0:00 UTC),
            ),
            &conn,
        );

        assert_eq!(result, Err(Error::EmptyCategory));
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let conn = get_test_connection();
        let when = datetime!(2025-10-05 0:00 UTC);

        let first = create_transaction(
            Transaction::build(1.0, TransactionKind::Expense, "Food", when),
            &conn,
        )
        .unwrap();
        let second = create_transaction(
            Transaction::build(1.0, TransactionKind::Expense, "Food", when),
            &conn,
        )
        .unwrap();

        assert!(second.id > first.id);
    }

    #[test]
    fn get_transactions_orders_newest_first_then_latest_insert() {
        let conn = get_test_connection();
        let older = create_transaction(
            Transaction::build(
                1.0,
                TransactionKind::Expense,
                "Food",
                datetime!(2025-01-01 0:00 UTC),
            ),
            &conn,
        )
        .unwrap();
        let same_time_first = create_transaction(
            Transaction::build(
                2.0,
                TransactionKind::Income,
                "Salary",
                datetime!(2025-02-01 0:00 UTC),
            ),
            &conn,
        )
        .unwrap();
        let same_time_second = create_transaction(
            Transaction::build(
                3.0,
                TransactionKind::Expense,
                "Rent",
                datetime!(2025-02-01 0:00 UTC),
            ),
            &conn,
        )
        .unwrap();

        let got = get_transactions(None, &conn).unwrap();

        assert_eq!(got, vec![same_time_second, same_time_first, older]);
    }

    #[test]
    fn get_transactions_filters_by_kind() {
        let conn = get_test_connection();
        let when = datetime!(2025-01-01 0:00 UTC);
        let income = create_transaction(
            Transaction::build(100.0, TransactionKind::Income, "Salary", when),
            &conn,
        )
        .unwrap();
        let expense = create_transaction(
            Transaction::build(40.0, TransactionKind::Expense, "Food", when),
            &conn,
        )
        .unwrap();

        assert_eq!(
            get_transactions(Some(TransactionKind::Income), &conn),
            Ok(vec![income])
        );
        assert_eq!(
            get_transactions(Some(TransactionKind::Expense), &conn),
            Ok(vec![expense])
        );
    }

    #[test]
    fn get_transaction_fails_on_missing_id() {
        let conn = get_test_connection();

        assert_eq!(get_transaction(42, &conn), Err(Error::NotFound));
    }

    #[test]
    fn signed_amount_is_negative_for_expenses() {
        let when = datetime!(2025-01-01 0:00 UTC);
        let conn = get_test_connection();
        let expense = create_transaction(
            Transaction::build(40.0, TransactionKind::Expense, "Food", when),
            &conn,
        )
        .unwrap();

        assert_eq!(expense.amount, 40.0);
        assert_eq!(expense.signed_amount(), -40.0);
    }
}
