//! Debts the user owes or is owed, and their database queries.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    timestamp::{from_millis, to_millis},
    transaction::conversion_error,
};

pub use crate::database_id::DebtId;

/// Who owes the money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebtDirection {
    /// The user owes someone else.
    OwedByUser,
    /// Someone else owes the user.
    OwedToUser,
}

impl DebtDirection {
    /// The value stored in the `type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtDirection::OwedByUser => "OWE",
            DebtDirection::OwedToUser => "OWED",
        }
    }
}

impl Display for DebtDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for DebtDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OWE" => Ok(DebtDirection::OwedByUser),
            "OWED" => Ok(DebtDirection::OwedToUser),
            _ => Err(Error::UnknownDebtDirection(s.to_owned())),
        }
    }
}

/// Money owed between the user and someone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    /// The ID of the debt.
    pub id: DebtId,
    /// Who the debt is with, or what it is for.
    pub name: String,
    /// The amount owed, always positive.
    pub amount: f64,
    /// When the debt should be settled.
    pub due_date: OffsetDateTime,
    /// Who owes whom.
    pub direction: DebtDirection,
}

impl Debt {
    /// Create a new debt.
    ///
    /// Shortcut for [DebtBuilder] for discoverability.
    pub fn build(
        name: &str,
        amount: f64,
        due_date: OffsetDateTime,
        direction: DebtDirection,
    ) -> DebtBuilder {
        DebtBuilder {
            name: name.to_owned(),
            amount,
            due_date,
            direction,
        }
    }
}

/// A debt that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtBuilder {
    /// Who the debt is with, must not be blank.
    pub name: String,
    /// The amount owed, must be greater than zero.
    pub amount: f64,
    /// When the debt should be settled.
    pub due_date: OffsetDateTime,
    /// Who owes whom.
    pub direction: DebtDirection,
}

impl DebtBuilder {
    fn validate(&self) -> Result<(), Error> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(Error::InvalidAmount(self.amount));
        }

        if self.name.trim().is_empty() {
            return Err(Error::EmptyName);
        }

        Ok(())
    }
}

/// Create a debt and return it with its generated ID.
///
/// # Errors
/// Returns an [Error::InvalidAmount] or [Error::EmptyName] if the builder is
/// invalid, or an [Error::SqlError] if there is some SQL error.
pub(crate) fn create_debt(builder: DebtBuilder, connection: &Connection) -> Result<Debt, Error> {
    builder.validate()?;

    connection
        .prepare(
            "INSERT INTO debts (name, amount, dueDate, type) VALUES (?1, ?2, ?3, ?4)
             RETURNING id, name, amount, dueDate, type",
        )?
        .query_row(
            (
                builder.name.trim(),
                builder.amount,
                to_millis(builder.due_date),
                builder.direction.as_str(),
            ),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all debts in the order they were recorded.
pub(crate) fn get_all_debts(connection: &Connection) -> Result<Vec<Debt>, Error> {
    connection
        .prepare("SELECT id, name, amount, dueDate, type FROM debts ORDER BY id ASC;")?
        .query_map([], map_row)?
        .map(|maybe_debt| maybe_debt.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<Debt, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;
    let amount = row.get(2)?;
    let due_date = from_millis(row.get(3)?, 3)?;
    let raw_direction: String = row.get(4)?;
    let direction = raw_direction
        .parse()
        .map_err(|error| conversion_error(4, error))?;

    Ok(Debt {
        id,
        name,
        amount,
        due_date,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::datetime;

    use crate::{Error, db::initialize};

    use super::{Debt, DebtDirection, create_debt, get_all_debts};

    fn get_test_connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn).unwrap();
        conn
    }

    #[test]
    fn create_debt_succeeds() {
        let conn = get_test_connection();
        let due = datetime!(2025-12-01 0:00 UTC);

        let debt = create_debt(
            Debt::build("Alex", 250.0, due, DebtDirection::OwedToUser),
            &conn,
        )
        .unwrap();

        assert!(debt.id > 0);
        assert_eq!(debt.name, "Alex");
        assert_eq!(debt.amount, 250.0);
        assert_eq!(debt.due_date, due);
        assert_eq!(debt.direction, DebtDirection::OwedToUser);
    }

    #[test]
    fn create_debt_fails_on_invalid_input() {
        let conn = get_test_connection();
        let due = datetime!(2025-12-01 0:00 UTC);

        assert_eq!(
            create_debt(
                Debt::build("Alex", 0.0, due, DebtDirection::OwedByUser),
                &conn
            ),
            Err(Error::InvalidAmount(0.0))
        );
        assert_eq!(
            create_debt(Debt::build("", 10.0, due, DebtDirection::OwedByUser), &conn),
            Err(Error::EmptyName)
        );
    }

    #[test]
    fn get_all_debts_returns_insertion_order() {
        let conn = get_test_connection();
        let first = create_debt(
            Debt::build(
                "Car loan",
                9000.0,
                datetime!(2027-01-01 0:00 UTC),
                DebtDirection::OwedByUser,
            ),
            &conn,
        )
        .unwrap();
        let second = create_debt(
            Debt::build(
                "Sam",
                20.0,
                datetime!(2025-01-01 0:00 UTC),
                DebtDirection::OwedToUser,
            ),
            &conn,
        )
        .unwrap();

        assert_eq!(get_all_debts(&conn), Ok(vec![first, second]));
    }

    #[test]
    fn direction_round_trips_through_column_text() {
        assert_eq!(
            "OWE".parse::<DebtDirection>(),
            Ok(DebtDirection::OwedByUser)
        );
        assert_eq!(
            "OWED".parse::<DebtDirection>(),
            Ok(DebtDirection::OwedToUser)
        );
        assert_eq!(
            "LENT".parse::<DebtDirection>(),
            Err(Error::UnknownDebtDirection("LENT".to_owned()))
        );
    }
}
