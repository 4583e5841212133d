//! Savings goals and their database queries.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::Error;

pub use crate::database_id::SavingsGoalId;

/// An amount the user is saving towards.
///
/// `current_amount` may exceed `target_amount`, over-funding is kept as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsGoal {
    /// The ID of the goal.
    pub id: SavingsGoalId,
    /// What the user is saving for.
    pub name: String,
    /// The amount to save, always positive.
    pub target_amount: f64,
    /// The amount saved so far.
    pub current_amount: f64,
}

impl SavingsGoal {
    /// Create a new savings goal.
    ///
    /// Shortcut for [SavingsGoalBuilder] for discoverability.
    pub fn build(name: &str, target_amount: f64) -> SavingsGoalBuilder {
        SavingsGoalBuilder {
            name: name.to_owned(),
            target_amount,
            current_amount: 0.0,
        }
    }

    /// Return this goal with `amount` added to the amount saved.
    ///
    /// `amount` may be negative to record a withdrawal, the result is checked
    /// when the goal is stored.
    pub fn contribute(&self, amount: f64) -> SavingsGoal {
        SavingsGoal {
            current_amount: self.current_amount + amount,
            ..self.clone()
        }
    }

    /// The fraction of the target saved, clamped to `[0, 1]` for progress bars.
    pub fn progress(&self) -> f64 {
        if self.target_amount <= 0.0 {
            return 0.0;
        }

        (self.current_amount / self.target_amount).clamp(0.0, 1.0)
    }

    fn validate(&self) -> Result<(), Error> {
        validate_amounts(&self.name, self.target_amount, self.current_amount)
    }
}

/// A savings goal that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsGoalBuilder {
    /// What the user is saving for, must not be blank.
    pub name: String,
    /// The amount to save, must be greater than zero.
    pub target_amount: f64,
    /// The amount already saved, must not be negative.
    pub current_amount: f64,
}

impl SavingsGoalBuilder {
    /// Set the amount already saved.
    pub fn current_amount(mut self, current_amount: f64) -> Self {
        self.current_amount = current_amount;
        self
    }
}

fn validate_amounts(name: &str, target_amount: f64, current_amount: f64) -> Result<(), Error> {
    if !target_amount.is_finite() || target_amount <= 0.0 {
        return Err(Error::InvalidAmount(target_amount));
    }

    if !current_amount.is_finite() || current_amount < 0.0 {
        return Err(Error::InvalidSavedAmount(current_amount));
    }

    if name.trim().is_empty() {
        return Err(Error::EmptyName);
    }

    Ok(())
}

/// Create a savings goal and return it with its generated ID.
pub(crate) fn create_savings_goal(
    builder: SavingsGoalBuilder,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    validate_amounts(&builder.name, builder.target_amount, builder.current_amount)?;

    connection
        .prepare(
            "INSERT INTO savings_goals (name, targetAmount, currentAmount) VALUES (?1, ?2, ?3)
             RETURNING id, name, targetAmount, currentAmount",
        )?
        .query_row(
            (
                builder.name.trim(),
                builder.target_amount,
                builder.current_amount,
            ),
            map_row,
        )
        .map_err(|error| error.into())
}

/// Overwrite the stored goal that has the same ID as `goal` and return the stored row.
///
/// # Errors
/// Returns an [Error::UpdateMissingSavingsGoal] if no goal has that ID.
pub(crate) fn update_savings_goal(
    goal: &SavingsGoal,
    connection: &Connection,
) -> Result<SavingsGoal, Error> {
    goal.validate()?;

    connection
        .prepare(
            "UPDATE savings_goals SET name = ?1, targetAmount = ?2, currentAmount = ?3
             WHERE id = ?4
             RETURNING id, name, targetAmount, currentAmount",
        )?
        .query_row(
            (
                goal.name.trim(),
                goal.target_amount,
                goal.current_amount,
                goal.id,
            ),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingSavingsGoal,
            error => error.into(),
        })
}

/// Retrieve all savings goals in the order they were created.
pub(crate) fn get_all_savings_goals(connection: &Connection) -> Result<Vec<SavingsGoal>, Error> {
    connection
        .prepare(
            "SELECT id, name, targetAmount, currentAmount FROM savings_goals ORDER BY id ASC;",
        )?
        .query_map([], map_row)?
        .map(|maybe_goal| maybe_goal.map_err(|error| error.into()))
        .collect()
}

fn map_row(row: &Row) -> Result<SavingsGoal, rusqlite::Error> {
    Ok(SavingsGoal {
        id: row.get(0)?,
        name: row.get(1)?,
        target_amount: row.get(2)?,
        current_amount: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{Error, db::initialize};

    use super::{SavingsGoal, create_savings_goal, get_all_savings_goals, update_savings_goal};

    fn get_test_connection() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn).unwrap();
        conn
    }

    #[test]
    fn create_goal_succeeds() {
        let conn = get_test_connection();

        let goal = create_savings_goal(
            SavingsGoal::build("Holiday", 2000.0).current_amount(150.0),
            &conn,
        )
        .unwrap();

        assert!(goal.id > 0);
        assert_eq!(goal.name, "Holiday");
        assert_eq!(goal.target_amount, 2000.0);
        assert_eq!(goal.current_amount, 150.0);
    }

    #[test]
    fn create_goal_fails_on_negative_savings() {
        let conn = get_test_connection();

        let result = create_savings_goal(
            SavingsGoal::build("Holiday", 2000.0).current_amount(-1.0),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidSavedAmount(-1.0)));
    }

    #[test]
    fn update_goal_keeps_over_funding() {
        let conn = get_test_connection();
        let goal = create_savings_goal(SavingsGoal::build("Bike", 500.0), &conn).unwrap();
        let funded = goal.contribute(650.0);

        let stored = update_savings_goal(&funded, &conn).unwrap();

        assert_eq!(stored, funded);
        let goals = get_all_savings_goals(&conn).unwrap();
        assert_eq!(goals, vec![funded]);
        assert_eq!(goals[0].current_amount, 650.0);
        assert_eq!(goals[0].progress(), 1.0);
    }

    #[test]
    fn update_returns_trimmed_name() {
        let conn = get_test_connection();
        let goal = create_savings_goal(SavingsGoal::build("Bike", 500.0), &conn).unwrap();
        let renamed = SavingsGoal {
            name: "  Road bike ".to_owned(),
            ..goal
        };

        let stored = update_savings_goal(&renamed, &conn).unwrap();

        assert_eq!(stored.name, "Road bike");
        assert_eq!(get_all_savings_goals(&conn).unwrap(), vec![stored]);
    }

    #[test]
    fn update_missing_goal_fails() {
        let conn = get_test_connection();
        let goal = SavingsGoal {
            id: 1337,
            name: "Ghost".to_owned(),
            target_amount: 1.0,
            current_amount: 0.0,
        };

        assert_eq!(
            update_savings_goal(&goal, &conn),
            Err(Error::UpdateMissingSavingsGoal)
        );
    }

    #[test]
    fn progress_is_fraction_of_target() {
        let goal = SavingsGoal {
            id: 1,
            name: "Laptop".to_owned(),
            target_amount: 2000.0,
            current_amount: 500.0,
        };

        assert_eq!(goal.progress(), 0.25);
    }
}
