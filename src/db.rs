//! Schema versions for the ledger database and the migration executor.
//!
//! The applied version is tracked with `PRAGMA user_version`. Every step is
//! additive: it either adds a defaulted column or creates a new table, so rows
//! written by an older version are never rewritten.

use rusqlite::{Connection, TransactionBehavior};

use crate::Error;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create transactions",
        sql: "CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date INTEGER NOT NULL,
                note TEXT NOT NULL,
                type TEXT NOT NULL,
                paymentMethod TEXT NOT NULL
            );",
    },
    Migration {
        version: 2,
        description: "add tags and recurrence to transactions",
        sql: "ALTER TABLE transactions ADD COLUMN tags TEXT NOT NULL DEFAULT '';
            ALTER TABLE transactions ADD COLUMN isRecurring INTEGER NOT NULL DEFAULT 0;
            ALTER TABLE transactions ADD COLUMN recurringFrequency TEXT NOT NULL DEFAULT '';",
    },
    Migration {
        version: 3,
        description: "create debts and savings goals",
        sql: "CREATE TABLE IF NOT EXISTS debts (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                dueDate INTEGER NOT NULL,
                type TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS savings_goals (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                name TEXT NOT NULL,
                targetAmount REAL NOT NULL,
                currentAmount REAL NOT NULL
            );",
    },
];

/// The latest schema version known by this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Read the schema version recorded in the database.
///
/// # Errors
/// Returns an [Error::SqlError] if the pragma cannot be read.
pub fn schema_version(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("PRAGMA user_version;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Bring the database schema up to [latest_version].
///
/// Steps are applied in version order and only when the database is below the
/// step's version, so this is safe to call on every start up, including on a
/// database written by a newer build.
///
/// # Errors
/// Returns an [Error::MigrationFailed] if any step fails. All steps of the
/// upgrade run in one transaction, so on failure the database keeps the
/// schema version it had before the call.
pub fn initialize(connection: &mut Connection) -> Result<(), Error> {
    migrate_to(connection, latest_version())
}

/// Apply every step up to and including `target`.
///
/// [initialize] is the usual entry point. Stopping at an older version is
/// useful for producing databases that exercise the upgrade path.
///
/// # Errors
/// Returns an [Error::MigrationFailed] if any step fails.
pub fn migrate_to(connection: &mut Connection, target: u32) -> Result<(), Error> {
    let current = schema_version(connection)?;

    if current > latest_version() {
        tracing::warn!(
            "database schema version {current} is newer than the latest known version {}, \
            skipping migrations",
            latest_version()
        );
        return Ok(());
    }

    if current >= target {
        tracing::debug!("database schema is up to date at version {current}");
        return Ok(());
    }

    tracing::info!("migrating database schema from version {current} to {target}");

    let transaction = connection
        .transaction_with_behavior(TransactionBehavior::Exclusive)
        .map_err(|error| migration_error(current + 1, error))?;

    for migration in MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current && migration.version <= target)
    {
        tracing::debug!(
            "applying schema version {}: {}",
            migration.version,
            migration.description
        );

        transaction
            .execute_batch(migration.sql)
            .and_then(|_| {
                transaction.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|error| migration_error(migration.version, error))?;
    }

    transaction
        .commit()
        .map_err(|error| migration_error(target, error))?;

    Ok(())
}

fn migration_error(version: u32, error: rusqlite::Error) -> Error {
    tracing::error!("schema migration to version {version} failed: {error}");

    Error::MigrationFailed {
        version,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::Error;

    use super::{initialize, latest_version, migrate_to, schema_version};

    fn table_exists(connection: &Connection, table_name: &str) -> bool {
        connection
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
                [table_name],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn count_rows(connection: &Connection, table_name: &str) -> i64 {
        connection
            .query_row(&format!("SELECT COUNT(*) FROM {table_name};"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn initialize_applies_all_versions() {
        let mut conn = Connection::open_in_memory().unwrap();

        initialize(&mut conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), latest_version());
        assert!(table_exists(&conn, "transactions"));
        assert!(table_exists(&conn, "debts"));
        assert!(table_exists(&conn, "savings_goals"));
    }

    #[test]
    fn initialize_twice_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn).unwrap();

        let result = initialize(&mut conn);

        assert_eq!(result, Ok(()));
        assert_eq!(schema_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn upgrade_from_v1_preserves_existing_rows() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_to(&mut conn, 1).unwrap();
        conn.execute(
            "INSERT INTO transactions (amount, category, date, note, type, paymentMethod)
             VALUES (42.5, 'Food', 1700000000000, 'lunch', 'EXPENSE', 'Card')",
            (),
        )
        .unwrap();

        initialize(&mut conn).unwrap();

        let row: (
            f64,
            String,
            i64,
            String,
            String,
            String,
            String,
            bool,
            String,
        ) = conn
            .query_row(
                "SELECT amount, category, date, note, type, paymentMethod,
                        tags, isRecurring, recurringFrequency
                 FROM transactions",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .unwrap();
        assert_eq!(
            row,
            (
                42.5,
                "Food".to_owned(),
                1_700_000_000_000,
                "lunch".to_owned(),
                "EXPENSE".to_owned(),
                "Card".to_owned(),
                String::new(),
                false,
                String::new(),
            )
        );
        assert_eq!(count_rows(&conn, "transactions"), 1);
        assert_eq!(count_rows(&conn, "debts"), 0);
        assert_eq!(count_rows(&conn, "savings_goals"), 0);
    }

    #[test]
    fn failed_step_rolls_back_the_whole_upgrade() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_to(&mut conn, 1).unwrap();
        // A column that version 2 is about to add makes its ALTER TABLE fail.
        conn.execute_batch("ALTER TABLE transactions ADD COLUMN tags TEXT;")
            .unwrap();

        let result = initialize(&mut conn);

        match result {
            Err(Error::MigrationFailed { version, .. }) => assert_eq!(version, 2),
            other => panic!("want migration failure, got {other:?}"),
        }
        assert_eq!(schema_version(&conn).unwrap(), 1);
        assert!(!table_exists(&conn, "debts"));
    }

    #[test]
    fn newer_schema_version_is_left_alone() {
        let mut conn = Connection::open_in_memory().unwrap();
        initialize(&mut conn).unwrap();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();

        let result = initialize(&mut conn);

        assert_eq!(result, Ok(()));
        assert_eq!(schema_version(&conn).unwrap(), 99);
    }
}
