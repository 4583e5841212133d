//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;

/// The ID of a [crate::Transaction].
pub type TransactionId = DatabaseId;

/// The ID of a [crate::Debt].
pub type DebtId = DatabaseId;

/// The ID of a [crate::SavingsGoal].
pub type SavingsGoalId = DatabaseId;
