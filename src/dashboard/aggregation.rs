//! Totals, shares and ratios over a snapshot of transactions.
//!
//! Every function here is pure: it reads the records it is given and nothing
//! else. Degenerate inputs (no records, a zero total) produce zero or empty
//! results instead of NaN.

use serde::Serialize;

use crate::{Transaction, TransactionKind};

/// Summed amounts per category, in the order each category first appeared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotals(Vec<(String, f64)>);

impl CategoryTotals {
    /// The total for `category`, if it has one.
    pub fn get(&self, category: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, total)| *total)
    }

    /// Category names and totals in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, total)| (name.as_str(), *total))
    }

    /// The sum of every category total.
    pub fn total(&self) -> f64 {
        self.0.iter().map(|(_, total)| total).sum()
    }

    /// The number of categories.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no categories.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn add(&mut self, category: &str, amount: f64) {
        match self.0.iter_mut().find(|(name, _)| name == category) {
            Some((_, total)) => *total += amount,
            None => self.0.push((category.to_owned(), amount)),
        }
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for CategoryTotals {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut totals = CategoryTotals::default();

        for (category, amount) in iter {
            totals.add(category.as_ref(), amount);
        }

        totals
    }
}

/// One category's percentage of a grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    /// The category name.
    pub category: String,
    /// The category total as a percentage of the grand total, 0 to 100.
    pub percentage: f64,
}

/// Sum the amounts of `kind` transactions per category.
///
/// # Returns
/// Category totals in the order each category first appears in `transactions`.
pub fn group_by_category(transactions: &[Transaction], kind: TransactionKind) -> CategoryTotals {
    transactions
        .iter()
        .filter(|transaction| transaction.kind == kind)
        .map(|transaction| (transaction.category.as_str(), transaction.amount))
        .collect()
}

/// Sum the amounts of all `kind` transactions.
pub fn total_by_kind(transactions: &[Transaction], kind: TransactionKind) -> f64 {
    transactions
        .iter()
        .filter(|transaction| transaction.kind == kind)
        .map(|transaction| transaction.amount)
        .sum()
}

/// Income minus expenses.
pub fn net_balance(transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .map(|transaction| transaction.signed_amount())
        .sum()
}

/// Express each category total as a percentage of `grand_total`.
///
/// # Returns
/// One share per category in the same order as `totals`, or nothing at all
/// when `grand_total` is zero.
pub fn proportional_shares(totals: &CategoryTotals, grand_total: f64) -> Vec<Share> {
    if grand_total <= 0.0 || !grand_total.is_finite() {
        return Vec::new();
    }

    totals
        .iter()
        .map(|(category, total)| Share {
            category: category.to_owned(),
            percentage: total / grand_total * 100.0,
        })
        .collect()
}

/// Scale `a` and `b` relative to the larger of the two.
///
/// # Returns
/// `(a / max, b / max)`, or `(0.0, 0.0)` when both are zero.
pub fn comparison_ratio(a: f64, b: f64) -> (f64, f64) {
    let max = a.max(b);

    if max <= 0.0 {
        return (0.0, 0.0);
    }

    (a / max, b / max)
}
