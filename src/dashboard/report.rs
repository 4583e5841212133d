//! The dashboard report, built from the expense and income snapshots in one pass.

use serde::Serialize;

use crate::{
    Transaction, TransactionKind,
    dashboard::{
        aggregation::{
            CategoryTotals, Share, comparison_ratio, group_by_category, proportional_shares,
            total_by_kind,
        },
        budget::{BudgetLimits, BudgetUsage, budget_utilization},
        charts::{Segment, radial_layout},
    },
};

/// Everything the dashboard shows, derived from one pair of snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Expense totals per category in first-occurrence order.
    pub expense_totals: CategoryTotals,
    /// The sum of all income.
    pub total_income: f64,
    /// The sum of all expenses.
    pub total_expenses: f64,
    /// Income minus expenses.
    pub net_balance: f64,
    /// Each expense category as a percentage of all expenses.
    pub expense_shares: Vec<Share>,
    /// Donut chart segments for the expense categories.
    pub expense_segments: Vec<Segment>,
    /// Income and expenses scaled to the larger of the two, for bar charts.
    pub comparison: (f64, f64),
    /// Spending against each budget limit.
    pub budget: Vec<BudgetUsage>,
}

impl Report {
    /// Build a report from the latest expense and income snapshots.
    ///
    /// Records of the other kind in either slice are ignored.
    pub fn from_snapshots(
        expenses: &[Transaction],
        income: &[Transaction],
        limits: &BudgetLimits,
    ) -> Self {
        let expense_totals = group_by_category(expenses, TransactionKind::Expense);
        let total_expenses = total_by_kind(expenses, TransactionKind::Expense);
        let total_income = total_by_kind(income, TransactionKind::Income);

        Self {
            expense_shares: proportional_shares(&expense_totals, total_expenses),
            expense_segments: radial_layout(&expense_totals),
            comparison: comparison_ratio(total_income, total_expenses),
            budget: budget_utilization(&expense_totals, limits),
            net_balance: total_income - total_expenses,
            expense_totals,
            total_income,
            total_expenses,
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::{Tags, Transaction, TransactionKind, dashboard::budget::BudgetLimits};

    use super::Report;

    fn create_test_transaction(amount: f64, kind: TransactionKind, category: &str) -> Transaction {
        Transaction {
            id: 0,
            amount,
            category: category.to_owned(),
            occurred_at: datetime!(2025-02-01 9:00 UTC),
            note: String::new(),
            kind,
            payment_method: "Card".to_owned(),
            tags: Tags::default(),
            recurrence: None,
        }
    }

    #[test]
    fn report_combines_all_views() {
        let expenses = vec![
            create_test_transaction(60.0, TransactionKind::Expense, "Food"),
            create_test_transaction(40.0, TransactionKind::Expense, "Transport"),
        ];
        let income = vec![create_test_transaction(
            400.0,
            TransactionKind::Income,
            "Salary",
        )];
        let limits = BudgetLimits::new().with_limit("Food", 50.0);

        let report = Report::from_snapshots(&expenses, &income, &limits);

        assert_eq!(report.total_expenses, 100.0);
        assert_eq!(report.total_income, 400.0);
        assert_eq!(report.net_balance, 300.0);
        assert_eq!(report.comparison, (1.0, 0.25));
        assert_eq!(report.expense_shares[0].percentage, 60.0);
        assert_eq!(report.expense_segments[1].start_angle, -90.0 + 216.0);
        assert_eq!(report.budget[0].ratio, 1.2);
        assert_eq!(report.budget[0].over_by, 10.0);
    }

    #[test]
    fn empty_snapshots_produce_empty_report() {
        let report = Report::from_snapshots(&[], &[], &BudgetLimits::new());

        assert!(report.expense_totals.is_empty());
        assert!(report.expense_shares.is_empty());
        assert!(report.expense_segments.is_empty());
        assert_eq!(report.comparison, (0.0, 0.0));
        assert!(report.budget.is_empty());
    }
}
