//! Dashboard reports derived from ledger snapshots.
//!
//! Category totals, budget utilization and chart layouts. Nothing in this
//! module reads or writes the store, callers pass in the latest snapshots.

mod aggregation;
mod budget;
mod charts;
mod report;

pub use aggregation::{
    CategoryTotals, Share, comparison_ratio, group_by_category, net_balance, proportional_shares,
    total_by_kind,
};
pub use budget::{BudgetLimits, BudgetUsage, budget_utilization};
pub use charts::{REFERENCE_ANGLE, Segment, radial_layout};
pub use report::Report;
