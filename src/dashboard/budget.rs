//! Budget limits and how much of each has been used.

use std::fmt;

use serde::{
    Deserialize, Deserializer, Serialize,
    de::{MapAccess, Visitor},
};

use crate::{Error, dashboard::aggregation::CategoryTotals};

/// Spending limits per category, in the order they were given.
///
/// Limits are supplied from outside the ledger, usually from a JSON object
/// such as `{"Food": 500, "Rent": 1500}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BudgetLimits(Vec<(String, f64)>);

impl BudgetLimits {
    /// An empty set of limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit for `category`, replacing any previous limit.
    pub fn with_limit(mut self, category: &str, limit: f64) -> Self {
        match self.0.iter_mut().find(|(name, _)| name == category) {
            Some((_, existing)) => *existing = limit,
            None => self.0.push((category.to_owned(), limit)),
        }

        self
    }

    /// The limit for `category`, if one is set.
    pub fn get(&self, category: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == category)
            .map(|(_, limit)| *limit)
    }

    /// Categories and their limits in the order they were given.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, limit)| (name.as_str(), *limit))
    }

    /// Whether no limits are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse limits from a JSON object mapping category names to numbers.
    ///
    /// # Errors
    /// Returns an [Error::InvalidConfig] if `json` is not such an object.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|error| Error::InvalidConfig(error.to_string()))
    }
}

impl<'de> Deserialize<'de> for BudgetLimits {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LimitsVisitor;

        impl<'de> Visitor<'de> for LimitsVisitor {
            type Value = BudgetLimits;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping category names to limits")
            }

            fn visit_map<A>(self, mut map: A) -> Result<BudgetLimits, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut limits = BudgetLimits::new();

                while let Some((category, limit)) = map.next_entry::<String, f64>()? {
                    limits = limits.with_limit(&category, limit);
                }

                Ok(limits)
            }
        }

        deserializer.deserialize_map(LimitsVisitor)
    }
}

/// How much of one category's budget has been spent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetUsage {
    /// The budgeted category.
    pub category: String,
    /// The amount spent in the category.
    pub spent: f64,
    /// The budget limit for the category.
    pub limit: f64,
    /// `spent / limit`, or 0 when the limit is not positive. Not clamped to 1.
    pub ratio: f64,
    /// How far spending has gone past the limit, 0 if it has not.
    pub over_by: f64,
}

/// Compare spending against budget limits.
///
/// # Returns
/// One entry per budgeted category in the order of `limits`. A category with
/// no spending counts as zero spent.
pub fn budget_utilization(spent: &CategoryTotals, limits: &BudgetLimits) -> Vec<BudgetUsage> {
    limits
        .iter()
        .map(|(category, limit)| {
            let spent = spent.get(category).unwrap_or(0.0);
            let ratio = if limit > 0.0 { spent / limit } else { 0.0 };

            BudgetUsage {
                category: category.to_owned(),
                spent,
                limit,
                ratio,
                over_by: (spent - limit).max(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::{Error, dashboard::aggregation::CategoryTotals};

    use super::{BudgetLimits, budget_utilization};

    #[test]
    fn overspending_is_not_clamped() {
        let spent: CategoryTotals = [("Food", 600.0)].into_iter().collect();
        let limits = BudgetLimits::new().with_limit("Food", 500.0);

        let usage = budget_utilization(&spent, &limits);

        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].ratio, 1.2);
        assert_eq!(usage[0].over_by, 100.0);
    }

    #[test]
    fn zero_limit_gives_zero_ratio() {
        let spent: CategoryTotals = [("Gifts", 80.0)].into_iter().collect();
        let limits = BudgetLimits::new().with_limit("Gifts", 0.0);

        let usage = budget_utilization(&spent, &limits);

        assert_eq!(usage[0].ratio, 0.0);
        assert_eq!(usage[0].over_by, 80.0);
    }

    #[test]
    fn unspent_category_counts_as_zero() {
        let limits = BudgetLimits::new()
            .with_limit("Rent", 1500.0)
            .with_limit("Food", 500.0);

        let usage = budget_utilization(&CategoryTotals::default(), &limits);

        let categories: Vec<_> = usage.iter().map(|usage| usage.category.as_str()).collect();
        assert_eq!(categories, vec!["Rent", "Food"]);
        assert!(
            usage
                .iter()
                .all(|usage| usage.spent == 0.0 && usage.ratio == 0.0)
        );
    }

    #[test]
    fn from_json_keeps_file_order() {
        let limits =
            BudgetLimits::from_json(r#"{"Rent": 1500, "Food": 500, "Transport": 300.5}"#).unwrap();

        assert_eq!(
            limits.iter().collect::<Vec<_>>(),
            vec![("Rent", 1500.0), ("Food", 500.0), ("Transport", 300.5)]
        );
    }

    #[test]
    fn from_json_rejects_non_numeric_limit() {
        let result = BudgetLimits::from_json(r#"{"Food": "lots"}"#);

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
