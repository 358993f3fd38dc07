//! Expense summary for the dashboard

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::Expense;

/// Group name for expenses without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExpenseSummary {
    pub count: usize,
    pub total: f64,
    /// Ordered by total, largest first; ties by name
    pub by_category: Vec<CategoryTotal>,
    pub month_total: f64,
    pub latest_date: Option<NaiveDate>,
}

impl ExpenseSummary {
    /// Summarize `expenses`; the month total covers the month containing `today`
    pub fn compute(expenses: &[Expense], today: NaiveDate) -> Self {
        let mut groups: HashMap<&str, CategoryTotal> = HashMap::new();
        let mut summary = Self {
            count: expenses.len(),
            ..Self::default()
        };

        for expense in expenses {
            summary.total += expense.amount;

            if expense.date.year() == today.year() && expense.date.month() == today.month() {
                summary.month_total += expense.amount;
            }

            summary.latest_date = summary.latest_date.max(Some(expense.date));

            let name = expense.category_label().unwrap_or(UNCATEGORIZED);
            let group = groups.entry(name).or_insert_with(|| CategoryTotal {
                category: name.to_string(),
                total: 0.0,
                count: 0,
            });
            group.total += expense.amount;
            group.count += 1;
        }

        let mut by_category: Vec<_> = groups.into_values().collect();
        by_category.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.category.cmp(&b.category))
        });
        summary.by_category = by_category;

        summary
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
