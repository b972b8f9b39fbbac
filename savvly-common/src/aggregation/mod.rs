//! Budget-vs-actual aggregation.
//!
//! Everything in this module is a pure function over records that have already been loaded
//! for a single user. Spent amounts are never persisted; they are recomputed from the
//! transaction set every time they are needed.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::budget::Budget;
use crate::models::transaction::Transaction;

const PERCENTAGE_DECIMAL_PLACES: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub percentage: Decimal,
    pub is_overspent: bool,
}

#[derive(Clone, Debug)]
pub struct BudgetActual<'a> {
    pub budget: &'a Budget,
    pub actual_spent: Decimal,
}

impl BudgetActual<'_> {
    /// May be negative when the budget is overspent.
    pub fn remaining(&self) -> Decimal {
        self.budget.amount() - self.actual_spent
    }

    pub fn overage(&self) -> Decimal {
        (self.actual_spent - self.budget.amount()).max(Decimal::ZERO)
    }

    pub fn progress(&self) -> Progress {
        compute_progress(self.budget.amount(), self.actual_spent)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioStats {
    pub total_budgeted: Decimal,
    pub total_spent: Decimal,
    pub remaining: Decimal,
    pub overspent_count: usize,
    pub inflow: Decimal,
    pub outflow: Decimal,
    pub net_flow: Decimal,
    pub budget_progress: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub budgeted: Decimal,
    pub spent: Decimal,
    pub budget_count: usize,
}

/// Pairs every budget with the sum of the outflow transactions linked to it. Output order
/// matches `budgets`. Income and transactions with a dangling or absent `budget_id` are
/// ignored.
pub fn compute_budget_actuals<'a>(
    budgets: &'a [Budget],
    transactions: &[Transaction],
) -> Vec<BudgetActual<'a>> {
    let mut spent_by_budget: HashMap<Uuid, Decimal> = HashMap::with_capacity(budgets.len());

    for transaction in transactions.iter().filter(|t| t.is_outflow()) {
        if let Some(budget_id) = transaction.budget_id {
            *spent_by_budget.entry(budget_id).or_default() += transaction.amount();
        }
    }

    budgets
        .iter()
        .map(|budget| BudgetActual {
            budget,
            actual_spent: spent_by_budget
                .get(&budget.id)
                .copied()
                .unwrap_or(Decimal::ZERO),
        })
        .collect()
}

/// Percentage of `amount` used by `actual_spent`, clamped to `[0, 100]`. A zero (or
/// negative) amount yields 0% rather than a division fault. `is_overspent` compares the raw
/// values, so it stays true even when the percentage is clamped.
pub fn compute_progress(amount: Decimal, actual_spent: Decimal) -> Progress {
    Progress {
        percentage: clamped_percentage(actual_spent, amount),
        is_overspent: actual_spent > amount,
    }
}

/// Portfolio totals over a set of budgets and the transaction working set loaded alongside
/// them. Inflow and outflow cover every transaction in the set, linked or not.
pub fn compute_portfolio_stats(
    budgets: &[Budget],
    transactions: &[Transaction],
) -> PortfolioStats {
    let actuals = compute_budget_actuals(budgets, transactions);
    stats_from_actuals(&actuals, transactions)
}

pub fn stats_from_actuals(
    actuals: &[BudgetActual],
    transactions: &[Transaction],
) -> PortfolioStats {
    let mut total_budgeted = Decimal::ZERO;
    let mut total_spent = Decimal::ZERO;
    let mut overspent_count = 0;

    for actual in actuals {
        total_budgeted += actual.budget.amount();
        total_spent += actual.actual_spent;

        if actual.progress().is_overspent {
            overspent_count += 1;
        }
    }

    let mut inflow = Decimal::ZERO;
    let mut outflow = Decimal::ZERO;

    for transaction in transactions {
        if transaction.is_income {
            inflow += transaction.amount();
        } else {
            outflow += transaction.amount();
        }
    }

    PortfolioStats {
        total_budgeted,
        total_spent,
        remaining: total_budgeted - total_spent,
        overspent_count,
        inflow,
        outflow,
        net_flow: inflow - outflow,
        budget_progress: clamped_percentage(total_spent, total_budgeted),
    }
}

/// Budgeted and spent totals per category. Categories are matched case-insensitively (after
/// trimming); the display name is taken from the first budget seen for that category.
/// Output is sorted by the normalized category name.
pub fn group_by_category(actuals: &[BudgetActual]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<String, CategoryTotal> = HashMap::new();

    for actual in actuals {
        let key = actual.budget.category.trim().to_lowercase();
        let total = totals.entry(key).or_insert_with(|| CategoryTotal {
            category: actual.budget.category.trim().to_string(),
            budgeted: Decimal::ZERO,
            spent: Decimal::ZERO,
            budget_count: 0,
        });

        total.budgeted += actual.budget.amount();
        total.spent += actual.actual_spent;
        total.budget_count += 1;
    }

    let mut totals = totals.into_iter().collect::<Vec<_>>();
    totals.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
    totals.into_iter().map(|(_, total)| total).collect()
}

fn clamped_percentage(part: Decimal, whole: Decimal) -> Decimal {
    const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    // Overflow only happens when `part` dwarfs `whole`, which clamps to 100 anyway
    let percentage = part
        .checked_div(whole)
        .and_then(|ratio| ratio.checked_mul(HUNDRED))
        .unwrap_or(HUNDRED);

    percentage
        .clamp(Decimal::ZERO, HUNDRED)
        .round_dp(PERCENTAGE_DECIMAL_PLACES)
}
