use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable, QueryableByName};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{cents_to_decimal, RolloverType};
use crate::schema::budgets;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = budgets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub amount_cents: i64,
    pub month: i16,
    pub year: i32,
    pub rollover_type: i16,
    pub notes: Option<String>,
    pub created_timestamp: DateTime<Utc>,
    pub modified_timestamp: DateTime<Utc>,
}

impl Budget {
    pub fn amount(&self) -> Decimal {
        cents_to_decimal(self.amount_cents)
    }

    pub fn rollover(&self) -> RolloverType {
        RolloverType::try_from(self.rollover_type).unwrap_or_default()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = budgets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBudget<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: &'a str,
    pub amount_cents: i64,
    pub month: i16,
    pub year: i32,
    pub rollover_type: i16,
    pub notes: Option<&'a str>,
    pub created_timestamp: DateTime<Utc>,
    pub modified_timestamp: DateTime<Utc>,
}

// Edits replace every user-supplied field, so `notes: None` clears the column
#[derive(Debug, AsChangeset)]
#[diesel(table_name = budgets)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BudgetChangeset<'a> {
    pub category: &'a str,
    pub amount_cents: i64,
    pub month: i16,
    pub year: i32,
    pub rollover_type: i16,
    pub notes: Option<&'a str>,
    pub modified_timestamp: DateTime<Utc>,
}

/// The user-editable part of a budget, already validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetFields {
    pub category: String,
    pub amount_cents: i64,
    pub month: i16,
    pub year: i32,
    pub rollover_type: RolloverType,
    pub notes: Option<String>,
}
