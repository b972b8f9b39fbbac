use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, QueryableByName};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cents_to_decimal;
use crate::schema::transactions;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub budget_id: Option<Uuid>,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub is_income: bool,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn amount(&self) -> Decimal {
        cents_to_decimal(self.amount_cents)
    }

    pub fn is_outflow(&self) -> bool {
        !self.is_income
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewTransaction<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub budget_id: Option<Uuid>,
    pub description: &'a str,
    pub category: &'a str,
    pub amount_cents: i64,
    pub is_income: bool,
    pub date: DateTime<Utc>,
    pub notes: Option<&'a str>,
    pub created_timestamp: DateTime<Utc>,
}

/// A transaction as submitted by the user, already validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionFields {
    pub budget_id: Option<Uuid>,
    pub description: String,
    pub category: String,
    pub amount_cents: i64,
    pub is_income: bool,
    pub date: DateTime<Utc>,
    pub notes: Option<String>,
}
