//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Amounts are decimals that serialize as strings
//! (`"200.00"`) and deserialize from either strings or numbers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation::{BudgetActual, CategoryTotal, PortfolioStats};
use crate::models::budget::{Budget, BudgetFields};
use crate::models::transaction::{Transaction, TransactionFields};
use crate::models::user::User;
use crate::models::{decimal_to_cents, RolloverType};
use crate::validators::{self, Validity};

#[derive(Debug)]
pub enum MessageError {
    Invalid(String),
}

impl std::error::Error for MessageError {}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<String> for MessageError {
    fn from(msg: String) -> Self {
        MessageError::Invalid(msg)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn amount_to_cents(amount: Decimal) -> Result<i64, MessageError> {
    validators::validate_amount(amount).into_result()?;
    decimal_to_cents(amount)
        .ok_or_else(|| MessageError::Invalid(String::from("Amount is too large.")))
}

// Inputs

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn validate(&self) -> Validity {
        if let Validity::Invalid(msg) = validators::validate_text_field("Name", &self.name) {
            return Validity::Invalid(msg);
        }

        if let Validity::Invalid(msg) = validators::validate_email_address(self.email.trim()) {
            return Validity::Invalid(msg);
        }

        validators::validate_password(&self.password)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetInput {
    pub category: String,
    pub amount: Decimal,
    pub month: i16,
    pub year: i32,
    #[serde(default)]
    pub rollover_type: RolloverType,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BudgetInput {
    pub fn into_fields(self) -> Result<BudgetFields, MessageError> {
        validators::validate_text_field("Category", &self.category).into_result()?;
        validators::validate_month(self.month).into_result()?;
        validators::validate_year(self.year).into_result()?;

        let amount_cents = amount_to_cents(self.amount)?;
        let notes = non_blank(self.notes);

        if let Some(notes) = &notes {
            validators::validate_notes(notes).into_result()?;
        }

        Ok(BudgetFields {
            category: self.category.trim().to_string(),
            amount_cents,
            month: self.month,
            year: self.year,
            rollover_type: self.rollover_type,
            notes,
        })
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub description: String,
    pub category: String,
    pub amount: Decimal,
    #[serde(default)]
    pub is_income: bool,
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC). Defaults to now.
    #[serde(default)]
    pub date: Option<String>,
    /// An empty string means "no budget".
    #[serde(default)]
    pub budget_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransactionInput {
    pub fn into_fields(self, now: DateTime<Utc>) -> Result<TransactionFields, MessageError> {
        validators::validate_text_field("Description", &self.description).into_result()?;
        validators::validate_text_field("Category", &self.category).into_result()?;

        let amount_cents = amount_to_cents(self.amount)?;

        let date = match non_blank(self.date) {
            Some(date) => parse_date(&date)?,
            None => now,
        };

        let budget_id = match non_blank(self.budget_id) {
            Some(id) => Some(
                Uuid::parse_str(&id)
                    .map_err(|_| MessageError::Invalid(String::from("Invalid budget ID.")))?,
            ),
            None => None,
        };

        let notes = non_blank(self.notes);

        if let Some(notes) = &notes {
            validators::validate_notes(notes).into_result()?;
        }

        Ok(TransactionFields {
            budget_id,
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            amount_cents,
            is_income: self.is_income,
            date,
            notes,
        })
    }
}

fn parse_date(date: &str) -> Result<DateTime<Utc>, MessageError> {
    if let Ok(date) = DateTime::parse_from_rfc3339(date) {
        return Ok(date.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .ok_or_else(|| {
            MessageError::Invalid(String::from(
                "Date must be an RFC 3339 timestamp or a YYYY-MM-DD date.",
            ))
        })
}

// Query strings

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct BudgetListQuery {
    pub month: Option<i16>,
    pub year: Option<i32>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct TransactionListQuery {
    pub limit: Option<i64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExchangeRateQuery {
    pub base: Option<String>,
}

// Outputs

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOutput {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserOutput {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutput {
    pub user: UserOutput,
    pub token: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetOutput {
    pub id: Uuid,
    pub category: String,
    pub amount: Decimal,
    pub month: i16,
    pub year: i32,
    pub rollover_type: RolloverType,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Budget> for BudgetOutput {
    fn from(budget: &Budget) -> Self {
        Self {
            id: budget.id,
            category: budget.category.clone(),
            amount: budget.amount(),
            month: budget.month,
            year: budget.year,
            rollover_type: budget.rollover(),
            notes: budget.notes.clone(),
            created_at: budget.created_timestamp,
            updated_at: budget.modified_timestamp,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub id: Uuid,
    pub description: String,
    pub category: String,
    pub amount: Decimal,
    pub is_income: bool,
    pub date: DateTime<Utc>,
    pub budget_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Transaction> for TransactionOutput {
    fn from(transaction: &Transaction) -> Self {
        Self {
            id: transaction.id,
            description: transaction.description.clone(),
            category: transaction.category.clone(),
            amount: transaction.amount(),
            is_income: transaction.is_income,
            date: transaction.date,
            budget_id: transaction.budget_id,
            notes: transaction.notes.clone(),
            created_at: transaction.created_timestamp,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetWithActual {
    #[serde(flatten)]
    pub budget: BudgetOutput,
    pub actual_spent: Decimal,
    pub remaining: Decimal,
    pub overage: Decimal,
    pub percentage: Decimal,
    pub is_overspent: bool,
}

impl From<&BudgetActual<'_>> for BudgetWithActual {
    fn from(actual: &BudgetActual<'_>) -> Self {
        let progress = actual.progress();

        Self {
            budget: actual.budget.into(),
            actual_spent: actual.actual_spent,
            remaining: actual.remaining(),
            overage: actual.overage(),
            percentage: progress.percentage,
            is_overspent: progress.is_overspent,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    pub budgets: Vec<BudgetWithActual>,
    pub categories: Vec<CategoryTotal>,
    pub stats: PortfolioStats,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MessageOutput {
    pub message: String,
}

impl MessageOutput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
