use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use diesel_async::pooled_connection::bb8::Pool as AsyncPool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::budget::{Budget, BudgetFields};
use crate::models::transaction::{Transaction, TransactionFields};
use crate::models::user::User;

pub mod budget;
pub mod memory;
pub mod transaction;
pub mod user;

pub type DbAsyncPool = AsyncPool<AsyncPgConnection>;
pub type DbAsyncConnection =
    bb8::PooledConnection<'static, AsyncDieselConnectionManager<AsyncPgConnection>>;

pub async fn create_db_async_pool(
    database_uri: &str,
    max_db_connections: u32,
) -> Result<DbAsyncPool, DaoError> {
    let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_uri);

    AsyncPool::builder()
        .max_size(max_db_connections)
        .build(config)
        .await
        .map_err(|e| DaoError::DbAsyncPoolFailure(e.to_string()))
}

#[derive(Debug)]
pub enum DaoError {
    DbAsyncPoolFailure(String),
    QueryFailure(diesel::result::Error),
    AlreadyExists,
}

impl DaoError {
    pub fn not_found() -> Self {
        DaoError::QueryFailure(diesel::result::Error::NotFound)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DaoError::QueryFailure(diesel::result::Error::NotFound))
    }
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbAsyncPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain async DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
            DaoError::AlreadyExists => {
                write!(f, "DaoError: Record already exists")
            }
        }
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<bb8::RunError<E>> for DaoError {
    fn from(error: bb8::RunError<E>) -> Self {
        DaoError::DbAsyncPoolFailure(error.to_string())
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BudgetFilter {
    pub month: Option<i16>,
    pub year: Option<i32>,
}

impl BudgetFilter {
    /// The date range the filter covers, if it pins down a year. A month without a year
    /// doesn't describe a contiguous range.
    pub fn period(&self) -> Option<Period> {
        match (self.month, self.year) {
            (Some(month), Some(year)) => Period::month(year, month.try_into().ok()?),
            (None, Some(year)) => Period::year(year),
            _ => None,
        }
    }
}

/// A half-open UTC date range, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    pub fn month(year: i32, month: u32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)?;
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)?
        };

        Some(Self {
            start: Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?),
            end: Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0)?),
        })
    }

    pub fn year(year: i32) -> Option<Self> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let next = NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?;

        Some(Self {
            start: Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0)?),
            end: Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0)?),
        })
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        date >= self.start && date < self.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreHealth {
    pub backend: &'static str,
    pub connections: u32,
    pub idle_connections: u32,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DaoError::AlreadyExists` if the (lowercased) email is taken.
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DaoError>;
    async fn get_user(&self, user_id: Uuid) -> Result<User, DaoError>;
    async fn get_user_by_email(&self, email: &str) -> Result<User, DaoError>;
}

/// Every operation is scoped to `user_id`. A budget owned by someone else is reported as
/// not found.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Ordered by year (newest first), then month (newest first), then category.
    async fn list_budgets(
        &self,
        user_id: Uuid,
        filter: BudgetFilter,
    ) -> Result<Vec<Budget>, DaoError>;
    async fn get_budget(&self, user_id: Uuid, budget_id: Uuid) -> Result<Budget, DaoError>;
    async fn create_budget(&self, user_id: Uuid, fields: &BudgetFields)
        -> Result<Budget, DaoError>;
    async fn update_budget(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
        fields: &BudgetFields,
    ) -> Result<Budget, DaoError>;
    async fn delete_budget(&self, user_id: Uuid, budget_id: Uuid) -> Result<(), DaoError>;
}

/// Every operation is scoped to `user_id`. A transaction owned by someone else is reported
/// as not found.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Newest first, truncated to `limit`.
    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, DaoError>;

    /// The uncapped set of transactions needed to aggregate the given budgets: everything
    /// linked to one of `budget_ids` plus everything dated inside `period`. Without a period,
    /// every transaction the user has. Newest first.
    async fn list_working_set(
        &self,
        user_id: Uuid,
        budget_ids: &[Uuid],
        period: Option<Period>,
    ) -> Result<Vec<Transaction>, DaoError>;

    async fn create_transaction(
        &self,
        user_id: Uuid,
        fields: &TransactionFields,
    ) -> Result<Transaction, DaoError>;

    /// Returns the deleted record.
    async fn delete_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, DaoError>;
}

#[async_trait]
pub trait Store: UserStore + BudgetStore + TransactionStore {
    async fn health(&self) -> Result<StoreHealth, DaoError>;
}

pub type DataStore = Arc<dyn Store>;

/// PostgreSQL-backed store. The trait impls live in the `user`, `budget`, and `transaction`
/// modules.
#[derive(Clone)]
pub struct PgStore {
    db_async_pool: DbAsyncPool,
}

impl PgStore {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health(&self) -> Result<StoreHealth, DaoError> {
        use diesel_async::RunQueryDsl;

        let mut conn = self.db_async_pool.get().await?;
        diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        drop(conn);

        let state = self.db_async_pool.state();

        Ok(StoreHealth {
            backend: "postgres",
            connections: state.connections,
            idle_connections: state.idle_connections,
        })
    }
}
