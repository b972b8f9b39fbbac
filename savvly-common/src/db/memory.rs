use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::{
    BudgetFilter, BudgetStore, DaoError, Period, Store, StoreHealth, TransactionStore, UserStore,
};
use crate::models::budget::{Budget, BudgetFields};
use crate::models::transaction::{Transaction, TransactionFields};
use crate::models::user::User;

/// A process-local store with the same ordering and ownership semantics as `PgStore`.
/// Nothing is persisted across restarts.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    budgets: RwLock<HashMap<Uuid, Budget>>,
    transactions: RwLock<HashMap<Uuid, Transaction>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_newest_first(list: &mut [Transaction]) {
    list.sort_unstable_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_timestamp.cmp(&a.created_timestamp))
            .then_with(|| b.id.cmp(&a.id))
    });
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DaoError> {
        let email_lowercase = email.to_lowercase();
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == email_lowercase) {
            return Err(DaoError::AlreadyExists);
        }

        let user = User {
            id: Uuid::now_v7(),
            name: name.to_string(),
            email: email_lowercase,
            password_hash: password_hash.to_string(),
            created_timestamp: Utc::now(),
        };

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User, DaoError> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or_else(DaoError::not_found)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, DaoError> {
        let email_lowercase = email.to_lowercase();

        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email_lowercase)
            .cloned()
            .ok_or_else(DaoError::not_found)
    }
}

#[async_trait]
impl BudgetStore for MemoryStore {
    async fn list_budgets(
        &self,
        user_id: Uuid,
        filter: BudgetFilter,
    ) -> Result<Vec<Budget>, DaoError> {
        let mut list = self
            .budgets
            .read()
            .await
            .values()
            .filter(|b| b.user_id == user_id)
            .filter(|b| filter.month.is_none_or(|month| b.month == month))
            .filter(|b| filter.year.is_none_or(|year| b.year == year))
            .cloned()
            .collect::<Vec<_>>();

        list.sort_unstable_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| b.month.cmp(&a.month))
                .then_with(|| a.category.cmp(&b.category))
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(list)
    }

    async fn get_budget(&self, user_id: Uuid, budget_id: Uuid) -> Result<Budget, DaoError> {
        self.budgets
            .read()
            .await
            .get(&budget_id)
            .filter(|b| b.user_id == user_id)
            .cloned()
            .ok_or_else(DaoError::not_found)
    }

    async fn create_budget(
        &self,
        user_id: Uuid,
        fields: &BudgetFields,
    ) -> Result<Budget, DaoError> {
        let current_time = Utc::now();

        let budget = Budget {
            id: Uuid::now_v7(),
            user_id,
            category: fields.category.clone(),
            amount_cents: fields.amount_cents,
            month: fields.month,
            year: fields.year,
            rollover_type: fields.rollover_type.into(),
            notes: fields.notes.clone(),
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        self.budgets.write().await.insert(budget.id, budget.clone());
        Ok(budget)
    }

    async fn update_budget(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
        fields: &BudgetFields,
    ) -> Result<Budget, DaoError> {
        let mut budgets = self.budgets.write().await;

        let budget = budgets
            .get_mut(&budget_id)
            .filter(|b| b.user_id == user_id)
            .ok_or_else(DaoError::not_found)?;

        budget.category = fields.category.clone();
        budget.amount_cents = fields.amount_cents;
        budget.month = fields.month;
        budget.year = fields.year;
        budget.rollover_type = fields.rollover_type.into();
        budget.notes = fields.notes.clone();
        budget.modified_timestamp = Utc::now();

        Ok(budget.clone())
    }

    async fn delete_budget(&self, user_id: Uuid, budget_id: Uuid) -> Result<(), DaoError> {
        let mut budgets = self.budgets.write().await;

        match budgets.get(&budget_id) {
            Some(b) if b.user_id == user_id => {
                budgets.remove(&budget_id);
                Ok(())
            }
            _ => Err(DaoError::not_found()),
        }
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, DaoError> {
        let mut list = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();

        sort_newest_first(&mut list);
        list.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(list)
    }

    async fn list_working_set(
        &self,
        user_id: Uuid,
        budget_ids: &[Uuid],
        period: Option<Period>,
    ) -> Result<Vec<Transaction>, DaoError> {
        let is_in_working_set = |t: &Transaction| match period {
            Some(period) => {
                t.budget_id.is_some_and(|id| budget_ids.contains(&id)) || period.contains(t.date)
            }
            None => true,
        };

        let mut list = self
            .transactions
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id && is_in_working_set(t))
            .cloned()
            .collect::<Vec<_>>();

        sort_newest_first(&mut list);

        Ok(list)
    }

    async fn create_transaction(
        &self,
        user_id: Uuid,
        fields: &TransactionFields,
    ) -> Result<Transaction, DaoError> {
        let transaction = Transaction {
            id: Uuid::now_v7(),
            user_id,
            budget_id: fields.budget_id,
            description: fields.description.clone(),
            category: fields.category.clone(),
            amount_cents: fields.amount_cents,
            is_income: fields.is_income,
            date: fields.date,
            notes: fields.notes.clone(),
            created_timestamp: Utc::now(),
        };

        self.transactions
            .write()
            .await
            .insert(transaction.id, transaction.clone());

        Ok(transaction)
    }

    async fn delete_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, DaoError> {
        let mut transactions = self.transactions.write().await;

        match transactions.get(&transaction_id) {
            Some(t) if t.user_id == user_id => transactions
                .remove(&transaction_id)
                .ok_or_else(DaoError::not_found),
            _ => Err(DaoError::not_found()),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health(&self) -> Result<StoreHealth, DaoError> {
        Ok(StoreHealth {
            backend: "memory",
            connections: 0,
            idle_connections: 0,
        })
    }
}
