use async_trait::async_trait;
use chrono::Utc;
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{DaoError, PgStore, Period, TransactionStore};
use crate::models::transaction::{NewTransaction, Transaction, TransactionFields};

use crate::schema::transactions as transaction_fields;
use crate::schema::transactions::dsl::transactions;

#[async_trait]
impl TransactionStore for PgStore {
    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Transaction>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(transactions
            .filter(transaction_fields::user_id.eq(user_id))
            .order((
                transaction_fields::date.desc(),
                transaction_fields::created_timestamp.desc(),
            ))
            .limit(limit)
            .load::<Transaction>(&mut conn)
            .await?)
    }

    async fn list_working_set(
        &self,
        user_id: Uuid,
        budget_ids: &[Uuid],
        period: Option<Period>,
    ) -> Result<Vec<Transaction>, DaoError> {
        let mut query = transactions
            .filter(transaction_fields::user_id.eq(user_id))
            .into_boxed();

        if let Some(period) = period {
            query = query.filter(
                transaction_fields::budget_id
                    .eq_any(budget_ids.to_vec())
                    .or(transaction_fields::date
                        .ge(period.start)
                        .and(transaction_fields::date.lt(period.end))),
            );
        }

        let mut conn = self.db_async_pool.get().await?;

        Ok(query
            .order((
                transaction_fields::date.desc(),
                transaction_fields::created_timestamp.desc(),
            ))
            .load::<Transaction>(&mut conn)
            .await?)
    }

    async fn create_transaction(
        &self,
        user_id: Uuid,
        fields: &TransactionFields,
    ) -> Result<Transaction, DaoError> {
        let new_transaction = NewTransaction {
            id: Uuid::now_v7(),
            user_id,
            budget_id: fields.budget_id,
            description: &fields.description,
            category: &fields.category,
            amount_cents: fields.amount_cents,
            is_income: fields.is_income,
            date: fields.date,
            notes: fields.notes.as_deref(),
            created_timestamp: Utc::now(),
        };

        let mut conn = self.db_async_pool.get().await?;

        Ok(dsl::insert_into(transactions)
            .values(&new_transaction)
            .get_result::<Transaction>(&mut conn)
            .await?)
    }

    async fn delete_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<Transaction, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(dsl::delete(
            transactions.filter(
                transaction_fields::id
                    .eq(transaction_id)
                    .and(transaction_fields::user_id.eq(user_id)),
            ),
        )
        .get_result::<Transaction>(&mut conn)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils::{self, budget_fields, day, transaction_fields};
    use crate::db::BudgetStore;

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database"]
    async fn test_list_transactions_ordering_and_limit() {
        let store = test_utils::pg_store().await;
        let user_id = test_utils::create_user(&store).await;
        let other_id = test_utils::create_user(&store).await;

        let middle = store
            .create_transaction(user_id, &transaction_fields(None, 100, day(2025, 3, 10)))
            .await
            .unwrap();
        let newest = store
            .create_transaction(user_id, &transaction_fields(None, 200, day(2025, 3, 20)))
            .await
            .unwrap();
        let oldest = store
            .create_transaction(user_id, &transaction_fields(None, 300, day(2025, 3, 1)))
            .await
            .unwrap();
        store
            .create_transaction(other_id, &transaction_fields(None, 400, day(2025, 3, 15)))
            .await
            .unwrap();

        let list = store.list_transactions(user_id, 50).await.unwrap();
        let ids = list.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids, [newest.id, middle.id, oldest.id]);

        let list = store.list_transactions(user_id, 2).await.unwrap();
        let ids = list.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids, [newest.id, middle.id]);

        test_utils::delete_user(&store, user_id).await;
        test_utils::delete_user(&store, other_id).await;
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database"]
    async fn test_working_set_includes_linked_transactions_outside_period() {
        let store = test_utils::pg_store().await;
        let user_id = test_utils::create_user(&store).await;
        let other_id = test_utils::create_user(&store).await;

        let budget = store
            .create_budget(user_id, &budget_fields("Food", 3, 2025))
            .await
            .unwrap();

        let linked_early = store
            .create_transaction(
                user_id,
                &transaction_fields(Some(budget.id), 1500, day(2024, 11, 2)),
            )
            .await
            .unwrap();
        let in_period = store
            .create_transaction(user_id, &transaction_fields(None, 700, day(2025, 3, 31)))
            .await
            .unwrap();
        let outside = store
            .create_transaction(user_id, &transaction_fields(None, 900, day(2025, 4, 1)))
            .await
            .unwrap();
        store
            .create_transaction(other_id, &transaction_fields(None, 800, day(2025, 3, 5)))
            .await
            .unwrap();

        let period = Period::month(2025, 3);

        let working_set = store
            .list_working_set(user_id, &[budget.id], period)
            .await
            .unwrap();
        let ids = working_set.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids, [in_period.id, linked_early.id]);

        let working_set = store.list_working_set(user_id, &[], period).await.unwrap();
        let ids = working_set.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids, [in_period.id]);

        let working_set = store
            .list_working_set(user_id, &[budget.id], None)
            .await
            .unwrap();
        let ids = working_set.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids, [outside.id, in_period.id, linked_early.id]);

        test_utils::delete_user(&store, user_id).await;
        test_utils::delete_user(&store, other_id).await;
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database"]
    async fn test_delete_transaction_and_dangling_budget_link() {
        let store = test_utils::pg_store().await;
        let owner_id = test_utils::create_user(&store).await;
        let other_id = test_utils::create_user(&store).await;

        let budget = store
            .create_budget(owner_id, &budget_fields("Food", 3, 2025))
            .await
            .unwrap();
        let transaction = store
            .create_transaction(
                owner_id,
                &transaction_fields(Some(budget.id), 1200, day(2025, 3, 4)),
            )
            .await
            .unwrap();

        // The link is loose: it survives the budget and may point nowhere
        store.delete_budget(owner_id, budget.id).await.unwrap();
        let list = store.list_transactions(owner_id, 10).await.unwrap();
        assert_eq!(list[0].budget_id, Some(budget.id));

        let missing_budget = Uuid::now_v7();
        let dangling = store
            .create_transaction(
                owner_id,
                &transaction_fields(Some(missing_budget), 50, day(2025, 3, 5)),
            )
            .await
            .unwrap();
        assert_eq!(dangling.budget_id, Some(missing_budget));

        assert!(store
            .delete_transaction(other_id, transaction.id)
            .await
            .unwrap_err()
            .is_not_found());

        let deleted = store
            .delete_transaction(owner_id, transaction.id)
            .await
            .unwrap();
        assert_eq!(deleted.id, transaction.id);
        assert_eq!(deleted.amount_cents, 1200);

        assert!(store
            .delete_transaction(owner_id, transaction.id)
            .await
            .unwrap_err()
            .is_not_found());

        test_utils::delete_user(&store, owner_id).await;
        test_utils::delete_user(&store, other_id).await;
    }
}
