use async_trait::async_trait;
use chrono::Utc;
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::db::{BudgetFilter, BudgetStore, DaoError, PgStore};
use crate::models::budget::{Budget, BudgetChangeset, BudgetFields, NewBudget};

use crate::schema::budgets as budget_fields;
use crate::schema::budgets::dsl::budgets;

#[async_trait]
impl BudgetStore for PgStore {
    async fn list_budgets(
        &self,
        user_id: Uuid,
        filter: BudgetFilter,
    ) -> Result<Vec<Budget>, DaoError> {
        let mut query = budgets
            .filter(budget_fields::user_id.eq(user_id))
            .into_boxed();

        if let Some(month) = filter.month {
            query = query.filter(budget_fields::month.eq(month));
        }

        if let Some(year) = filter.year {
            query = query.filter(budget_fields::year.eq(year));
        }

        let mut conn = self.db_async_pool.get().await?;

        Ok(query
            .order((
                budget_fields::year.desc(),
                budget_fields::month.desc(),
                budget_fields::category.asc(),
            ))
            .load::<Budget>(&mut conn)
            .await?)
    }

    async fn get_budget(&self, user_id: Uuid, budget_id: Uuid) -> Result<Budget, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(budgets
            .filter(
                budget_fields::id
                    .eq(budget_id)
                    .and(budget_fields::user_id.eq(user_id)),
            )
            .first::<Budget>(&mut conn)
            .await?)
    }

    async fn create_budget(
        &self,
        user_id: Uuid,
        fields: &BudgetFields,
    ) -> Result<Budget, DaoError> {
        let current_time = Utc::now();

        let new_budget = NewBudget {
            id: Uuid::now_v7(),
            user_id,
            category: &fields.category,
            amount_cents: fields.amount_cents,
            month: fields.month,
            year: fields.year,
            rollover_type: fields.rollover_type.into(),
            notes: fields.notes.as_deref(),
            created_timestamp: current_time,
            modified_timestamp: current_time,
        };

        let mut conn = self.db_async_pool.get().await?;

        Ok(dsl::insert_into(budgets)
            .values(&new_budget)
            .get_result::<Budget>(&mut conn)
            .await?)
    }

    async fn update_budget(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
        fields: &BudgetFields,
    ) -> Result<Budget, DaoError> {
        let changeset = BudgetChangeset {
            category: &fields.category,
            amount_cents: fields.amount_cents,
            month: fields.month,
            year: fields.year,
            rollover_type: fields.rollover_type.into(),
            notes: fields.notes.as_deref(),
            modified_timestamp: Utc::now(),
        };

        let mut conn = self.db_async_pool.get().await?;

        // An UPDATE ... RETURNING that matches no rows surfaces as NotFound
        Ok(dsl::update(
            budgets.filter(
                budget_fields::id
                    .eq(budget_id)
                    .and(budget_fields::user_id.eq(user_id)),
            ),
        )
        .set(&changeset)
        .get_result::<Budget>(&mut conn)
        .await?)
    }

    async fn delete_budget(&self, user_id: Uuid, budget_id: Uuid) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        let deleted_count = dsl::delete(
            budgets.filter(
                budget_fields::id
                    .eq(budget_id)
                    .and(budget_fields::user_id.eq(user_id)),
            ),
        )
        .execute(&mut conn)
        .await?;

        if deleted_count == 0 {
            return Err(DaoError::not_found());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils::{self, budget_fields};

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database"]
    async fn test_list_budgets_ordering_and_filter() {
        let store = test_utils::pg_store().await;
        let user_id = test_utils::create_user(&store).await;
        let other_id = test_utils::create_user(&store).await;

        for (category, month, year) in [
            ("Rent", 1, 2025),
            ("Food", 3, 2024),
            ("Fun", 3, 2025),
            ("Bills", 3, 2025),
        ] {
            store
                .create_budget(user_id, &budget_fields(category, month, year))
                .await
                .unwrap();
        }

        store
            .create_budget(other_id, &budget_fields("Other user", 3, 2025))
            .await
            .unwrap();

        let list = store
            .list_budgets(user_id, BudgetFilter::default())
            .await
            .unwrap();
        let categories = list.iter().map(|b| b.category.as_str()).collect::<Vec<_>>();
        assert_eq!(categories, ["Bills", "Fun", "Rent", "Food"]);

        let list = store
            .list_budgets(
                user_id,
                BudgetFilter {
                    month: Some(3),
                    year: Some(2025),
                },
            )
            .await
            .unwrap();
        let categories = list.iter().map(|b| b.category.as_str()).collect::<Vec<_>>();
        assert_eq!(categories, ["Bills", "Fun"]);

        let list = store
            .list_budgets(
                user_id,
                BudgetFilter {
                    month: Some(3),
                    year: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(list.len(), 3);

        test_utils::delete_user(&store, user_id).await;
        test_utils::delete_user(&store, other_id).await;
    }

    #[tokio::test]
    #[ignore = "requires a migrated PostgreSQL database"]
    async fn test_budget_edit_and_ownership() {
        let store = test_utils::pg_store().await;
        let owner_id = test_utils::create_user(&store).await;
        let other_id = test_utils::create_user(&store).await;

        let mut fields = budget_fields("Groceries", 4, 2025);
        fields.notes = Some(String::from("Costco"));

        let budget = store.create_budget(owner_id, &fields).await.unwrap();
        assert_eq!(budget.notes.as_deref(), Some("Costco"));
        assert_eq!(budget.amount_cents, 20000);

        assert!(store
            .get_budget(other_id, budget.id)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .update_budget(other_id, budget.id, &fields)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .delete_budget(other_id, budget.id)
            .await
            .unwrap_err()
            .is_not_found());

        fields.amount_cents = 35050;
        fields.notes = None;

        let updated = store
            .update_budget(owner_id, budget.id, &fields)
            .await
            .unwrap();
        assert_eq!(updated.id, budget.id);
        assert_eq!(updated.amount_cents, 35050);
        assert_eq!(updated.notes, None);
        assert!(updated.modified_timestamp >= budget.modified_timestamp);
        assert_eq!(updated.created_timestamp, budget.created_timestamp);

        let fetched = store.get_budget(owner_id, budget.id).await.unwrap();
        assert_eq!(fetched.notes, None);

        assert!(store
            .update_budget(owner_id, Uuid::now_v7(), &fields)
            .await
            .unwrap_err()
            .is_not_found());

        store.delete_budget(owner_id, budget.id).await.unwrap();
        assert!(store
            .get_budget(owner_id, budget.id)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store
            .delete_budget(owner_id, budget.id)
            .await
            .unwrap_err()
            .is_not_found());

        test_utils::delete_user(&store, owner_id).await;
        test_utils::delete_user(&store, other_id).await;
    }
}
