use savvly_common::aggregation;
use savvly_common::db::{BudgetFilter, BudgetStore, DataStore, TransactionStore};
use savvly_common::messages::{
    BudgetInput, BudgetListQuery, BudgetOutput, BudgetSummary, BudgetWithActual, MessageOutput,
};
use savvly_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use std::borrow::Cow;
use uuid::Uuid;

use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::VerifiedToken;

pub async fn list(
    data_store: web::Data<DataStore>,
    user_access_token: VerifiedToken,
    query: web::Query<BudgetListQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let filter = budget_filter(&query)?;

    let budgets = data_store
        .list_budgets(user_access_token.claims.user_id, filter)
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Budget))?;

    let output = budgets.iter().map(BudgetOutput::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(output))
}

pub async fn get(
    data_store: web::Data<DataStore>,
    user_access_token: VerifiedToken,
    budget_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let budget = data_store
        .get_budget(user_access_token.claims.user_id, budget_id.into_inner())
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Budget))?;

    Ok(HttpResponse::Ok().json(BudgetOutput::from(&budget)))
}

pub async fn create(
    data_store: web::Data<DataStore>,
    user_access_token: VerifiedToken,
    budget_data: web::Json<BudgetInput>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let fields = budget_data.into_inner().into_fields()?;

    let budget = data_store
        .create_budget(user_access_token.claims.user_id, &fields)
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Budget))?;

    Ok(HttpResponse::Created().json(BudgetOutput::from(&budget)))
}

pub async fn edit(
    data_store: web::Data<DataStore>,
    user_access_token: VerifiedToken,
    budget_id: web::Path<Uuid>,
    budget_data: web::Json<BudgetInput>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let fields = budget_data.into_inner().into_fields()?;

    let budget = data_store
        .update_budget(
            user_access_token.claims.user_id,
            budget_id.into_inner(),
            &fields,
        )
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Budget))?;

    Ok(HttpResponse::Ok().json(BudgetOutput::from(&budget)))
}

pub async fn delete(
    data_store: web::Data<DataStore>,
    user_access_token: VerifiedToken,
    budget_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    data_store
        .delete_budget(user_access_token.claims.user_id, budget_id.into_inner())
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Budget))?;

    Ok(HttpResponse::Ok().json(MessageOutput::new("Budget deleted successfully")))
}

/// Budgets matching the filter, each with its actual spend, plus per-category and portfolio
/// totals. Everything is computed from a fresh read of the store.
pub async fn summary(
    data_store: web::Data<DataStore>,
    user_access_token: VerifiedToken,
    query: web::Query<BudgetListQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let filter = budget_filter(&query)?;

    let budgets = data_store
        .list_budgets(user_id, filter)
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Budget))?;

    let budget_ids = budgets.iter().map(|b| b.id).collect::<Vec<_>>();

    let transactions = data_store
        .list_working_set(user_id, &budget_ids, filter.period())
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Transaction))?;

    let actuals = aggregation::compute_budget_actuals(&budgets, &transactions);

    let output = BudgetSummary {
        budgets: actuals.iter().map(BudgetWithActual::from).collect(),
        categories: aggregation::group_by_category(&actuals),
        stats: aggregation::stats_from_actuals(&actuals, &transactions),
    };

    Ok(HttpResponse::Ok().json(output))
}

fn budget_filter(query: &BudgetListQuery) -> Result<BudgetFilter, HttpErrorResponse> {
    if let Some(month) = query.month {
        if let Validity::Invalid(msg) = validators::validate_month(month) {
            return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Owned(msg)));
        }
    }

    if let Some(year) = query.year {
        if let Validity::Invalid(msg) = validators::validate_year(year) {
            return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Owned(msg)));
        }
    }

    Ok(BudgetFilter {
        month: query.month,
        year: query.year,
    })
}
