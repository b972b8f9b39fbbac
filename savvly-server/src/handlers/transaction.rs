use savvly_common::db::{BudgetStore, DataStore, TransactionStore};
use savvly_common::events::{LedgerEvent, LedgerEvents};
use savvly_common::messages::{
    MessageOutput, TransactionInput, TransactionListQuery, TransactionOutput,
};

use actix_web::{web, HttpResponse};
use chrono::Utc;
use std::borrow::Cow;
use uuid::Uuid;

use crate::env;
use crate::handlers::error::{DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::VerifiedToken;

pub async fn list(
    data_store: web::Data<DataStore>,
    user_access_token: VerifiedToken,
    query: web::Query<TransactionListQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let limit = query.limit.unwrap_or(env::CONF.default_transaction_limit);

    if limit < 1 || limit > env::CONF.max_transaction_limit {
        return Err(HttpErrorResponse::IncorrectlyFormed(Cow::Owned(format!(
            "Limit must be between 1 and {}",
            env::CONF.max_transaction_limit
        ))));
    }

    let transactions = data_store
        .list_transactions(user_access_token.claims.user_id, limit)
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Transaction))?;

    let output = transactions
        .iter()
        .map(TransactionOutput::from)
        .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(output))
}

pub async fn create(
    data_store: web::Data<DataStore>,
    ledger_events: web::Data<LedgerEvents>,
    user_access_token: VerifiedToken,
    transaction_data: web::Json<TransactionInput>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;
    let fields = transaction_data.into_inner().into_fields(Utc::now())?;

    // A transaction may only be linked to one of the caller's own budgets
    if let Some(budget_id) = fields.budget_id {
        data_store
            .get_budget(user_id, budget_id)
            .await
            .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Budget))?;
    }

    let transaction = data_store
        .create_transaction(user_id, &fields)
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Transaction))?;

    ledger_events.publish(LedgerEvent::TransactionCreated {
        user_id,
        transaction_id: transaction.id,
        budget_id: transaction.budget_id,
    });

    Ok(HttpResponse::Created().json(TransactionOutput::from(&transaction)))
}

pub async fn delete(
    data_store: web::Data<DataStore>,
    ledger_events: web::Data<LedgerEvents>,
    user_access_token: VerifiedToken,
    transaction_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let transaction = data_store
        .delete_transaction(user_id, transaction_id.into_inner())
        .await
        .map_err(|e| HttpErrorResponse::from_dao(e, DoesNotExistType::Transaction))?;

    ledger_events.publish(LedgerEvent::TransactionDeleted {
        user_id,
        transaction_id: transaction.id,
        budget_id: transaction.budget_id,
    });

    Ok(HttpResponse::Ok().json(MessageOutput::new("Transaction deleted successfully")))
}
