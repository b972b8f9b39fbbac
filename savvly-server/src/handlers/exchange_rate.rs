use savvly_common::messages::ExchangeRateQuery;

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::VerifiedToken;
use crate::rates::{self, RateSource};

const DEFAULT_BASE: &str = "USD";

pub async fn latest(
    rate_source: web::Data<RateSource>,
    _user_access_token: VerifiedToken,
    query: web::Query<ExchangeRateQuery>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let base = rates::normalize_base(query.base.as_deref().unwrap_or(DEFAULT_BASE))?;
    let rates = rate_source.latest(&base).await?;

    Ok(HttpResponse::Ok().json(rates))
}
