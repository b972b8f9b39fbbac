use actix_web::web::*;

use crate::handlers::exchange_rate;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        resource("/exchange_rates")
            .route(get().to(exchange_rate::latest))
            .wrap(limiters.exchange_rates.clone()),
    );
}
