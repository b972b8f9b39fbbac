use actix_web::web::*;

use crate::handlers::budget;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: &RouteLimiters) {
    // "/summary" must be registered before "/{budget_id}" so it isn't parsed as an ID
    cfg.service(
        scope("/budgets")
            .service(
                resource("")
                    .route(get().to(budget::list).wrap(limiters.reads.clone()))
                    .route(post().to(budget::create).wrap(limiters.writes.clone())),
            )
            .service(
                resource("/summary")
                    .route(get().to(budget::summary))
                    .wrap(limiters.reads.clone()),
            )
            .service(
                resource("/{budget_id}")
                    .route(get().to(budget::get).wrap(limiters.reads.clone()))
                    .route(put().to(budget::edit).wrap(limiters.writes.clone()))
                    .route(delete().to(budget::delete).wrap(limiters.writes.clone())),
            ),
    );
}
