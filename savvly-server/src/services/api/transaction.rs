use actix_web::web::*;

use crate::handlers::transaction;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        scope("/transactions")
            .service(
                resource("")
                    .route(get().to(transaction::list).wrap(limiters.reads.clone()))
                    .route(post().to(transaction::create).wrap(limiters.writes.clone())),
            )
            .service(
                resource("/{transaction_id}")
                    .route(delete().to(transaction::delete))
                    .wrap(limiters.writes.clone()),
            ),
    );
}
