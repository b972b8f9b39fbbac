use actix_web::web::*;

use crate::handlers::auth;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: &RouteLimiters) {
    cfg.service(
        scope("/auth")
            .service(
                resource("/register")
                    .route(post().to(auth::register))
                    .wrap(limiters.auth.clone()),
            )
            .service(
                resource("/login")
                    .route(post().to(auth::sign_in))
                    .wrap(limiters.auth.clone()),
            ),
    );
}
