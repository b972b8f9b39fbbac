pub mod api;

use actix_web::web::*;

use crate::handlers::error::{json_error_handler, path_error_handler, query_error_handler};
use crate::handlers::{self, health};

const MAX_JSON_BODY_BYTES: usize = 64 * 1024;

pub fn configure(cfg: &mut ServiceConfig, limiters: api::RouteLimiters) {
    cfg.app_data(
        JsonConfig::default()
            .limit(MAX_JSON_BODY_BYTES)
            .error_handler(json_error_handler),
    )
    .app_data(QueryConfig::default().error_handler(query_error_handler))
    .app_data(PathConfig::default().error_handler(path_error_handler))
    .route("/", get().to(health::root))
    .configure(|cfg| api::configure(cfg, limiters))
    .default_service(to(handlers::route_not_found));
}
