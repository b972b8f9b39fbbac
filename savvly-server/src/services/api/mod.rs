use actix_web::web::*;
use std::time::Duration;

use crate::middleware::Limiter;

mod auth;
mod budget;
mod exchange_rate;
mod health;
mod transaction;

#[derive(Clone)]
pub struct RouteLimiters {
    pub auth: Limiter,
    pub reads: Limiter,
    pub writes: Limiter,
    pub exchange_rates: Limiter,
}

impl Default for RouteLimiters {
    fn default() -> Self {
        const CLEAR_FREQUENCY: Duration = Duration::from_secs(3600 * 24);

        Self {
            auth: Limiter::new(10, Duration::from_secs(60), CLEAR_FREQUENCY),
            reads: Limiter::new(240, Duration::from_secs(60), CLEAR_FREQUENCY),
            writes: Limiter::new(120, Duration::from_secs(60), CLEAR_FREQUENCY),
            exchange_rates: Limiter::new(20, Duration::from_secs(60), CLEAR_FREQUENCY),
        }
    }
}

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/api")
            .configure(|cfg| auth::configure(cfg, &limiters))
            .configure(|cfg| budget::configure(cfg, &limiters))
            .configure(|cfg| transaction::configure(cfg, &limiters))
            .configure(|cfg| exchange_rate::configure(cfg, &limiters))
            .configure(health::configure),
    );
}
