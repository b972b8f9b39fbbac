use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use futures::future::LocalBoxFuture;
use std::borrow::Cow;
use std::collections::HashMap;
use std::future::{ready, Ready};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::handlers::error::HttpErrorResponse;

const SHARD_COUNT: usize = 16;

#[derive(Debug)]
struct LimiterEntry {
    count: u64,
    window_start: Instant,
}

struct LimiterShard {
    map: HashMap<IpAddr, Mutex<LimiterEntry>>,
    last_clear: Instant,
}

impl LimiterShard {
    fn new() -> Self {
        LimiterShard {
            map: HashMap::new(),
            last_clear: Instant::now(),
        }
    }
}

/// Fixed-window, per-client-IP request limiter. Clones share counters, so one limiter can
/// be handed to every worker.
#[derive(Clone)]
pub struct Limiter {
    max_per_period: u64,
    period: Duration,
    clear_frequency: Duration,
    shards: Arc<[RwLock<LimiterShard>; SHARD_COUNT]>,
}

impl Limiter {
    /// `clear_frequency` is raised to `period` if it is shorter.
    pub fn new(max_per_period: u64, period: Duration, clear_frequency: Duration) -> Self {
        Limiter {
            max_per_period,
            period,
            clear_frequency: clear_frequency.max(period),
            shards: Arc::new(std::array::from_fn(|_| RwLock::new(LimiterShard::new()))),
        }
    }

    fn shard_for(&self, ip: &IpAddr) -> &RwLock<LimiterShard> {
        let final_octet = match ip {
            IpAddr::V4(ip) => ip.octets()[3],
            IpAddr::V6(ip) => ip.octets()[15],
        };

        &self.shards[final_octet as usize % SHARD_COUNT]
    }

    /// Records a request from `ip` and returns whether it is within the limit.
    async fn check_and_record(&self, ip: IpAddr) -> bool {
        let shard = self.shard_for(&ip);
        let now = Instant::now();

        {
            // Read lock must be released before the write lock below is taken
            let shard = shard.read().await;

            if let Some(entry) = shard.map.get(&ip) {
                let mut entry = entry.lock().unwrap_or_else(|e| e.into_inner());
                return record(&mut entry, now, self.period, self.max_per_period);
            }
        }

        let mut shard = shard.write().await;

        if now.duration_since(shard.last_clear) > self.clear_frequency {
            shard.map.clear();
            shard.map.shrink_to_fit();
            shard.last_clear = now;
        }

        match shard.map.get_mut(&ip) {
            // Another request from the same client got here first
            Some(entry) => {
                let entry = entry.get_mut().unwrap_or_else(|e| e.into_inner());
                record(entry, now, self.period, self.max_per_period)
            }
            None => {
                shard.map.insert(
                    ip,
                    Mutex::new(LimiterEntry {
                        count: 1,
                        window_start: now,
                    }),
                );
                self.max_per_period > 0
            }
        }
    }
}

fn record(entry: &mut LimiterEntry, now: Instant, period: Duration, max_per_period: u64) -> bool {
    if now.duration_since(entry.window_start) >= period {
        entry.window_start = now;
        entry.count = 1;
        return max_per_period > 0;
    }

    if entry.count >= max_per_period {
        return false;
    }

    entry.count += 1;
    true
}

impl<S, B> Transform<S, ServiceRequest> for Limiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = LimiterMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LimiterMiddleware {
            service: Arc::new(service),
            limiter: self.clone(),
        }))
    }
}

pub struct LimiterMiddleware<S> {
    service: Arc<S>,
    limiter: Limiter,
}

impl<S, B> Service<ServiceRequest> for LimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // peer_addr() is only absent for requests built in tests
        let ip = req
            .peer_addr()
            .map(|addr| addr.ip())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let limiter = self.limiter.clone();
        let service = Arc::clone(&self.service);

        Box::pin(async move {
            if !limiter.check_and_record(ip).await {
                log::debug!("Rate limited request from {ip}");
                return Err(HttpErrorResponse::TooManyRequests(Cow::Borrowed(
                    "Too many requests. Please try again later.",
                ))
                .into());
            }

            service.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::rt::time::sleep;
    use actix_web::{test, web, App, HttpResponse};
    use std::net::SocketAddr;

    fn from_ip(ip: &str) -> test::TestRequest {
        let addr: SocketAddr = format!("{ip}:443").parse().unwrap();
        test::TestRequest::default().peer_addr(addr)
    }

    #[actix_web::test]
    async fn test_limiter() {
        let limiter = Limiter::new(2, Duration::from_millis(50), Duration::from_secs(60));

        let app = test::init_service(
            App::new()
                .wrap(limiter)
                .service(web::resource("/").to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        for _ in 0..2 {
            let resp = test::call_service(&app, from_ip("10.0.0.1").to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = app.call(from_ip("10.0.0.1").to_request()).await;
        let err = resp.err().unwrap();
        assert_eq!(
            err.as_response_error().status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );

        // Other clients are unaffected, even when they share a shard
        let resp = test::call_service(&app, from_ip("10.0.1.1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = test::call_service(&app, from_ip("10.0.0.17").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        sleep(Duration::from_millis(60)).await;

        // The window has passed
        let resp = test::call_service(&app, from_ip("10.0.0.1").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_clones_share_counters() {
        let limiter = Limiter::new(1, Duration::from_secs(60), Duration::from_secs(60));
        let clone = limiter.clone();

        let ip: IpAddr = "192.168.4.2".parse().unwrap();
        assert!(limiter.check_and_record(ip).await);
        assert!(!clone.check_and_record(ip).await);
    }

    #[actix_web::test]
    async fn test_table_is_cleared() {
        let limiter = Limiter::new(1, Duration::from_millis(10), Duration::from_millis(10));

        let blocked: IpAddr = "172.16.0.1".parse().unwrap();
        assert!(limiter.check_and_record(blocked).await);
        assert!(!limiter.check_and_record(blocked).await);

        sleep(Duration::from_millis(20)).await;

        // A new client in the same shard triggers the clear
        let newcomer: IpAddr = "172.16.0.17".parse().unwrap();
        assert!(limiter.check_and_record(newcomer).await);

        let shard = limiter.shard_for(&blocked).read().await;
        assert!(!shard.map.contains_key(&blocked));
    }
}
