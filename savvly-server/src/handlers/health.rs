use savvly_common::db::DataStore;
use savvly_common::messages::MessageOutput;

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

use crate::env;

#[derive(Deserialize)]
pub struct HealthKeyQuery {
    pub key: Option<String>,
}

pub async fn root() -> impl Responder {
    HttpResponse::Ok().json(MessageOutput::new("Savvly API is running"))
}

pub async fn heartbeat() -> impl Responder {
    HttpResponse::Ok()
}

pub async fn health(
    data_store: web::Data<DataStore>,
    query: web::Query<HealthKeyQuery>,
) -> impl Responder {
    if !is_health_key_correct(query.key.as_deref()) {
        return HttpResponse::Unauthorized().finish();
    }

    match data_store.health().await {
        Ok(state) => HttpResponse::Ok().json(json!({
            "store": state.backend,
            "db_async_pool_state": {
                "connections": state.connections,
                "idle_connections": state.idle_connections,
            }
        })),
        Err(e) => {
            log::error!("Health check failed: {e}");
            HttpResponse::ServiceUnavailable().json(json!({
                "error": "Data store is unavailable",
            }))
        }
    }
}

#[inline]
fn is_health_key_correct(key: Option<&str>) -> bool {
    let Some(key) = key else {
        return false;
    };

    let correct_key = env::CONF.health_endpoint_key.as_bytes();
    let key = key.as_bytes();

    if correct_key.is_empty() || correct_key.len() != key.len() {
        return false;
    }

    // Constant-time comparison
    let keys_dont_match = correct_key
        .iter()
        .zip(key)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    keys_dont_match == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use actix_web::App;

    use crate::handlers::test_utils;

    #[actix_web::test]
    async fn test_root_and_heartbeat() {
        let app = test::init_service(
            App::new()
                .route("/", web::get().to(root))
                .route("/heartbeat", web::get().to(heartbeat)),
        )
        .await;

        let req = TestRequest::get().uri("/heartbeat").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::get().uri("/").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: MessageOutput = test::read_body_json(resp).await;
        assert_eq!(body.message, "Savvly API is running");
    }

    #[actix_web::test]
    async fn test_health_with_valid_key() {
        let app = test::init_service(
            App::new()
                .app_data(test_utils::memory_store())
                .route("/health", web::get().to(health)),
        )
        .await;

        let req = TestRequest::get()
            .uri(&format!("/health?key={}", env::CONF.health_endpoint_key))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(resp_json["store"], "memory");

        let db_state = resp_json.get("db_async_pool_state").unwrap();
        assert!(db_state.get("connections").is_some());
        assert!(db_state.get("idle_connections").is_some());
    }

    #[actix_web::test]
    async fn test_health_with_bad_keys() {
        let app = test::init_service(
            App::new()
                .app_data(test_utils::memory_store())
                .route("/health", web::get().to(health)),
        )
        .await;

        let wrong_key = "x".repeat(env::CONF.health_endpoint_key.len());

        for uri in [
            String::from("/health"),
            String::from("/health?key=short"),
            format!("/health?key={wrong_key}"),
        ] {
            let req = TestRequest::get().uri(&uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
