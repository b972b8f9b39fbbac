pub mod auth;
pub mod budget;
pub mod exchange_rate;
pub mod health;
pub mod transaction;

use std::borrow::Cow;

use error::{DoesNotExistType, HttpErrorResponse};

pub async fn route_not_found() -> Result<actix_web::HttpResponse, HttpErrorResponse> {
    Err(HttpErrorResponse::DoesNotExist(
        Cow::Borrowed("Route not found"),
        DoesNotExistType::Route,
    ))
}

pub mod error {
    use savvly_common::db::DaoError;
    use savvly_common::messages::MessageError;
    use savvly_common::token::TokenError;

    use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
    use actix_web::http::StatusCode;
    use actix_web::{HttpRequest, HttpResponse};
    use serde::Serialize;
    use std::borrow::Cow;
    use std::fmt;
    use tokio::sync::oneshot;

    use crate::rates::RateError;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    pub enum DoesNotExistType {
        User,
        Budget,
        Transaction,
        Route,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(Cow<'static, str>),
        InvalidMessage(MessageError),

        // 401
        IncorrectCredential(Cow<'static, str>),
        BadToken(Cow<'static, str>),
        TokenExpired(Cow<'static, str>),
        TokenMissing(Cow<'static, str>),

        // 404
        DoesNotExist(Cow<'static, str>, DoesNotExistType),

        // 409
        ConflictWithExisting(Cow<'static, str>),

        // 413
        InputTooLarge(Cow<'static, str>),

        // 429
        TooManyRequests(Cow<'static, str>),

        // 500
        InternalError(Cow<'static, str>),

        // 502
        UpstreamFailure(Cow<'static, str>),
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
    pub enum ErrorType {
        IncorrectlyFormed,
        InvalidMessage,
        IncorrectCredential,
        TokenExpired,
        TokenMissing,
        UserDoesNotExist,
        BudgetDoesNotExist,
        TransactionDoesNotExist,
        RouteDoesNotExist,
        ConflictWithExisting,
        InputTooLarge,
        TooManyRequests,
        InternalError,
        UpstreamFailure,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ErrorOutput {
        pub error: String,
        pub error_type: ErrorType,
    }

    impl HttpErrorResponse {
        pub fn error_type(&self) -> ErrorType {
            match self {
                HttpErrorResponse::IncorrectlyFormed(_) => ErrorType::IncorrectlyFormed,
                HttpErrorResponse::InvalidMessage(_) => ErrorType::InvalidMessage,
                HttpErrorResponse::IncorrectCredential(_) | HttpErrorResponse::BadToken(_) => {
                    ErrorType::IncorrectCredential
                }
                HttpErrorResponse::TokenExpired(_) => ErrorType::TokenExpired,
                HttpErrorResponse::TokenMissing(_) => ErrorType::TokenMissing,
                HttpErrorResponse::DoesNotExist(_, dne_type) => match dne_type {
                    DoesNotExistType::User => ErrorType::UserDoesNotExist,
                    DoesNotExistType::Budget => ErrorType::BudgetDoesNotExist,
                    DoesNotExistType::Transaction => ErrorType::TransactionDoesNotExist,
                    DoesNotExistType::Route => ErrorType::RouteDoesNotExist,
                },
                HttpErrorResponse::ConflictWithExisting(_) => ErrorType::ConflictWithExisting,
                HttpErrorResponse::InputTooLarge(_) => ErrorType::InputTooLarge,
                HttpErrorResponse::TooManyRequests(_) => ErrorType::TooManyRequests,
                HttpErrorResponse::InternalError(_) => ErrorType::InternalError,
                HttpErrorResponse::UpstreamFailure(_) => ErrorType::UpstreamFailure,
            }
        }

        /// Maps a store failure. `NotFound` (which also covers records owned by another user)
        /// becomes a 404 for `dne_type`; anything else is logged and hidden behind a 500.
        pub fn from_dao(err: DaoError, dne_type: DoesNotExistType) -> Self {
            match err {
                DaoError::QueryFailure(diesel::result::Error::NotFound) => {
                    HttpErrorResponse::DoesNotExist(
                        Cow::Borrowed(match dne_type {
                            DoesNotExistType::User => "User not found",
                            DoesNotExistType::Budget => "Budget not found",
                            DoesNotExistType::Transaction => "Transaction not found",
                            DoesNotExistType::Route => "Route not found",
                        }),
                        dne_type,
                    )
                }
                DaoError::AlreadyExists => {
                    HttpErrorResponse::ConflictWithExisting(Cow::Borrowed("Record already exists"))
                }
                e => {
                    log::error!("{e}");
                    HttpErrorResponse::InternalError(Cow::Borrowed("Failed to access data store"))
                }
            }
        }
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                HttpErrorResponse::IncorrectlyFormed(msg) => write!(f, "{msg}"),
                HttpErrorResponse::InvalidMessage(e) => write!(f, "{e}"),
                HttpErrorResponse::IncorrectCredential(msg)
                | HttpErrorResponse::BadToken(msg)
                | HttpErrorResponse::TokenExpired(msg)
                | HttpErrorResponse::TokenMissing(msg)
                | HttpErrorResponse::DoesNotExist(msg, _)
                | HttpErrorResponse::ConflictWithExisting(msg)
                | HttpErrorResponse::InputTooLarge(msg)
                | HttpErrorResponse::TooManyRequests(msg)
                | HttpErrorResponse::InternalError(msg)
                | HttpErrorResponse::UpstreamFailure(msg) => write!(f, "{msg}"),
            }
        }
    }

    impl From<&HttpErrorResponse> for ErrorOutput {
        fn from(resp: &HttpErrorResponse) -> Self {
            ErrorOutput {
                error: resp.to_string(),
                error_type: resp.error_type(),
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponse::build(self.status_code()).json(ErrorOutput::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_) | HttpErrorResponse::InvalidMessage(_) => {
                    StatusCode::BAD_REQUEST
                }
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::BadToken(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::ConflictWithExisting(_) => StatusCode::CONFLICT,
                HttpErrorResponse::InputTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                HttpErrorResponse::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                HttpErrorResponse::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            }
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError(Cow::Borrowed("Rayon thread pool failure"))
        }
    }

    impl From<MessageError> for HttpErrorResponse {
        fn from(err: MessageError) -> Self {
            HttpErrorResponse::InvalidMessage(err)
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::BadToken(Cow::Borrowed("Token is invalid"))
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired(Cow::Borrowed("Token is expired"))
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing(Cow::Borrowed("Token is missing"))
                }
            }
        }
    }

    impl From<RateError> for HttpErrorResponse {
        fn from(err: RateError) -> Self {
            match err {
                RateError::InvalidBase(_) | RateError::UnsupportedBase(_) => {
                    HttpErrorResponse::IncorrectlyFormed(Cow::Owned(err.to_string()))
                }
                RateError::Unreachable(_) | RateError::BadResponse(_) => {
                    log::warn!("{err}");
                    HttpErrorResponse::UpstreamFailure(Cow::Owned(err.to_string()))
                }
            }
        }
    }

    pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
        match err {
            JsonPayloadError::Overflow { limit }
            | JsonPayloadError::OverflowKnownLength { limit, .. } => {
                HttpErrorResponse::InputTooLarge(Cow::Owned(format!(
                    "Request body cannot exceed {limit} bytes"
                )))
                .into()
            }
            e => HttpErrorResponse::IncorrectlyFormed(Cow::Owned(e.to_string())).into(),
        }
    }

    pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
        HttpErrorResponse::IncorrectlyFormed(Cow::Owned(err.to_string())).into()
    }

    pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
        HttpErrorResponse::IncorrectlyFormed(Cow::Owned(err.to_string())).into()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        use actix_web::body::to_bytes;
        use actix_web::ResponseError;

        #[actix_web::test]
        async fn test_error_response_body() {
            let resp = HttpErrorResponse::DoesNotExist(
                Cow::Borrowed("Budget not found"),
                DoesNotExistType::Budget,
            )
            .error_response();

            assert_eq!(resp.status(), StatusCode::NOT_FOUND);

            let body = to_bytes(resp.into_body()).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

            assert_eq!(body["error"], "Budget not found");
            assert_eq!(body["errorType"], "BudgetDoesNotExist");
        }

        #[test]
        fn test_from_dao() {
            let resp = HttpErrorResponse::from_dao(DaoError::not_found(), DoesNotExistType::Budget);
            assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
            assert_eq!(resp.to_string(), "Budget not found");

            let resp = HttpErrorResponse::from_dao(
                DaoError::AlreadyExists,
                DoesNotExistType::Transaction,
            );
            assert_eq!(resp.status_code(), StatusCode::CONFLICT);

            let resp = HttpErrorResponse::from_dao(
                DaoError::DbAsyncPoolFailure(String::from("timed out")),
                DoesNotExistType::Transaction,
            );
            assert_eq!(resp.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
            assert!(!resp.to_string().contains("timed out"));
        }

        #[test]
        fn test_token_errors_are_unauthorized() {
            for err in [
                TokenError::TokenInvalid,
                TokenError::TokenExpired,
                TokenError::TokenMissing,
            ] {
                assert_eq!(
                    HttpErrorResponse::from(err).status_code(),
                    StatusCode::UNAUTHORIZED
                );
            }
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use savvly_common::db::memory::MemoryStore;
    use savvly_common::db::{DataStore, UserStore};
    use savvly_common::events::LedgerEvents;
    use savvly_common::token::auth_token::AuthToken;

    use actix_web::web::{Data, ServiceConfig};
    use std::sync::Arc;
    use uuid::Uuid;

    use crate::env;
    use crate::services;
    use crate::services::api::RouteLimiters;

    /// Every route, each app with its own fresh limiters.
    pub fn configure_services(cfg: &mut ServiceConfig) {
        services::configure(cfg, RouteLimiters::default());
    }

    pub fn memory_store() -> Data<DataStore> {
        let store: DataStore = Arc::new(MemoryStore::new());
        Data::new(store)
    }

    pub fn ledger_events() -> Data<LedgerEvents> {
        Data::new(LedgerEvents::default())
    }

    pub fn access_token(user_id: Uuid, email: &str) -> String {
        AuthToken::sign_new(
            user_id,
            email,
            env::CONF.access_token_lifetime,
            &env::CONF.token_signing_key,
        )
        .unwrap()
    }

    pub fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {token}"))
    }

    /// Creates a user directly in the store and returns it with a valid bearer token.
    pub async fn create_user(store: &DataStore) -> (Uuid, String) {
        let email = format!("user-{}@savvly.test", Uuid::now_v7().simple());
        let user = store
            .create_user("Test User", &email, "not-a-real-hash")
            .await
            .unwrap();

        let token = access_token(user.id, &user.email);
        (user.id, token)
    }
}
