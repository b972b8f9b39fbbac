use savvly_common::token::auth_token::{AuthToken, AuthTokenClaims};
use savvly_common::token::{Token, TokenError};

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest};
use futures::future;

use crate::env;
use crate::handlers::error::HttpErrorResponse;

const BEARER_PREFIX: &str = "Bearer ";

/// Claims from a valid, unexpired `Authorization: Bearer` token. Extraction fails with a 401 for
/// any other request.
#[derive(Debug)]
pub struct VerifiedToken {
    pub claims: AuthTokenClaims,
}

impl FromRequest for VerifiedToken {
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match verify_request(req) {
            Ok(claims) => future::ok(VerifiedToken { claims }),
            Err(e) => future::err(e.into()),
        }
    }
}

#[inline]
fn bearer_token(req: &HttpRequest) -> Result<&str, TokenError> {
    let Some(value) = req.headers().get(header::AUTHORIZATION) else {
        return Err(TokenError::TokenMissing);
    };

    let value = value.to_str().map_err(|_| TokenError::TokenInvalid)?;

    match value.strip_prefix(BEARER_PREFIX) {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        Some(_) => Err(TokenError::TokenMissing),
        None => Err(TokenError::TokenInvalid),
    }
}

#[inline]
fn verify_request(req: &HttpRequest) -> Result<AuthTokenClaims, TokenError> {
    let decoded = AuthToken::decode(bearer_token(req)?)?;
    let claims = decoded.verify(&env::CONF.token_signing_key)?;
    Ok(claims.clone())
}
