use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::token::{Expiring, Token, TokenError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokenClaims {
    #[serde(rename = "uid")]
    pub user_id: Uuid,
    #[serde(rename = "eml")]
    pub user_email: String,
    #[serde(rename = "exp")]
    pub expiration: u64,
}

impl AuthTokenClaims {
    pub fn new(user_id: Uuid, user_email: &str, lifetime: Duration) -> Self {
        let expiration = (SystemTime::now() + lifetime)
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            user_id,
            user_email: user_email.to_string(),
            expiration,
        }
    }
}

impl Expiring for AuthTokenClaims {
    fn expiration(&self) -> u64 {
        self.expiration
    }
}

/// The bearer credential handed out on sign-in and registration.
pub struct AuthToken;

impl Token for AuthToken {
    type Claims = AuthTokenClaims;
}

impl AuthToken {
    pub fn sign_new(
        user_id: Uuid,
        user_email: &str,
        lifetime: Duration,
        signing_key: &[u8],
    ) -> Result<String, TokenError> {
        Self::sign(
            &AuthTokenClaims::new(user_id, user_email, lifetime),
            signing_key,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
    use base64::Engine;

    const SEVEN_DAYS: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    #[test]
    fn test_sign_and_verify() {
        let user_id = Uuid::now_v7();
        let signing_key = [9; 64];

        let token = AuthToken::sign_new(user_id, "test@example.com", SEVEN_DAYS, &signing_key)
            .unwrap();
        let decoded = AuthToken::decode(&token).unwrap();
        let claims = decoded.verify(&signing_key).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.user_email, "test@example.com");

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert!(claims.expiration > now + SEVEN_DAYS.as_secs() - 60);
        assert!(claims.expiration <= now + SEVEN_DAYS.as_secs() + 1);

        assert!(decoded.verify(&[1; 64]).is_err());
    }

    #[test]
    fn test_claim_names_on_the_wire() {
        let token = AuthToken::sign_new(Uuid::nil(), "a@b.co", SEVEN_DAYS, &[3; 32]).unwrap();
        let bytes = b64_urlsafe.decode(token).unwrap();
        let json = String::from_utf8_lossy(&bytes);

        assert!(json.contains("\"uid\""));
        assert!(json.contains("\"eml\":\"a@b.co\""));
        assert!(json.contains("\"exp\""));
    }

    #[test]
    fn test_zero_lifetime_is_expired() {
        let signing_key = [4; 64];
        let token =
            AuthToken::sign_new(Uuid::now_v7(), "x@y.io", Duration::ZERO, &signing_key).unwrap();

        assert_eq!(
            AuthToken::decode(&token)
                .unwrap()
                .verify(&signing_key)
                .unwrap_err(),
            TokenError::TokenExpired
        );
    }
}
