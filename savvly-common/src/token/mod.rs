//! Signed bearer tokens.
//!
//! A token is `base64url(json_claims || hmac_sha256(json_claims))`. The claims are readable by
//! anyone holding the token; only the signature is secret-dependent.

pub mod auth_token;

use base64::engine::general_purpose::URL_SAFE as b64_urlsafe;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_LENGTH: usize = 32;
const MAX_TOKEN_LENGTH: usize = 4096;

#[derive(Debug, PartialEq, Eq)]
pub enum TokenError {
    TokenInvalid,
    TokenExpired,
    TokenMissing,
}

impl std::error::Error for TokenError {}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::TokenInvalid => write!(f, "TokenInvalid"),
            TokenError::TokenExpired => write!(f, "TokenExpired"),
            TokenError::TokenMissing => write!(f, "TokenMissing"),
        }
    }
}

pub trait Expiring {
    /// Seconds since the Unix epoch.
    fn expiration(&self) -> u64;
}

#[derive(Debug)]
pub struct DecodedToken<C> {
    json: Vec<u8>,
    signature: Vec<u8>,
    pub claims: C,
}

impl<C: Expiring> DecodedToken<C> {
    pub fn verify(&self, key: &[u8]) -> Result<&C, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::TokenInvalid)?
            .as_secs();

        self.verify_at(key, now)
    }

    pub fn verify_at(&self, key: &[u8], now_unix_secs: u64) -> Result<&C, TokenError> {
        let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
            return Err(TokenError::TokenInvalid);
        };

        mac.update(&self.json);

        // Constant-time comparison
        if mac.verify_slice(&self.signature).is_err() {
            return Err(TokenError::TokenInvalid);
        }

        if self.claims.expiration() <= now_unix_secs {
            return Err(TokenError::TokenExpired);
        }

        Ok(&self.claims)
    }
}

pub trait Token {
    type Claims: Expiring + Serialize + DeserializeOwned;

    fn sign(claims: &Self::Claims, signing_key: &[u8]) -> Result<String, TokenError> {
        let mut token = serde_json::to_vec(claims).map_err(|_| TokenError::TokenInvalid)?;

        let mut mac =
            HmacSha256::new_from_slice(signing_key).map_err(|_| TokenError::TokenInvalid)?;
        mac.update(&token);
        token.extend_from_slice(&mac.finalize().into_bytes());

        Ok(b64_urlsafe.encode(&token))
    }

    fn decode(token: &str) -> Result<DecodedToken<Self::Claims>, TokenError> {
        if token.is_empty() {
            return Err(TokenError::TokenMissing);
        }

        if token.len() > MAX_TOKEN_LENGTH {
            return Err(TokenError::TokenInvalid);
        }

        let mut bytes = b64_urlsafe
            .decode(token)
            .map_err(|_| TokenError::TokenInvalid)?;

        if bytes.len() <= SIGNATURE_LENGTH {
            return Err(TokenError::TokenInvalid);
        }

        let signature = bytes.split_off(bytes.len() - SIGNATURE_LENGTH);
        let claims = serde_json::from_slice(&bytes).map_err(|_| TokenError::TokenInvalid)?;

        Ok(DecodedToken {
            json: bytes,
            signature,
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct NoteClaims {
        note: String,
        exp: u64,
    }

    impl Expiring for NoteClaims {
        fn expiration(&self) -> u64 {
            self.exp
        }
    }

    struct NoteToken;

    impl Token for NoteToken {
        type Claims = NoteClaims;
    }

    const KEY: [u8; 32] = [7; 32];

    fn claims(exp: u64) -> NoteClaims {
        NoteClaims {
            note: String::from("hello"),
            exp,
        }
    }

    #[test]
    fn test_sign_then_decode() {
        let token = NoteToken::sign(&claims(1_000), &KEY).unwrap();
        let decoded = NoteToken::decode(&token).unwrap();

        assert_eq!(decoded.claims, claims(1_000));
        assert_eq!(decoded.verify_at(&KEY, 999).unwrap(), &claims(1_000));
    }

    #[test]
    fn test_expired_token() {
        let token = NoteToken::sign(&claims(1_000), &KEY).unwrap();
        let decoded = NoteToken::decode(&token).unwrap();

        assert_eq!(
            decoded.verify_at(&KEY, 1_000).unwrap_err(),
            TokenError::TokenExpired
        );
        assert_eq!(decoded.verify(&KEY).unwrap_err(), TokenError::TokenExpired);
    }

    #[test]
    fn test_wrong_key() {
        let token = NoteToken::sign(&claims(1_000), &KEY).unwrap();
        let decoded = NoteToken::decode(&token).unwrap();

        assert_eq!(
            decoded.verify_at(&[8; 32], 0).unwrap_err(),
            TokenError::TokenInvalid
        );
    }

    #[test]
    fn test_tampered_claims() {
        let token = NoteToken::sign(&claims(1_000), &KEY).unwrap();
        let mut bytes = b64_urlsafe.decode(&token).unwrap();

        let json_len = bytes.len() - SIGNATURE_LENGTH;
        let json = String::from_utf8(bytes[..json_len].to_vec()).unwrap();
        let tampered = json.replace("1000", "9000");
        assert_ne!(json, tampered);

        bytes.splice(..json_len, tampered.into_bytes());
        let tampered_token = b64_urlsafe.encode(&bytes);

        let decoded = NoteToken::decode(&tampered_token).unwrap();
        assert_eq!(decoded.claims.exp, 9_000);
        assert_eq!(
            decoded.verify_at(&KEY, 0).unwrap_err(),
            TokenError::TokenInvalid
        );
    }

    #[test]
    fn test_malformed_tokens() {
        assert_eq!(
            NoteToken::decode("").unwrap_err(),
            TokenError::TokenMissing
        );
        assert_eq!(
            NoteToken::decode("not base64!").unwrap_err(),
            TokenError::TokenInvalid
        );
        assert_eq!(
            NoteToken::decode(&b64_urlsafe.encode([1; 16])).unwrap_err(),
            TokenError::TokenInvalid
        );
        assert_eq!(
            NoteToken::decode(&"a".repeat(MAX_TOKEN_LENGTH + 4)).unwrap_err(),
            TokenError::TokenInvalid
        );

        let mut not_json = b"{not json".to_vec();
        not_json.extend_from_slice(&[0; SIGNATURE_LENGTH]);
        assert_eq!(
            NoteToken::decode(&b64_urlsafe.encode(not_json)).unwrap_err(),
            TokenError::TokenInvalid
        );
    }
}
