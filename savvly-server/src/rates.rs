//! Currency exchange rates from an external provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub type RateSource = Arc<dyn RateProvider>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRates {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
    pub time_last_update_unix: Option<u64>,
}

#[derive(Debug)]
pub enum RateError {
    InvalidBase(String),
    UnsupportedBase(String),
    Unreachable(String),
    BadResponse(String),
}

impl std::error::Error for RateError {}

impl fmt::Display for RateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateError::InvalidBase(base) => {
                write!(f, "'{base}' is not a three-letter currency code")
            }
            RateError::UnsupportedBase(base) => write!(f, "Currency '{base}' is not supported"),
            RateError::Unreachable(e) => write!(f, "Exchange rate service is unreachable: {e}"),
            RateError::BadResponse(e) => {
                write!(f, "Exchange rate service returned an invalid response: {e}")
            }
        }
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// `base` must already be normalized with [`normalize_base`].
    async fn latest(&self, base: &str) -> Result<ExchangeRates, RateError>;
}

/// Trims and upper-cases a currency code, rejecting anything that isn't three ASCII letters.
pub fn normalize_base(base: &str) -> Result<String, RateError> {
    let base = base.trim();

    if base.len() != 3 || !base.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(RateError::InvalidBase(base.to_string()));
    }

    Ok(base.to_ascii_uppercase())
}

/// Client for the open.er-api.com `latest/{BASE}` endpoint.
pub struct OpenErApiProvider {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct OpenErApiResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_unix: Option<u64>,
    #[serde(default)]
    rates: BTreeMap<String, f64>,
}

impl OpenErApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl RateProvider for OpenErApiProvider {
    async fn latest(&self, base: &str) -> Result<ExchangeRates, RateError> {
        let url = format!("{}/latest/{}", self.base_url, base);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Unreachable(e.to_string()))?;

        let status = resp.status();
        let body: OpenErApiResponse = resp
            .json()
            .await
            .map_err(|e| RateError::BadResponse(format!("{status}: {e}")))?;

        parse_response(base, body)
    }
}

fn parse_response(base: &str, body: OpenErApiResponse) -> Result<ExchangeRates, RateError> {
    if body.result != "success" {
        return match body.error_type.as_deref() {
            Some("unsupported-code") => Err(RateError::UnsupportedBase(base.to_string())),
            Some(e) => Err(RateError::BadResponse(e.to_string())),
            None => Err(RateError::BadResponse(body.result)),
        };
    }

    if body.rates.is_empty() {
        return Err(RateError::BadResponse(String::from("no rates")));
    }

    Ok(ExchangeRates {
        base: body.base_code.unwrap_or_else(|| base.to_string()),
        rates: body.rates,
        time_last_update_unix: body.time_last_update_unix,
    })
}
