use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| match Config::from_env() {
    Ok(conf) => conf,
    Err(e) => {
        eprintln!("ERROR: Failed to load config: {e}");
        std::process::exit(1);
    }
});

const STORE_VAR: &str = "SAVVLY_STORE";

const DB_USERNAME_VAR: &str = "SAVVLY_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "SAVVLY_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "SAVVLY_DB_HOSTNAME";
const DB_PORT_VAR: &str = "SAVVLY_DB_PORT";
const DB_NAME_VAR: &str = "SAVVLY_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "SAVVLY_DB_MAX_CONNECTIONS";

const HASHING_KEY_VAR: &str = "SAVVLY_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "SAVVLY_TOKEN_SIGNING_KEY_B64";

const HASH_LENGTH_VAR: &str = "SAVVLY_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "SAVVLY_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "SAVVLY_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "SAVVLY_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "SAVVLY_HASH_SALT_LENGTH";

const ACCESS_TOKEN_LIFETIME_DAYS_VAR: &str = "SAVVLY_ACCESS_TOKEN_LIFETIME_DAYS";

const EXCHANGE_RATE_API_URL_VAR: &str = "SAVVLY_EXCHANGE_RATE_API_URL";
const EXCHANGE_RATE_TIMEOUT_SECS_VAR: &str = "SAVVLY_EXCHANGE_RATE_TIMEOUT_SECS";

const CORS_ALLOWED_ORIGINS_VAR: &str = "SAVVLY_CORS_ALLOWED_ORIGINS";
const HEALTH_ENDPOINT_KEY_VAR: &str = "SAVVLY_HEALTH_ENDPOINT_KEY";

const DEFAULT_TRANSACTION_LIMIT_VAR: &str = "SAVVLY_DEFAULT_TRANSACTION_LIMIT";
const MAX_TRANSACTION_LIMIT_VAR: &str = "SAVVLY_MAX_TRANSACTION_LIMIT";

const ACTIX_WORKER_COUNT_VAR: &str = "SAVVLY_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "SAVVLY_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;
const TOKEN_SIGNING_KEY_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Zeroize)]
pub struct ConfigInner {
    #[zeroize(skip)]
    pub store_kind: StoreKind,

    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,

    pub hashing_key: [u8; HASHING_KEY_SIZE],
    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    #[zeroize(skip)]
    pub access_token_lifetime: Duration,

    #[zeroize(skip)]
    pub exchange_rate_api_url: String,
    #[zeroize(skip)]
    pub exchange_rate_timeout: Duration,

    #[zeroize(skip)]
    pub cors_allowed_origins: Vec<String>,
    pub health_endpoint_key: String,

    #[zeroize(skip)]
    pub default_transaction_limit: i64,
    #[zeroize(skip)]
    pub max_transaction_limit: i64,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
    #[zeroize(skip)]
    pub log_level: String,
}

impl ConfigInner {
    pub fn db_uri(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.db_username, self.db_password, self.db_hostname, self.db_port, self.db_name,
        )
    }
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let (hashing_key, token_signing_key) = if cfg!(test) {
            ([11; HASHING_KEY_SIZE], [22; TOKEN_SIGNING_KEY_SIZE])
        } else {
            (
                b64_key::<HASHING_KEY_SIZE>(HASHING_KEY_VAR)?,
                b64_key::<TOKEN_SIGNING_KEY_SIZE>(TOKEN_SIGNING_KEY_VAR)?,
            )
        };

        let store_kind = if cfg!(test) {
            StoreKind::Memory
        } else {
            env_var_or(STORE_VAR, StoreKind::Postgres)
        };

        let max_transaction_limit = env_var_or(MAX_TRANSACTION_LIMIT_VAR, 1000i64).max(1);
        let default_transaction_limit =
            env_var_or(DEFAULT_TRANSACTION_LIMIT_VAR, 50i64).clamp(1, max_transaction_limit);

        let cors_allowed_origins = env_var_or(CORS_ALLOWED_ORIGINS_VAR, String::from("*"))
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let inner = ConfigInner {
            store_kind,

            db_username: env_var_or(DB_USERNAME_VAR, String::from("savvly")),
            db_password: if store_kind == StoreKind::Postgres {
                env_var(DB_PASSWORD_VAR)?
            } else {
                String::new()
            },
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("savvly")),
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 32),

            hashing_key,
            token_signing_key,

            hash_length: env_var_or(HASH_LENGTH_VAR, 32),
            hash_iterations: env_var_or(HASH_ITERATIONS_VAR, if cfg!(test) { 1 } else { 3 }),
            hash_mem_cost_kib: env_var_or(
                HASH_MEM_COST_KIB_VAR,
                if cfg!(test) { 128 } else { 65536 },
            ),
            hash_threads: env_var_or(HASH_THREADS_VAR, 1),
            hash_salt_length: env_var_or(HASH_SALT_LENGTH_VAR, 16),

            access_token_lifetime: Duration::from_secs(
                env_var_or(ACCESS_TOKEN_LIFETIME_DAYS_VAR, 7u64) * 86400,
            ),

            exchange_rate_api_url: env_var_or(
                EXCHANGE_RATE_API_URL_VAR,
                String::from("https://open.er-api.com/v6"),
            )
            .trim_end_matches('/')
            .to_string(),
            exchange_rate_timeout: Duration::from_secs(env_var_or(
                EXCHANGE_RATE_TIMEOUT_SECS_VAR,
                10,
            )),

            cors_allowed_origins,
            health_endpoint_key: if cfg!(test) {
                String::from("test-health-key")
            } else {
                env_var_or(HEALTH_ENDPOINT_KEY_VAR, String::new())
            },

            default_transaction_limit,
            max_transaction_limit,

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. This should only be used at the end of the main function once the server
    /// has stopped.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn b64_key<const N: usize>(key: &'static str) -> Result<[u8; N], ConfigError> {
    let encoded = Zeroizing::new(env_var::<String>(key)?);
    let decoded = Zeroizing::new(
        b64.decode(encoded.as_bytes())
            .map_err(|_| ConfigError::invalid(key))?,
    );

    if decoded.len() < N {
        return Err(ConfigError::invalid(key));
    }

    decoded[..N].try_into().map_err(|_| ConfigError::invalid(key))
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{key}'"),
            Self::InvalidVar(key) => write!(f, "Environment variable '{key}' is invalid"),
        }
    }
}
