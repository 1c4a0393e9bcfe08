use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub admission: AdmissionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Shared key required when `method = "api_key"`.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Trust the `X-User-Id` header set by the upstream login gateway.
    TrustedHeader,
    /// Require a shared API key in addition to `X-User-Id`.
    ApiKey,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("ticketgate.db")
}

/// Counter store backends
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// In-process map, single node only.
    Memory,
    Redis,
}

/// Counter store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,
    /// Redis connection URL (required when backend = "redis")
    #[serde(default)]
    pub url: Option<String>,
    /// Namespace prepended to every key
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
    /// Per-call timeout in milliseconds (default: 10000)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            url: None,
            prefix: default_cache_prefix(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl CacheConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_cache_backend() -> CacheBackend {
    CacheBackend::Memory
}

fn default_cache_prefix() -> String {
    "ticketgate:".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Admission workflow tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionConfig {
    /// Lifetime of a ticket's remaining-slots counter (default: 12h)
    #[serde(default = "default_quota_ttl_secs")]
    pub quota_ttl_secs: u64,
    /// Lifetime of a private-mode gate token (default: 60s)
    #[serde(default = "default_gate_token_ttl_secs")]
    pub gate_token_ttl_secs: u64,
    /// Length of generated gate tokens
    #[serde(default = "default_token_length")]
    pub token_length: usize,
    /// Upper bound for each durable store or counter store call
    #[serde(default = "default_timeout_ms")]
    pub call_timeout_ms: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            quota_ttl_secs: default_quota_ttl_secs(),
            gate_token_ttl_secs: default_gate_token_ttl_secs(),
            token_length: default_token_length(),
            call_timeout_ms: default_timeout_ms(),
        }
    }
}

impl AdmissionConfig {
    pub fn quota_ttl(&self) -> Duration {
        Duration::from_secs(self.quota_ttl_secs)
    }

    pub fn gate_token_ttl(&self) -> Duration {
        Duration::from_secs(self.gate_token_ttl_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

fn default_quota_ttl_secs() -> u64 {
    12 * 60 * 60
}

fn default_gate_token_ttl_secs() -> u64 {
    60
}

fn default_token_length() -> usize {
    6
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: SanitizedCacheConfig,
    pub admission: AdmissionConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

/// Sanitized cache config (URL hidden, it may carry a password)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCacheConfig {
    pub backend: String,
    pub url_configured: bool,
    pub prefix: String,
    pub timeout_ms: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::TrustedHeader => "trusted_header".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            cache: SanitizedCacheConfig {
                backend: match config.cache.backend {
                    CacheBackend::Memory => "memory".to_string(),
                    CacheBackend::Redis => "redis".to_string(),
                },
                url_configured: config.cache.url.is_some(),
                prefix: config.cache.prefix.clone(),
                timeout_ms: config.cache.timeout_ms,
            },
            admission: config.admission.clone(),
        }
    }
}
