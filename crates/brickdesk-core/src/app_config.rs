use std::net::SocketAddr;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings shared by every outbound HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

#[derive(Clone)]
pub struct BricqerConfig {
    pub base_url: String,
    pub api_key: String,
    pub min_request_interval_ms: u64,
}

#[derive(Clone)]
pub struct KeepaConfig {
    pub api_key: String,
    pub domain: u8,
}

#[derive(Clone)]
pub struct AmazonConfig {
    pub base_url: String,
    pub seller_id: String,
    pub marketplace_id: String,
    pub lwa_client_id: String,
    pub lwa_client_secret: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct EbayConfig {
    pub base_url: String,
    pub access_token: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http: HttpConfig,
    pub sync_timeout_secs: u64,
    pub full_sync_cron: String,
    pub sync_user_id: Option<Uuid>,
    pub notify_webhook_url: Option<String>,
    pub bricqer: Option<BricqerConfig>,
    pub keepa: Option<KeepaConfig>,
    pub amazon: Option<AmazonConfig>,
    pub ebay: Option<EbayConfig>,
    pub brickowl_api_key: Option<String>,
    pub brickset_api_key: Option<String>,
}

fn redact<T>(value: Option<&T>) -> Option<&'static str> {
    value.map(|_| "[configured]")
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http", &self.http)
            .field("sync_timeout_secs", &self.sync_timeout_secs)
            .field("full_sync_cron", &self.full_sync_cron)
            .field("sync_user_id", &self.sync_user_id)
            .field(
                "notify_webhook_url",
                &redact(self.notify_webhook_url.as_ref()),
            )
            .field("bricqer", &redact(self.bricqer.as_ref()))
            .field("keepa", &redact(self.keepa.as_ref()))
            .field("amazon", &redact(self.amazon.as_ref()))
            .field("ebay", &redact(self.ebay.as_ref()))
            .field("brickowl_api_key", &redact(self.brickowl_api_key.as_ref()))
            .field("brickset_api_key", &redact(self.brickset_api_key.as_ref()))
            .finish()
    }
}
