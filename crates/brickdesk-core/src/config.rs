use uuid::Uuid;

use crate::app_config::{
    AmazonConfig, AppConfig, BricqerConfig, EbayConfig, Environment, HttpConfig, KeepaConfig,
};
use crate::ConfigError;

const DEFAULT_SP_API_BASE_URL: &str = "https://sellingpartnerapi-eu.amazon.com";
const DEFAULT_EBAY_API_BASE_URL: &str = "https://api.ebay.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// `HashMap` instead of `set_var`/`remove_var`.
///
/// # Errors
///
/// Returns `ConfigError` if required vars are missing or values are invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_uuid = |var: &str| -> Result<Option<Uuid>, ConfigError> {
        optional(var)
            .map(|raw| Uuid::parse_str(&raw).map_err(|e| invalid(var, e.to_string())))
            .transpose()
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("BRICKDESK_ENV", "development"))?;

    let bind_addr = or_default("BRICKDESK_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BRICKDESK_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("BRICKDESK_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("BRICKDESK_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("BRICKDESK_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("BRICKDESK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http = HttpConfig {
        timeout_secs: parse_u64("BRICKDESK_HTTP_TIMEOUT_SECS", "30")?,
        user_agent: or_default("BRICKDESK_HTTP_USER_AGENT", "brickdesk/0.1 (lego-resale)"),
        max_retries: parse_u32("BRICKDESK_HTTP_MAX_RETRIES", "3")?,
        backoff_base_ms: parse_u64("BRICKDESK_HTTP_BACKOFF_BASE_MS", "1000")?,
    };

    let sync_timeout_secs = parse_u64("BRICKDESK_SYNC_TIMEOUT_SECS", "60")?;
    let full_sync_cron = or_default("BRICKDESK_FULL_SYNC_CRON", "0 0 6,18 * * *");
    let sync_user_id = parse_uuid("BRICKDESK_SYNC_USER_ID")?;
    let notify_webhook_url = optional("BRICKDESK_NOTIFY_WEBHOOK_URL");

    let bricqer = match (optional("BRICQER_BASE_URL"), optional("BRICQER_API_KEY")) {
        (Some(base_url), Some(api_key)) => Some(BricqerConfig {
            base_url,
            api_key,
            min_request_interval_ms: parse_u64("BRICQER_MIN_REQUEST_INTERVAL_MS", "250")?,
        }),
        (None, None) => None,
        (Some(_), None) => return Err(ConfigError::MissingEnvVar("BRICQER_API_KEY".into())),
        (None, Some(_)) => return Err(ConfigError::MissingEnvVar("BRICQER_BASE_URL".into())),
    };

    let keepa = match optional("KEEPA_API_KEY") {
        Some(api_key) => {
            let raw = or_default("KEEPA_DOMAIN", "2");
            let domain = raw
                .parse::<u8>()
                .map_err(|e| invalid("KEEPA_DOMAIN", e.to_string()))?;
            Some(KeepaConfig { api_key, domain })
        }
        None => None,
    };

    let amazon = build_amazon_config(&optional)?;

    let ebay = optional("EBAY_ACCESS_TOKEN").map(|access_token| EbayConfig {
        base_url: or_default("EBAY_API_BASE_URL", DEFAULT_EBAY_API_BASE_URL),
        access_token,
    });

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http,
        sync_timeout_secs,
        full_sync_cron,
        sync_user_id,
        notify_webhook_url,
        bricqer,
        keepa,
        amazon,
        ebay,
        brickowl_api_key: optional("BRICKOWL_API_KEY"),
        brickset_api_key: optional("BRICKSET_API_KEY"),
    })
}

/// SP-API is enabled only when every credential is present; a partial set is
/// reported by the first missing variable name.
fn build_amazon_config<F>(optional: &F) -> Result<Option<AmazonConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const VARS: [&str; 5] = [
        "AMAZON_SELLER_ID",
        "AMAZON_MARKETPLACE_ID",
        "AMAZON_LWA_CLIENT_ID",
        "AMAZON_LWA_CLIENT_SECRET",
        "AMAZON_REFRESH_TOKEN",
    ];

    let values: Vec<Option<String>> = VARS.iter().map(|v| optional(v)).collect();
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    if let Some(idx) = values.iter().position(Option::is_none) {
        return Err(ConfigError::MissingEnvVar(VARS[idx].to_string()));
    }

    let mut values = values.into_iter().flatten();
    let mut next = || values.next().unwrap_or_default();
    Ok(Some(AmazonConfig {
        seller_id: next(),
        marketplace_id: next(),
        lwa_client_id: next(),
        lwa_client_secret: next(),
        refresh_token: next(),
        base_url: optional("AMAZON_SP_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_SP_API_BASE_URL.to_string()),
    }))
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "BRICKDESK_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
