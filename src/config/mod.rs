//! Configuration module for the ArquiAlert backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default public endpoint of the EmailJS REST API.
pub const DEFAULT_EMAILJS_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key protecting the admin routes (open when unset)
    pub admin_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Upstream fetch policy
    pub procurement: ProcurementSettings,
    /// Interval of the background cache warm-up, disabled when unset
    pub refresh_interval: Option<Duration>,
    /// API key for SAM.gov opportunities
    pub sam_api_key: Option<String>,
    /// Outgoing mail settings
    pub email: EmailSettings,
}

/// Cache, rate limit and retry policy for upstream sources.
#[derive(Debug, Clone)]
pub struct ProcurementSettings {
    pub cache_ttl: Duration,
    /// Most upstream responses kept in memory
    pub cache_capacity: usize,
    pub rate_limit_per_minute: usize,
    pub fetch_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for ProcurementSettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(30 * 60),
            cache_capacity: 512,
            rate_limit_per_minute: 10,
            fetch_timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(2000),
        }
    }
}

/// Email delivery settings.
#[derive(Debug, Clone)]
pub struct EmailSettings {
    /// HTTP relay accepting `{from, to, subject, text, html}` JSON
    pub relay_url: Option<String>,
    pub relay_token: Option<String>,
    pub from_address: String,
    pub emailjs_url: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            relay_url: None,
            relay_token: None,
            from_address: "alerts@arquialert.local".to_string(),
            emailjs_url: DEFAULT_EMAILJS_URL.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let admin_psk = env::var("ARQUI_ADMIN_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("ARQUI_DB_PATH")
            .unwrap_or_else(|_| "./data/arquialert.sqlite".to_string())
            .into();

        let bind_addr = env::var("ARQUI_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid ARQUI_BIND_ADDR format");

        let log_level = env::var("ARQUI_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = ProcurementSettings::default();
        let procurement = ProcurementSettings {
            cache_ttl: env_u64("ARQUI_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            cache_capacity: env_u64("ARQUI_CACHE_CAPACITY")
                .map(|v| v as usize)
                .unwrap_or(defaults.cache_capacity),
            rate_limit_per_minute: env_u64("ARQUI_RATE_LIMIT_PER_MINUTE")
                .map(|v| v as usize)
                .unwrap_or(defaults.rate_limit_per_minute),
            fetch_timeout: env_u64("ARQUI_FETCH_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            max_retries: env_u64("ARQUI_MAX_RETRIES")
                .map(|v| v as u32)
                .unwrap_or(defaults.max_retries),
            retry_base_delay: env_u64("ARQUI_RETRY_BASE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_base_delay),
        };

        let refresh_interval = env_u64("ARQUI_REFRESH_INTERVAL_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let sam_api_key = env::var("SAM_GOV_API_KEY").ok().filter(|s| !s.is_empty());

        let email = EmailSettings {
            relay_url: env::var("ARQUI_EMAIL_RELAY_URL").ok().filter(|s| !s.is_empty()),
            relay_token: env::var("ARQUI_EMAIL_RELAY_TOKEN").ok().filter(|s| !s.is_empty()),
            from_address: env::var("ARQUI_EMAIL_FROM")
                .unwrap_or_else(|_| "alerts@arquialert.local".to_string()),
            emailjs_url: env::var("EMAILJS_API_URL")
                .unwrap_or_else(|_| DEFAULT_EMAILJS_URL.to_string()),
        };

        Self {
            admin_psk,
            db_path,
            bind_addr,
            log_level,
            procurement,
            refresh_interval,
            sam_api_key,
            email,
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}", key, raw);
                None
            }
        },
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for key in [
            "ARQUI_ADMIN_PSK",
            "ARQUI_DB_PATH",
            "ARQUI_BIND_ADDR",
            "ARQUI_LOG_LEVEL",
            "ARQUI_CACHE_TTL_SECS",
            "ARQUI_CACHE_CAPACITY",
            "ARQUI_RATE_LIMIT_PER_MINUTE",
            "ARQUI_FETCH_TIMEOUT_SECS",
            "ARQUI_MAX_RETRIES",
            "ARQUI_RETRY_BASE_MS",
            "ARQUI_REFRESH_INTERVAL_SECS",
            "SAM_GOV_API_KEY",
            "ARQUI_EMAIL_RELAY_URL",
        ] {
            env::remove_var(key);
        }

        let config = Config::from_env();

        assert!(config.admin_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/arquialert.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.procurement.cache_ttl, Duration::from_secs(1800));
        assert_eq!(config.procurement.cache_capacity, 512);
        assert_eq!(config.procurement.rate_limit_per_minute, 10);
        assert_eq!(config.procurement.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.procurement.max_retries, 3);
        assert_eq!(config.procurement.retry_base_delay, Duration::from_secs(2));
        assert!(config.refresh_interval.is_none());
        assert!(config.email.relay_url.is_none());
    }
}
