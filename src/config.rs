use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// First admin account, created when no user exists yet.
    pub bootstrap_admin: Option<(String, String)>,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,

    // Trend analysis; disabled when no URL is set
    pub analysis_api_url: Option<String>,
    pub analysis_api_key: Option<String>,
    pub analysis_model: String,
    pub analysis_timeout_secs: u64,
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", name, raw, e))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parse_or("ACCESS_TOKEN_TTL", "900")?, // default 15 min
            refresh_token_ttl: parse_or("REFRESH_TOKEN_TTL", "604800")?, // default 7 days

            rate_login_per_min: parse_or("RATE_LOGIN_PER_MIN", "60")?,
            rate_refresh_per_min: parse_or("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parse_or("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            bootstrap_admin: optional("BOOTSTRAP_ADMIN_USERNAME")
                .zip(optional("BOOTSTRAP_ADMIN_PASSWORD")),

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parse_or("LOG_LEVEL", "debug")?,

            analysis_api_url: optional("ANALYSIS_API_URL"),
            analysis_api_key: optional("ANALYSIS_API_KEY"),
            analysis_model: env::var("ANALYSIS_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            analysis_timeout_secs: parse_or("ANALYSIS_TIMEOUT_SECS", "60")?,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 604800,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            bootstrap_admin: None,
            log_dir: "logs".to_string(),
            log_level: tracing::Level::DEBUG,
            analysis_api_url: None,
            analysis_api_key: None,
            analysis_model: "gpt-4o-mini".to_string(),
            analysis_timeout_secs: 60,
        }
    }
}
