//! Centralized configuration (environment variables + defaults).
//!
//! A `.env` file in the working directory is honoured by the server binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_EXPIRATION_SECS: u64 = 3600;
pub const DEFAULT_REFRESH_EXPIRATION_SECS: u64 = 86_400;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a boolean (true/false, yes/no, on/off, 1/0), got {value:?}")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be a socket address like 0.0.0.0:8080, got {value:?}")]
    InvalidAddr { var: &'static str, value: String },
    #[error("{var} must not be empty when set")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub enable_web: bool,
    pub static_dir: PathBuf,
    /// Auth is enabled when a secret is configured.
    pub secret: Option<String>,
    pub token_required: bool,
    pub token_expiration_secs: u64,
    pub refresh_expiration_secs: u64,
    pub dbname: String,
    pub max_concurrent: Option<usize>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
            enable_web: false,
            static_dir: PathBuf::from("static"),
            secret: None,
            token_required: false,
            token_expiration_secs: DEFAULT_TOKEN_EXPIRATION_SECS,
            refresh_expiration_secs: DEFAULT_REFRESH_EXPIRATION_SECS,
            dbname: "dbtest".to_string(),
            max_concurrent: None,
        }
    }
}

impl GatewayConfig {
    /// Reads the `GATEWAY_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = GatewayConfig::default();

        if let Some(v) = lookup("GATEWAY_BIND_ADDR") {
            config.bind_addr = v.trim().parse().map_err(|_| ConfigError::InvalidAddr {
                var: "GATEWAY_BIND_ADDR",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("GATEWAY_ENABLE_WEB") {
            config.enable_web = parse_bool("GATEWAY_ENABLE_WEB", &v)?;
        }
        if let Some(v) = lookup("GATEWAY_STATIC_DIR") {
            config.static_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("GATEWAY_SECRET") {
            if v.is_empty() {
                return Err(ConfigError::Empty { var: "GATEWAY_SECRET" });
            }
            config.secret = Some(v);
        }
        if let Some(v) = lookup("GATEWAY_TOKEN_REQUIRED") {
            config.token_required = parse_bool("GATEWAY_TOKEN_REQUIRED", &v)?;
        }
        if let Some(v) = lookup("GATEWAY_TOKEN_EXPIRATION_SECS") {
            config.token_expiration_secs = parse_number("GATEWAY_TOKEN_EXPIRATION_SECS", &v)?;
        }
        if let Some(v) = lookup("GATEWAY_REFRESH_EXPIRATION_SECS") {
            config.refresh_expiration_secs = parse_number("GATEWAY_REFRESH_EXPIRATION_SECS", &v)?;
        }
        if let Some(v) = lookup("GATEWAY_DBNAME") {
            config.dbname = v;
        }
        if let Some(v) = lookup("GATEWAY_MAX_CONCURRENT") {
            config.max_concurrent = Some(parse_number("GATEWAY_MAX_CONCURRENT", &v)?);
        }

        Ok(config)
    }

    pub fn auth_enabled(&self) -> bool {
        self.secret.is_some()
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_string(),
    })
}
