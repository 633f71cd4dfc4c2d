//! Credential store: validates tokens/secrets and issues tokens.
//!
//! `SecretCredentialStore` is the store used by the server binary. It knows a
//! single shared secret and keeps issued tokens in memory, so tokens do not
//! survive a restart.
//!
//! A refresh token outlives its access token: once the token has expired the
//! pair can still be refreshed until the refresh token's own expiry.

use crate::domain::AuthError;
use crate::infra::config::DEFAULT_REFRESH_EXPIRATION_SECS;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// Issued credentials returned by `/get-token` and `/refresh-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenPayload {
    pub token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which `token` is rejected.
    pub expiration_time: i64,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn validate_token(&self, token: &str) -> Result<(), AuthError>;
    async fn validate_secret(&self, secret: &str) -> Result<(), AuthError>;
    async fn get_token(&self, secret: &str) -> Result<TokenPayload, AuthError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPayload, AuthError>;
}

struct IssuedRefresh {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct TokenTable {
    /// token -> expiry
    tokens: HashMap<String, DateTime<Utc>>,
    /// refresh token -> token it replaces and its own expiry
    refresh: HashMap<String, IssuedRefresh>,
}

pub struct SecretCredentialStore {
    secret_digest: [u8; 32],
    lifetime: Duration,
    refresh_lifetime: Duration,
    table: RwLock<TokenTable>,
}

impl SecretCredentialStore {
    pub fn new(secret: &str, lifetime_secs: u64) -> Self {
        let lifetime = seconds(lifetime_secs);
        Self {
            secret_digest: digest(secret),
            lifetime,
            refresh_lifetime: lifetime.max(seconds(DEFAULT_REFRESH_EXPIRATION_SECS)),
            table: RwLock::new(TokenTable::default()),
        }
    }

    /// Sets how long refresh tokens stay valid; never shorter than the token lifetime.
    pub fn with_refresh_lifetime(mut self, refresh_lifetime_secs: u64) -> Self {
        self.refresh_lifetime = self.lifetime.max(seconds(refresh_lifetime_secs));
        self
    }

    fn issue(&self, table: &mut TokenTable) -> TokenPayload {
        let token = random_hex();
        let refresh_token = random_hex();
        let now = Utc::now();
        let expires_at = expiry(now, self.lifetime);

        table.refresh.insert(
            refresh_token.clone(),
            IssuedRefresh {
                token: token.clone(),
                expires_at: expiry(now, self.refresh_lifetime),
            },
        );
        table.tokens.insert(token.clone(), expires_at);

        TokenPayload {
            token,
            refresh_token,
            expiration_time: expires_at.timestamp(),
        }
    }

    /// Drops expired tokens and expired refresh tokens; returns how many
    /// entries were removed. A refresh token is kept until its own expiry
    /// even when its access token is purged.
    pub async fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut table = self.table.write().await;
        let before = table.tokens.len() + table.refresh.len();
        table.tokens.retain(|_, expires_at| *expires_at > now);
        table.refresh.retain(|_, issued| issued.expires_at > now);
        before - table.tokens.len() - table.refresh.len()
    }
}

#[async_trait]
impl CredentialStore for SecretCredentialStore {
    async fn validate_token(&self, token: &str) -> Result<(), AuthError> {
        let table = self.table.read().await;
        match table.tokens.get(token) {
            None => Err(AuthError::Authentication("Invalid token".to_string())),
            Some(expires_at) if *expires_at <= Utc::now() => {
                Err(AuthError::Authentication("Token is expired".to_string()))
            }
            Some(_) => Ok(()),
        }
    }

    async fn validate_secret(&self, secret: &str) -> Result<(), AuthError> {
        if digest(secret) == self.secret_digest {
            Ok(())
        } else {
            Err(AuthError::UserAuth("Invalid secret".to_string()))
        }
    }

    async fn get_token(&self, secret: &str) -> Result<TokenPayload, AuthError> {
        self.validate_secret(secret).await?;
        let mut table = self.table.write().await;
        Ok(self.issue(&mut table))
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPayload, AuthError> {
        let mut table = self.table.write().await;
        let old = table
            .refresh
            .remove(refresh_token)
            .ok_or_else(|| AuthError::Authentication("Invalid refresh token".to_string()))?;
        table.tokens.remove(&old.token);
        if old.expires_at <= Utc::now() {
            return Err(AuthError::Authentication("Refresh token is expired".to_string()));
        }
        Ok(self.issue(&mut table))
    }
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

fn expiry(now: DateTime<Utc>, lifetime: Duration) -> DateTime<Utc> {
    now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn random_hex() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
