//! Authentication guard and token endpoints.
//!
//! Which `Authorization` schemes the guard accepts depends on `token_required`:
//! - `true`: only `Token <value>`.
//! - `false`: `Token <value>`, falling back to `Secret <value>`.
//!
//! `/get-token` and `/refresh-token` do not use the guard; they each accept
//! exactly one scheme (`Secret` and `Refresh`).

use crate::app::credential_store::{CredentialStore, TokenPayload};
use crate::domain::{AuthCredential, GatewayError, Scheme};
use axum::http::HeaderMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AuthValidator {
    token_required: bool,
    store: Arc<dyn CredentialStore>,
}

impl AuthValidator {
    pub fn new(store: Arc<dyn CredentialStore>, token_required: bool) -> Self {
        Self {
            token_required,
            store,
        }
    }

    pub fn token_required(&self) -> bool {
        self.token_required
    }

    /// Picks the credential the guard will check, without calling the store.
    pub fn select_credential(&self, headers: &HeaderMap) -> Result<AuthCredential, GatewayError> {
        if let Some(token) = AuthCredential::from_headers(headers, Scheme::Token) {
            return Ok(token);
        }
        if self.token_required {
            return Err(GatewayError::MissingToken);
        }
        AuthCredential::from_headers(headers, Scheme::Secret).ok_or(GatewayError::MissingCredential)
    }

    /// Guard for the protected routes (insert, query).
    pub async fn guard(&self, headers: &HeaderMap) -> Result<(), GatewayError> {
        let result = match self.select_credential(headers)? {
            AuthCredential::Token(token) => self.store.validate_token(&token).await,
            AuthCredential::Secret(secret) => self.store.validate_secret(&secret).await,
            AuthCredential::RefreshToken(_) => return Err(GatewayError::MissingCredential),
        };
        match result {
            Ok(()) => {
                debug!("request authenticated");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "authentication failed");
                Err(e.into())
            }
        }
    }

    /// Extracts the `Secret` credential required by `/get-token`.
    pub fn secret_from(headers: &HeaderMap) -> Result<String, GatewayError> {
        match AuthCredential::from_headers(headers, Scheme::Secret) {
            Some(AuthCredential::Secret(secret)) => Ok(secret),
            _ => Err(GatewayError::MissingSecret),
        }
    }

    /// Extracts the `Refresh` credential required by `/refresh-token`.
    pub fn refresh_from(headers: &HeaderMap) -> Result<String, GatewayError> {
        match AuthCredential::from_headers(headers, Scheme::Refresh) {
            Some(AuthCredential::RefreshToken(refresh)) => Ok(refresh),
            _ => Err(GatewayError::MissingRefresh),
        }
    }

    pub async fn get_token(&self, secret: &str) -> Result<TokenPayload, GatewayError> {
        self.store.get_token(secret).await.map_err(|e| {
            warn!(error = %e, "token request rejected");
            GatewayError::from(e)
        })
    }

    pub async fn refresh_token(&self, refresh: &str) -> Result<TokenPayload, GatewayError> {
        self.store.refresh_token(refresh).await.map_err(|e| {
            warn!(error = %e, "token refresh rejected");
            GatewayError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::credential_store::SecretCredentialStore;
    use crate::domain::AuthError;
    use axum::http::header::AUTHORIZATION;

    fn headers(auth: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, auth.parse().unwrap());
        h
    }

    fn validator(token_required: bool) -> AuthValidator {
        AuthValidator::new(Arc::new(SecretCredentialStore::new("sesame", 60)), token_required)
    }

    #[tokio::test]
    async fn token_required_rejects_secret() {
        let v = validator(true);
        assert_eq!(v.guard(&headers("Secret sesame")).await, Err(GatewayError::MissingToken));
        assert_eq!(v.guard(&HeaderMap::new()).await, Err(GatewayError::MissingToken));
    }

    #[tokio::test]
    async fn secret_fallback_when_tokens_are_optional() {
        let v = validator(false);
        assert_eq!(v.guard(&headers("Secret sesame")).await, Ok(()));
        assert_eq!(
            v.guard(&headers("secret wrong")).await,
            Err(GatewayError::Auth(AuthError::UserAuth("Invalid secret".into())))
        );
        assert_eq!(
            v.guard(&headers("Bearer sesame")).await,
            Err(GatewayError::MissingCredential)
        );
    }

    #[tokio::test]
    async fn token_is_tried_first() {
        let v = validator(false);
        let payload = v.get_token("sesame").await.unwrap();
        assert_eq!(v.guard(&headers(&format!("Token {}", payload.token))).await, Ok(()));
        assert_eq!(
            v.guard(&headers("Token unknown")).await,
            Err(GatewayError::Auth(AuthError::Authentication("Invalid token".into())))
        );
    }

    #[test]
    fn token_endpoints_accept_exactly_one_scheme() {
        assert_eq!(AuthValidator::secret_from(&headers("Secret abc")), Ok("abc".to_string()));
        assert_eq!(
            AuthValidator::secret_from(&headers("Token abc")),
            Err(GatewayError::MissingSecret)
        );
        assert_eq!(AuthValidator::refresh_from(&headers("REFRESH r1")), Ok("r1".to_string()));
        assert_eq!(
            AuthValidator::refresh_from(&headers("Secret r1")),
            Err(GatewayError::MissingRefresh)
        );
    }
}
