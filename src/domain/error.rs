//! Domain error kinds and their HTTP status mapping.
//!
//! Backend and credential-store failures arrive already classified; decode and
//! header failures are classified at the point where the handler catches them.

use axum::http::StatusCode;
use thiserror::Error;

/// Failures raised by the backing database client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("{0}")]
    Insert(String),
    #[error("{0}")]
    Query(String),
    /// The database reported itself unavailable.
    #[error("{0}")]
    Server(String),
    /// No free connection in the backend pool.
    #[error("{0}")]
    Pool(String),
    /// Anything the backend could not classify.
    #[error("{0}")]
    Other(String),
}

/// Failures raised by the credential store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The shared secret did not validate.
    #[error("{0}")]
    UserAuth(String),
    /// The token (or refresh token) did not validate.
    #[error("{0}")]
    Authentication(String),
}

/// Every failure a handler can turn into a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Error while reading data: {0}")]
    Insert(String),
    #[error("Error while reading query: {0}")]
    Query(String),
    #[error("Missing \"Token\" in headers")]
    MissingToken,
    #[error("Missing \"Token\" or \"Secret\" in headers")]
    MissingCredential,
    #[error("Missing \"Secret\" in headers")]
    MissingSecret,
    #[error("Missing \"Refresh\" in headers")]
    MissingRefresh,
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("Error while encoding response: {0}")]
    Encode(String),
    #[error("{0}")]
    NotFound(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Backend(BackendError::Server(_))
            | GatewayError::Backend(BackendError::Pool(_)) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Auth(AuthError::UserAuth(_)) => StatusCode::UNAUTHORIZED,
            GatewayError::Auth(AuthError::Authentication(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            GatewayError::Insert(_) | GatewayError::Query(_) | GatewayError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::MissingToken
            | GatewayError::MissingCredential
            | GatewayError::MissingSecret
            | GatewayError::MissingRefresh => StatusCode::UNAUTHORIZED,
            GatewayError::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        let cases = [
            (GatewayError::from(BackendError::Insert("x".into())), 500),
            (GatewayError::from(BackendError::Query("x".into())), 500),
            (GatewayError::from(BackendError::Server("x".into())), 503),
            (GatewayError::from(BackendError::Pool("x".into())), 503),
            (GatewayError::from(BackendError::Other("x".into())), 500),
            (GatewayError::from(AuthError::UserAuth("x".into())), 401),
            (GatewayError::from(AuthError::Authentication("x".into())), 422),
            (GatewayError::Insert("x".into()), 500),
            (GatewayError::Query("x".into()), 500),
            (GatewayError::UnsupportedContentType("x".into()), 415),
            (GatewayError::MissingToken, 401),
            (GatewayError::NotFound("x".into()), 404),
        ];
        for (err, status) in cases {
            assert_eq!(err.status().as_u16(), status, "{err:?}");
        }
    }

    #[test]
    fn wrapped_messages_keep_the_cause() {
        let err = GatewayError::Insert("expected value at line 1 column 1".into());
        assert_eq!(
            err.to_string(),
            "Error while reading data: expected value at line 1 column 1"
        );
        let err = GatewayError::from(BackendError::Pool("no connections available".into()));
        assert_eq!(err.to_string(), "no connections available");
    }
}
