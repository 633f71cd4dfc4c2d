//! `Authorization` header credentials.

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

/// Credential forms accepted in the `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthCredential {
    Token(String),
    Secret(String),
    RefreshToken(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Token,
    Secret,
    Refresh,
}

impl Scheme {
    fn prefix(self) -> &'static str {
        match self {
            Scheme::Token => "Token",
            Scheme::Secret => "Secret",
            Scheme::Refresh => "Refresh",
        }
    }
}

impl AuthCredential {
    /// Matches `^<Scheme> (\S+)$` with a case-insensitive scheme.
    pub fn parse(header: &str, scheme: Scheme) -> Option<Self> {
        let prefix = scheme.prefix();
        let head = header.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let value = header[prefix.len()..].strip_prefix(' ')?;
        if value.is_empty() || value.chars().any(char::is_whitespace) {
            return None;
        }
        let value = value.to_string();
        Some(match scheme {
            Scheme::Token => AuthCredential::Token(value),
            Scheme::Secret => AuthCredential::Secret(value),
            Scheme::Refresh => AuthCredential::RefreshToken(value),
        })
    }

    /// Reads the `Authorization` header and matches it against `scheme`.
    pub fn from_headers(headers: &HeaderMap, scheme: Scheme) -> Option<Self> {
        let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
        Self::parse(header, scheme)
    }
}
