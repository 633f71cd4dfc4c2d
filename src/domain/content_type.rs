//! Resolution of a request's declared `Content-Type` to a codec identifier.

use crate::domain::error::GatewayError;
use serde::Serialize;

/// The wire format selected for one request, used for both decode and encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTypeId {
    Unsupported,
    MsgPack,
    QPack,
    Json,
    Csv,
}

impl ContentTypeId {
    /// All identifiers that have a codec in the registry.
    pub const SUPPORTED: [ContentTypeId; 4] = [
        ContentTypeId::MsgPack,
        ContentTypeId::QPack,
        ContentTypeId::Json,
        ContentTypeId::Csv,
    ];

    /// Maps a declared content type to an identifier.
    ///
    /// Parameters after `;` are ignored and the match is a case-insensitive
    /// suffix match, so `application/vnd.foo+json; charset=utf-8` is JSON.
    pub fn resolve(declared: &str) -> Result<Self, GatewayError> {
        let ct = declared
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if ct.ends_with("x-msgpack") {
            Ok(ContentTypeId::MsgPack)
        } else if ct.ends_with("json") {
            Ok(ContentTypeId::Json)
        } else if ct.ends_with("x-qpack") {
            Ok(ContentTypeId::QPack)
        } else if ct.ends_with("csv") {
            Ok(ContentTypeId::Csv)
        } else {
            Err(GatewayError::UnsupportedContentType(declared.to_string()))
        }
    }

    /// Like [`resolve`](Self::resolve) but degrades to `Unsupported`.
    pub fn resolve_or_unsupported(declared: &str) -> Self {
        Self::resolve(declared).unwrap_or(ContentTypeId::Unsupported)
    }

    /// MIME type written on responses encoded with this identifier.
    pub fn mime(self) -> &'static str {
        match self {
            ContentTypeId::Unsupported => "text/plain; charset=utf-8",
            ContentTypeId::MsgPack => "application/x-msgpack; charset=utf-8",
            ContentTypeId::QPack => "application/x-qpack; charset=utf-8",
            ContentTypeId::Json => "application/json; charset=utf-8",
            ContentTypeId::Csv => "application/csv; charset=utf-8",
        }
    }
}
