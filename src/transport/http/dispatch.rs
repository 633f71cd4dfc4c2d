//! Response dispatch shared by every handler.
//!
//! A handler result is always encoded with the content type resolved for the
//! same request. Encoding never fails past this point: an encoder error turns
//! into a plain-text 500.

use crate::codec::{encode_text, CodecRegistry};
use crate::domain::{ContentTypeId, GatewayError};
use crate::transport::http::types::ErrorBody;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::Value as JsonValue;
use tracing::error;

pub type HandlerResult = Result<JsonValue, GatewayError>;

pub fn respond(registry: &CodecRegistry, ct: ContentTypeId, result: HandlerResult) -> Response {
    let (status, value) = match result {
        Ok(value) => (StatusCode::OK, value),
        Err(e) => (e.status(), error_value(ct, &e)),
    };

    match registry.encode(ct, &value) {
        Ok(body) => build(status, ct, body),
        Err(e) => {
            error!(content_type = ?ct, error = %e, "failed to encode response");
            let e = GatewayError::Encode(e.to_string());
            build(
                e.status(),
                ContentTypeId::Unsupported,
                encode_text(&JsonValue::String(e.to_string())),
            )
        }
    }
}

/// Plain text carries the bare message; structured codecs get `{"error_msg": ...}`.
fn error_value(ct: ContentTypeId, e: &GatewayError) -> JsonValue {
    if ct == ContentTypeId::Unsupported {
        return JsonValue::String(e.to_string());
    }
    let body = ErrorBody {
        error_msg: e.to_string(),
    };
    serde_json::to_value(body).unwrap_or_else(|_| JsonValue::String(e.to_string()))
}

fn build(status: StatusCode, ct: ContentTypeId, body: Vec<u8>) -> Response {
    (
        status,
        [
            (header::CONTENT_TYPE, ct.mime()),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendError;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_of(resp: Response) -> Vec<u8> {
        to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn success_is_encoded_with_the_request_codec() {
        let registry = CodecRegistry::new();
        let resp = respond(&registry, ContentTypeId::Json, Ok(json!({"a": 1})));
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(body_of(resp).await, br#"{"a":1}"#.to_vec());
    }

    #[tokio::test]
    async fn errors_use_the_same_codec() {
        let registry = CodecRegistry::new();
        let err = GatewayError::from(BackendError::Server("database is shutting down".into()));
        let resp = respond(&registry, ContentTypeId::MsgPack, Err(err));
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: JsonValue = rmp_serde::from_slice(&body_of(resp).await).unwrap();
        assert_eq!(body, json!({"error_msg": "database is shutting down"}));
    }

    #[tokio::test]
    async fn unsupported_errors_are_plain_text() {
        let registry = CodecRegistry::new();
        let resp = respond(&registry, ContentTypeId::Unsupported, Err(GatewayError::MissingToken));
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_of(resp).await, b"Missing \"Token\" in headers".to_vec());
    }

    #[tokio::test]
    async fn encode_failure_downgrades_to_text_500() {
        let registry = CodecRegistry::new();
        // u64 above i64::MAX has no qpack representation
        let resp = respond(&registry, ContentTypeId::QPack, Ok(json!(u64::MAX)));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        let text = String::from_utf8(body_of(resp).await).unwrap();
        assert!(text.starts_with("Error while encoding response:"), "{text}");
    }
}
