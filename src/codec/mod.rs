//! Codec registry: one decode/encode set per supported content type.
//!
//! The registry is built once at startup and shared read-only by all requests.
//! `Unsupported` has no entry; its responses go through [`encode_text`].

pub mod csv;
pub mod qpack;

use crate::domain::ContentTypeId;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// A body that could not be decoded into a structured value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// A value that could not be serialized in the negotiated format.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct EncodeError(pub String);

pub type DecodeFn = fn(&[u8]) -> Result<Value, DecodeError>;
pub type EncodeFn = fn(&Value) -> Result<Vec<u8>, EncodeError>;

#[derive(Clone, Copy)]
pub struct Codec {
    pub decode_insert: DecodeFn,
    pub decode_query: DecodeFn,
    pub encode: EncodeFn,
}

pub struct CodecRegistry {
    codecs: HashMap<ContentTypeId, Codec>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        let mut codecs = HashMap::with_capacity(ContentTypeId::SUPPORTED.len());
        codecs.insert(
            ContentTypeId::MsgPack,
            Codec {
                decode_insert: decode_msgpack,
                decode_query: decode_msgpack,
                encode: encode_msgpack,
            },
        );
        codecs.insert(
            ContentTypeId::QPack,
            Codec {
                decode_insert: decode_qpack,
                decode_query: decode_qpack,
                encode: encode_qpack,
            },
        );
        codecs.insert(
            ContentTypeId::Json,
            Codec {
                decode_insert: decode_json,
                decode_query: decode_json,
                encode: encode_json,
            },
        );
        codecs.insert(
            ContentTypeId::Csv,
            Codec {
                decode_insert: decode_csv_insert,
                decode_query: decode_csv_query,
                encode: encode_csv,
            },
        );
        Self { codecs }
    }

    pub fn get(&self, id: ContentTypeId) -> Option<&Codec> {
        self.codecs.get(&id)
    }

    pub fn decode_insert(&self, id: ContentTypeId, body: &[u8]) -> Result<Value, DecodeError> {
        let codec = self.get(id).ok_or_else(|| no_codec(id))?;
        (codec.decode_insert)(body)
    }

    /// Decodes a query body down to the query string.
    ///
    /// A decoded mapping must carry the query under `"query"`.
    pub fn decode_query(&self, id: ContentTypeId, body: &[u8]) -> Result<String, DecodeError> {
        let codec = self.get(id).ok_or_else(|| no_codec(id))?;
        extract_query((codec.decode_query)(body)?)
    }

    /// Encodes with the registered codec, or as plain text for `Unsupported`.
    pub fn encode(&self, id: ContentTypeId, value: &Value) -> Result<Vec<u8>, EncodeError> {
        match self.get(id) {
            Some(codec) => (codec.encode)(value),
            None => Ok(encode_text(value)),
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn no_codec(id: ContentTypeId) -> DecodeError {
    DecodeError(format!("no decoder for content type {:?}", id))
}

pub fn extract_query(decoded: Value) -> Result<String, DecodeError> {
    let query = match decoded {
        Value::Object(mut map) => map
            .remove("query")
            .ok_or_else(|| DecodeError("missing field \"query\"".to_string()))?,
        other => other,
    };
    match query {
        Value::String(q) => Ok(q),
        other => Err(DecodeError(format!("query must be a string, got {}", other))),
    }
}

/// Plain-text rendering used when no codec could be negotiated.
pub fn encode_text(value: &Value) -> Vec<u8> {
    match value {
        Value::String(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}

fn decode_msgpack(body: &[u8]) -> Result<Value, DecodeError> {
    rmp_serde::from_slice(body).map_err(|e| DecodeError(e.to_string()))
}

fn encode_msgpack(value: &Value) -> Result<Vec<u8>, EncodeError> {
    rmp_serde::to_vec_named(value).map_err(|e| EncodeError(e.to_string()))
}

fn decode_qpack(body: &[u8]) -> Result<Value, DecodeError> {
    qpack::unpack(body).map_err(|e| DecodeError(e.to_string()))
}

fn encode_qpack(value: &Value) -> Result<Vec<u8>, EncodeError> {
    qpack::pack(value).map_err(|e| EncodeError(e.to_string()))
}

fn decode_json(body: &[u8]) -> Result<Value, DecodeError> {
    serde_json::from_slice(body).map_err(|e| DecodeError(e.to_string()))
}

fn encode_json(value: &Value) -> Result<Vec<u8>, EncodeError> {
    serde_json::to_vec(value).map_err(|e| EncodeError(e.to_string()))
}

fn decode_csv_insert(body: &[u8]) -> Result<Value, DecodeError> {
    csv::loads_insert(body).map_err(|e| DecodeError(e.to_string()))
}

fn decode_csv_query(body: &[u8]) -> Result<Value, DecodeError> {
    csv::loads_query(body).map_err(|e| DecodeError(e.to_string()))
}

fn encode_csv(value: &Value) -> Result<Vec<u8>, EncodeError> {
    csv::dumps(value).map_err(|e| EncodeError(e.to_string()))
}
