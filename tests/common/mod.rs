//! Stub collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, Response};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tsdb_gateway::transport::http::AppState;
use tsdb_gateway::{AuthError, AuthValidator, Backend, BackendError, CredentialStore, TokenPayload};

/// Backend that records every call and answers with a canned result.
#[derive(Default)]
pub struct RecordingBackend {
    pub inserts: Mutex<Vec<JsonValue>>,
    pub queries: Mutex<Vec<String>>,
    pub fail_with: Mutex<Option<BackendError>>,
}

impl RecordingBackend {
    pub fn failing(err: BackendError) -> Self {
        let backend = Self::default();
        *backend.fail_with.lock().unwrap() = Some(err);
        backend
    }

    pub fn calls(&self) -> usize {
        self.inserts.lock().unwrap().len() + self.queries.lock().unwrap().len()
    }

    fn outcome(&self, ok: JsonValue) -> Result<JsonValue, BackendError> {
        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(ok),
        }
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn insert(&self, payload: JsonValue) -> Result<JsonValue, BackendError> {
        self.inserts.lock().unwrap().push(payload);
        self.outcome(json!({ "success_msg": "Successfully inserted 1 point(s)." }))
    }

    async fn query(&self, query: &str) -> Result<JsonValue, BackendError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.outcome(json!({ "cpu": [[1500000000, 0.5]] }))
    }

    fn db_info(&self) -> JsonValue {
        json!({ "dbname": "dbtest", "version": "test", "time_precision": "s", "server": "stub" })
    }
}

/// Credential store that accepts secret `sesame` and token `tok-1`.
#[derive(Default)]
pub struct StubStore {
    pub issued: AtomicUsize,
    pub refreshed: AtomicUsize,
}

pub const SECRET: &str = "sesame";
pub const TOKEN: &str = "tok-1";
pub const REFRESH: &str = "ref-1";

fn payload() -> TokenPayload {
    TokenPayload {
        token: TOKEN.to_string(),
        refresh_token: REFRESH.to_string(),
        expiration_time: 1_900_000_000,
    }
}

#[async_trait]
impl CredentialStore for StubStore {
    async fn validate_token(&self, token: &str) -> Result<(), AuthError> {
        if token == TOKEN {
            Ok(())
        } else {
            Err(AuthError::Authentication("Invalid token".to_string()))
        }
    }

    async fn validate_secret(&self, secret: &str) -> Result<(), AuthError> {
        if secret == SECRET {
            Ok(())
        } else {
            Err(AuthError::UserAuth("Invalid secret".to_string()))
        }
    }

    async fn get_token(&self, secret: &str) -> Result<TokenPayload, AuthError> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.validate_secret(secret).await?;
        Ok(payload())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPayload, AuthError> {
        self.refreshed.fetch_add(1, Ordering::SeqCst);
        if refresh_token == REFRESH {
            Ok(payload())
        } else {
            Err(AuthError::Authentication("Invalid refresh token".to_string()))
        }
    }
}

pub fn state(backend: Arc<RecordingBackend>) -> AppState {
    AppState::new(backend)
}

pub fn state_with_auth(
    backend: Arc<RecordingBackend>,
    store: Arc<StubStore>,
    token_required: bool,
) -> AppState {
    AppState::new(backend).with_auth(AuthValidator::new(store, token_required))
}

pub fn post(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}

pub async fn body_json(resp: Response<Body>) -> JsonValue {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

pub fn content_type(resp: &Response<Body>) -> &str {
    resp.headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
