use crate::app::{AuthValidator, Backend};
use crate::codec::CodecRegistry;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use utoipa::ToSchema;

/// Shared, read-only state of the gateway; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CodecRegistry>,
    pub backend: Arc<dyn Backend>,
    /// `None` disables authentication and the token routes.
    pub auth: Option<AuthValidator>,
    /// `None` disables the web UI routes.
    pub web: Option<Arc<WebOptions>>,
}

impl AppState {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            registry: Arc::new(CodecRegistry::new()),
            backend,
            auth: None,
            web: None,
        }
    }

    pub fn with_auth(mut self, auth: AuthValidator) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_web(mut self, web: WebOptions) -> Self {
        self.web = Some(Arc::new(web));
        self
    }
}

#[derive(Debug, Clone)]
pub struct WebOptions {
    pub static_dir: PathBuf,
}

/// Error body for every structured codec (JSON, MessagePack, QPack, CSV).
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error_msg: String,
}

/// Upper bound for request bodies read by `/insert` and `/query`.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;
