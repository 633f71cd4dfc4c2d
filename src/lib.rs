pub mod app;
pub mod codec;
pub mod domain;
pub mod infra;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{
    AuthValidator, Backend, CredentialStore, MemoryBackend, SecretCredentialStore, TokenPayload,
};
pub use codec::CodecRegistry;
pub use domain::{AuthError, BackendError, ContentTypeId, GatewayError};
pub use infra::GatewayConfig;
