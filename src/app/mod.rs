pub mod auth;
pub mod backend;
pub mod credential_store;
pub mod memory_backend;

pub use auth::AuthValidator;
pub use backend::Backend;
pub use credential_store::{CredentialStore, SecretCredentialStore, TokenPayload};
pub use memory_backend::MemoryBackend;
