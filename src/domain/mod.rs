//! Request-independent domain types: content types, credentials, error kinds.

pub mod content_type;
pub mod credential;
pub mod error;

pub use content_type::ContentTypeId;
pub use credential::{AuthCredential, Scheme};
pub use error::{AuthError, BackendError, GatewayError};
