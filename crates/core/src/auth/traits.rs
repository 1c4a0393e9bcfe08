use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

#[derive(Debug, Error)]
pub enum AuthError {
    /// No user id (or no key, in api_key mode) on the request.
    #[error("Authentication required")]
    NotAuthenticated,

    /// A wrong API key or a user id that is not a number.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The configured method cannot be built, e.g. api_key without a key.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Resolves the calling user from an incoming request.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Name of this authentication method
    fn method_name(&self) -> &'static str;
}
