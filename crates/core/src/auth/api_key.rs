//! API Key authentication.

use async_trait::async_trait;
use constant_time_eq::constant_time_eq;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that requires a configured API key next to `X-User-Id`.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
pub struct ApiKeyAuthenticator {
    expected_key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(api_key: String) -> Self {
        Self {
            expected_key: api_key,
        }
    }

    fn extract_key<'a>(&self, request: &'a AuthRequest) -> Option<&'a str> {
        if let Some(auth_header) = request.headers.get("authorization") {
            if let Some(key) = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
            {
                return Some(key);
            }
        }

        request.headers.get("x-api-key").map(String::as_str)
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        if !constant_time_eq(provided_key.as_bytes(), self.expected_key.as_bytes()) {
            return Err(AuthError::InvalidCredentials("Invalid API key".to_string()));
        }

        Ok(Identity {
            user_id: request.user_id()?,
            method: self.method_name().to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}
