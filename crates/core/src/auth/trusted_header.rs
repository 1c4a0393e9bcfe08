use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};

/// Authenticator that takes the user id from `X-User-Id` as given.
///
/// Only safe behind a gateway that sets the header itself and strips any
/// client-supplied value.
#[derive(Debug, Default)]
pub struct TrustedHeaderAuthenticator;

impl TrustedHeaderAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Authenticator for TrustedHeaderAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity {
            user_id: request.user_id()?,
            method: self.method_name().to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "trusted_header"
    }
}
