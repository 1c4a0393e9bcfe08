use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use super::AuthError;
use crate::registry::UserId;

/// Header carrying the caller's user id, set by the upstream login gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    /// Parses the numeric user id from [`USER_ID_HEADER`].
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        let raw = self
            .headers
            .get(USER_ID_HEADER)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::NotAuthenticated)?;

        raw.parse::<UserId>()
            .map_err(|_| AuthError::InvalidCredentials(format!("invalid user id: {raw}")))
    }
}

/// Authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub method: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user_id: Option<&str>) -> AuthRequest {
        let mut headers = HashMap::new();
        if let Some(id) = user_id {
            headers.insert(USER_ID_HEADER.to_string(), id.to_string());
        }
        AuthRequest {
            headers,
            source_ip: "127.0.0.1".parse().unwrap(),
        }
    }

    #[test]
    fn test_user_id_parsing() {
        assert_eq!(request(Some("42")).user_id().unwrap(), 42);
        assert_eq!(request(Some(" 7 ")).user_id().unwrap(), 7);
        assert!(matches!(
            request(None).user_id(),
            Err(AuthError::NotAuthenticated)
        ));
        assert!(matches!(
            request(Some("")).user_id(),
            Err(AuthError::NotAuthenticated)
        ));
        assert!(matches!(
            request(Some("alice")).user_id(),
            Err(AuthError::InvalidCredentials(_))
        ));
        assert!(matches!(
            request(Some("-3")).user_id(),
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity {
            user_id: 123,
            method: "trusted_header".to_string(),
        };

        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, identity);
    }
}
