use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use crate::counter::{CounterError, CounterStore};
use crate::metrics::TOKENS_ISSUED;

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdef";

#[derive(Debug, Error)]
pub enum TokenError {
    /// Never issued, already consumed, or expired.
    #[error("Token not found")]
    NotFound,

    /// Entry exists but the presented value differs. The entry is kept.
    #[error("Token mismatch")]
    Mismatch,

    #[error("Token store unavailable: {0}")]
    StoreUnavailable(#[from] CounterError),
}

/// Namespaces tokens so different flows can never consume each other's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    /// Private-mode registration gate, keyed by ticket and user.
    RegistrationGate,
    /// OAuth redirect state, keyed by the token itself.
    OAuthState,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::RegistrationGate => "gate",
            TokenPurpose::OAuthState => "oauth",
        }
    }
}

/// Generates a random lowercase hex token of `length` characters.
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect()
}

/// Issues and verifies single-use tokens.
///
/// This is the only component that writes token entries.
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn CounterStore>,
    token_length: usize,
}

impl TokenIssuer {
    pub fn new(store: Arc<dyn CounterStore>, token_length: usize) -> Self {
        Self {
            store,
            token_length,
        }
    }

    fn key(purpose: TokenPurpose, id: &str) -> String {
        format!("token:{}:{}", purpose.as_str(), id)
    }

    /// Issues a token bound to `subject`, replacing any earlier one.
    pub async fn issue_for_subject(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let token = generate_token(self.token_length);
        self.store
            .set(&Self::key(purpose, subject), &token, ttl)
            .await?;

        TOKENS_ISSUED
            .with_label_values(&[purpose.as_str()])
            .inc();
        tracing::debug!(
            subject,
            purpose = purpose.as_str(),
            ttl_secs = ttl.as_secs(),
            "Issued subject token"
        );

        Ok(token)
    }

    /// Issues a token that addresses `payload` directly.
    pub async fn issue_anonymous(
        &self,
        purpose: TokenPurpose,
        payload: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let token = generate_token(self.token_length);
        self.store
            .set(&Self::key(purpose, &token), payload, ttl)
            .await?;

        TOKENS_ISSUED
            .with_label_values(&[purpose.as_str()])
            .inc();
        tracing::debug!(
            purpose = purpose.as_str(),
            ttl_secs = ttl.as_secs(),
            "Issued anonymous token"
        );

        Ok(token)
    }

    /// Consumes a token-keyed entry and returns its payload.
    ///
    /// Only the caller whose delete actually removed the entry gets the payload,
    /// so two concurrent consumers cannot both succeed.
    pub async fn consume(&self, purpose: TokenPurpose, token: &str) -> Result<String, TokenError> {
        let key = Self::key(purpose, token);
        let payload = self.store.get(&key).await?.ok_or(TokenError::NotFound)?;

        if !self.store.delete(&key).await? {
            return Err(TokenError::NotFound);
        }

        tracing::debug!(purpose = purpose.as_str(), "Token consumed");
        Ok(payload)
    }

    /// Compares `presented` against the token bound to `subject` without
    /// consuming it.
    pub async fn check_subject(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        presented: &str,
    ) -> Result<(), TokenError> {
        let stored = self
            .store
            .get(&Self::key(purpose, subject))
            .await?
            .ok_or(TokenError::NotFound)?;

        if constant_time_eq::constant_time_eq(stored.as_bytes(), presented.as_bytes()) {
            Ok(())
        } else {
            tracing::debug!(subject, purpose = purpose.as_str(), "Token mismatch");
            Err(TokenError::Mismatch)
        }
    }

    /// Checks `presented` and consumes the entry on success.
    ///
    /// A mismatch leaves the entry in place so the legitimate holder can retry
    /// within the remaining TTL.
    pub async fn verify_subject(
        &self,
        subject: &str,
        purpose: TokenPurpose,
        presented: &str,
    ) -> Result<(), TokenError> {
        self.check_subject(subject, purpose, presented).await?;

        if !self.store.delete(&Self::key(purpose, subject)).await? {
            return Err(TokenError::NotFound);
        }
        Ok(())
    }

    /// Removes the token bound to `subject`, if any.
    pub async fn revoke_subject(
        &self,
        subject: &str,
        purpose: TokenPurpose,
    ) -> Result<bool, TokenError> {
        Ok(self.store.delete(&Self::key(purpose, subject)).await?)
    }
}
