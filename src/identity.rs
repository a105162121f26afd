//! Bearer-token identity seam.
//!
//! The HTTP boundary resolves the caller's user id through this trait before
//! the state machine runs. Token format and validation rules belong to the
//! external provider; the core only needs a subject id back.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Error types for bearer-token decoding.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The token failed validation. A user-safe refusal, not an outage.
    #[error("invalid bearer token")]
    Invalid,
    /// The provider itself failed.
    #[error("provider error: {0}")]
    Provider(String),
}

/// External identity provider that validates and decodes caller identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Validates a raw bearer token and returns the subject (user) id.
    async fn decode_bearer_token(&self, raw: &str) -> Result<String, IdentityError>;
}

/// Fixed token-to-subject mapping. Backs tests and the CLI binary.
#[derive(Default)]
pub struct StaticIdentityProvider {
    subjects: HashMap<String, String>,
}

impl StaticIdentityProvider {
    /// Creates a provider that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one accepted token-to-subject mapping.
    pub fn with_subject(mut self, token: &str, user_id: &str) -> Self {
        self.subjects.insert(token.to_string(), user_id.to_string());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn decode_bearer_token(&self, raw: &str) -> Result<String, IdentityError> {
        self.subjects
            .get(raw)
            .cloned()
            .ok_or(IdentityError::Invalid)
    }
}
