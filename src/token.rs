//! Email-ownership token lifecycle: issue, expire, auto-renew, single-use
//! consumption.
//!
//! A token secret is 32 bytes from the OS random source, URL-safe base64
//! without padding, and doubles as the document key under
//! `emailVerificationTokens/`. Tokens expire 24 hours after issuance; an
//! expired token self-heals on consumption by issuing a replacement and
//! resending the email.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use log::{info, warn};
use rand::rngs::OsRng;
use rand::TryRngCore;

use crate::config::{Settings, TOKEN_COLLECTION, TOKEN_LENGTH_BYTES, TOKEN_TTL_HOURS,
    TOKEN_USER_ID_FIELD};
use crate::error_handling::VerifyError;
use crate::mailer::{build_verification_email_html, Mailer, VERIFICATION_EMAIL_SUBJECT};
use crate::models::EmailOwnershipToken;
use crate::normalize::{is_valid_email, remove_all_whitespace};
use crate::storage::{token_path, user_path, DocumentStore};

/// Outcome of consuming a token secret.
///
/// These are normal business outcomes, not errors: each maps to a user-safe
/// message at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Token checks out; the caller owns the claimed email address.
    Confirmed {
        /// Account the token was issued for.
        user_id: String,
    },
    /// No stored token matches. Also what a second consumption of an
    /// already-deleted token sees.
    NotFound,
    /// Token had expired; a replacement with a fresh 24-hour window was
    /// issued and mailed to this address.
    Expired {
        /// Address the replacement email went to.
        resent_to: String,
    },
    /// Stored token or its account record is missing required data.
    Incomplete,
    /// The account's email is already verified; idempotent no-op.
    AlreadyVerified,
    /// The account email changed after issuance. The token is kept so a
    /// fresh attempt remains possible, but confirmation does not proceed.
    Mismatch,
}

/// Generates a cryptographically random, URL-safe token secret.
pub fn generate_token() -> Result<String, VerifyError> {
    let mut bytes = [0u8; TOKEN_LENGTH_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| VerifyError::ExternalService(format!("OS random source: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Issues, renews, and consumes email-ownership tokens.
pub struct TokenService {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
    settings: Settings,
}

impl TokenService {
    /// Builds a token service over the given store and mailer.
    pub fn new(store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>, settings: Settings) -> Self {
        TokenService {
            store,
            mailer,
            settings,
        }
    }

    fn verification_link(&self, secret: &str) -> String {
        format!(
            "{}/verify-email?token={secret}",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    /// Issues a fresh token for an account, sends the verification email,
    /// and stores the token record. Returns the secret.
    pub async fn issue(&self, user_id: &str, name: &str, email: &str) -> Result<String, VerifyError> {
        let secret = generate_token()?;
        let link = self.verification_link(&secret);
        let html = build_verification_email_html(name, &link);

        self.mailer
            .send(email, name, VERIFICATION_EMAIL_SUBJECT, &html)
            .await?;

        let mut token = EmailOwnershipToken {
            user_id: Some(user_id.to_string()),
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            created_at: None,
            expires_at: None,
        };
        token.stamp(Duration::hours(TOKEN_TTL_HOURS));

        let record = serde_json::to_value(&token)
            .map_err(|e| VerifyError::ExternalService(format!("token serialization: {e}")))?;
        self.store.set(&token_path(&secret), record).await?;

        info!("Issued email-ownership token for user {user_id}");
        Ok(secret)
    }

    /// Replaces an expired token: same account details, fresh 24-hour
    /// window, old record deleted, email resent.
    async fn reissue(
        &self,
        old_secret: &str,
        old: &EmailOwnershipToken,
    ) -> Result<(), VerifyError> {
        let (Some(user_id), Some(name), Some(email)) = (
            old.user_id.as_deref(),
            old.name.as_deref(),
            old.email.as_deref(),
        ) else {
            return Err(VerifyError::ExternalService(
                "expired token record lost its account details".into(),
            ));
        };
        self.issue(user_id, name, email).await?;
        self.store.delete(&token_path(old_secret)).await?;
        Ok(())
    }

    /// Consumes a token secret and reports what it proved.
    ///
    /// Token-side checks only; on `Confirmed` the state machine persists the
    /// status change and then calls [`TokenService::invalidate_all`], so the
    /// token deletion rides with the status write.
    pub async fn consume(&self, secret: &str) -> Result<ConsumeOutcome, VerifyError> {
        let secret = secret.trim();
        if secret.is_empty() {
            return Ok(ConsumeOutcome::NotFound);
        }

        let Some(record) = self.store.get(&token_path(secret)).await? else {
            return Ok(ConsumeOutcome::NotFound);
        };
        let Ok(mut token) = serde_json::from_value::<EmailOwnershipToken>(record) else {
            warn!("Stored token record does not deserialize");
            return Ok(ConsumeOutcome::Incomplete);
        };

        let complete = token.user_id.as_deref().is_some_and(|s| !s.trim().is_empty())
            && token.name.as_deref().is_some_and(|s| !s.trim().is_empty())
            && token.email.as_deref().is_some_and(|s| !s.trim().is_empty())
            && token.created_at.is_some()
            && token.expires_at.is_some();
        if !complete {
            return Ok(ConsumeOutcome::Incomplete);
        }

        // Normalize stored fields the same way the request path does
        let email = token
            .email
            .as_deref()
            .map(|e| remove_all_whitespace(&e.trim().to_lowercase()))
            .unwrap_or_default();
        let user_id = token
            .user_id
            .as_deref()
            .map(|u| remove_all_whitespace(u.trim()))
            .unwrap_or_default();
        token.email = Some(email.clone());
        if !is_valid_email(&email) {
            return Ok(ConsumeOutcome::Incomplete);
        }

        if token.expires_at.is_some_and(|expires| Utc::now() > expires) {
            self.reissue(secret, &token).await?;
            info!("Expired token for user {user_id} replaced and resent");
            return Ok(ConsumeOutcome::Expired { resent_to: email });
        }

        let Some(profile_record) = self.store.get(&user_path(&user_id)).await? else {
            warn!("Token for user {user_id} has no matching account record");
            return Ok(ConsumeOutcome::Incomplete);
        };
        let profile: crate::models::BusinessProfile = serde_json::from_value(profile_record)
            .map_err(|e| VerifyError::ExternalService(format!("account record: {e}")))?;

        if profile.email_verified {
            return Ok(ConsumeOutcome::AlreadyVerified);
        }

        let profile_email = profile
            .email
            .as_deref()
            .map(|e| remove_all_whitespace(&e.trim().to_lowercase()))
            .unwrap_or_default();
        if profile_email != email {
            // Account email changed after issuance; keep the token
            return Ok(ConsumeOutcome::Mismatch);
        }

        Ok(ConsumeOutcome::Confirmed { user_id })
    }

    /// Deletes every outstanding token for an account, including the one
    /// just consumed. Safe to retry.
    pub async fn invalidate_all(&self, user_id: &str) -> Result<(), VerifyError> {
        self.store
            .delete_where(TOKEN_COLLECTION, TOKEN_USER_ID_FIELD, user_id)
            .await?;
        Ok(())
    }
}
