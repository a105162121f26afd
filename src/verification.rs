//! The verification state machine.
//!
//! Orchestrates the domain matcher, fuzzy scorer, and token lifecycle into
//! status transitions, and produces the decision returned to the caller and
//! persisted. Transition table, given a successful domain match and score
//! `s` (cutoffs from [`Settings`], defaults 90/65):
//!
//! | confidence      | emailVerified = false        | emailVerified = true |
//! |-----------------|------------------------------|----------------------|
//! | high (s >= 90)  | PendingEmail, token issued   | Accepted             |
//! | medium (65..90) | PendingEmail, token issued   | PendingAdmin         |
//! | low (s < 65)    | Rejected                     | Rejected             |
//!
//! A domain mismatch rejects unconditionally with the score left unset.
//! Validation and parse errors change no state: the attempt is recorded with
//! `errorOccurred = true` and a user-safe message goes back. The whole
//! decision is computed first, then persisted; merge writes are idempotent,
//! and same-account races fall back to the store's last-write-wins (a known
//! gap, there is no compare-and-swap across the multi-document write).

use std::sync::Arc;

use chrono::Utc;
use log::{error, info};

use crate::config::Settings;
use crate::domain::{has_valid_website_scheme, match_domains};
use crate::error_handling::VerifyError;
use crate::fuzzy::{fuzzy_match_score, Confidence};
use crate::identity::{IdentityError, IdentityProvider};
use crate::mailer::Mailer;
use crate::models::{BusinessProfile, Decision, Role, VerificationAttempt, VerificationStatus};
use crate::normalize::{all_populated, is_valid_email, normalize_string, remove_all_whitespace};
use crate::storage::{attempt_path, user_path, DocumentStore};
use crate::suffix::SuffixResolver;
use crate::token::{ConsumeOutcome, TokenService};

/// Generic user-facing sentence for unexpected collaborator failures.
/// Internal detail is logged server-side and never reaches the caller.
pub const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred during your \
    verification request. Please try again in a few minutes, contact support if the \
    issue persists.";

const ERROR_MESSAGE_END: &str = "Please ensure all account details are correct and try \
    again in a few minutes, contact support if the issue persists.";

const RESEND_MESSAGE_END: &str = "Request the resending of your verification email in \
    the app. Please ensure all account details are correct and try again in a few \
    minutes, contact support if the issue persists.";

/// The verification decision pipeline.
///
/// Request-scoped and stateless between requests: the only shared state is
/// the suffix rule table inside the resolver.
pub struct VerificationService {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    resolver: Arc<SuffixResolver>,
    tokens: TokenService,
    settings: Settings,
}

impl VerificationService {
    /// Wires the pipeline together; the token service is built internally
    /// over the same store and mailer.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mailer: Arc<dyn Mailer>,
        identity: Arc<dyn IdentityProvider>,
        resolver: Arc<SuffixResolver>,
        settings: Settings,
    ) -> Self {
        let tokens = TokenService::new(Arc::clone(&store), mailer, settings.clone());
        VerificationService {
            store,
            identity,
            resolver,
            tokens,
            settings,
        }
    }

    /// Boundary helper: resolves the caller through the identity provider,
    /// then runs [`VerificationService::request_verification`].
    pub async fn request_verification_for_bearer(
        &self,
        authorization_header: Option<&str>,
    ) -> Result<Decision, VerifyError> {
        let raw = authorization_header
            .map(|h| h.trim().trim_start_matches("Bearer ").trim())
            .unwrap_or_default();
        if raw.is_empty() {
            return Ok(Decision::message_only(format!(
                "Missing or invalid authorization token. {ERROR_MESSAGE_END}"
            )));
        }
        let user_id = match self.identity.decode_bearer_token(raw).await {
            Ok(user_id) => user_id,
            Err(IdentityError::Invalid) => {
                return Ok(Decision::message_only(format!(
                    "Could not verify authorization token. {ERROR_MESSAGE_END}"
                )));
            }
            Err(e @ IdentityError::Provider(_)) => {
                error!("Identity provider failure: {e}");
                return Err(e.into());
            }
        };
        self.request_verification(&user_id).await
    }

    /// Runs one verification request for an account, re-evaluating from
    /// scratch whatever the current status is.
    pub async fn request_verification(&self, user_id: &str) -> Result<Decision, VerifyError> {
        let Some(profile_record) = self.store.get(&user_path(user_id)).await? else {
            return Ok(Decision::message_only(format!(
                "Could not find user in database. {ERROR_MESSAGE_END}"
            )));
        };
        let mut profile: BusinessProfile = serde_json::from_value(profile_record)
            .map_err(|e| VerifyError::ExternalService(format!("account record: {e}")))?;

        if profile.role != Role::Business {
            return Ok(Decision::message_only(format!(
                "Only business accounts can request business verification. {ERROR_MESSAGE_END}"
            )));
        }

        let now = Utc::now();
        profile.verification_requested_at = Some(now);

        let mut attempt = self.load_attempt(user_id).await?;
        attempt.attempt_number += 1;
        attempt.requested_at = Some(now);
        attempt.email_verified = Some(profile.email_verified);
        attempt.error_occurred = false;
        attempt.fuzzy_score = None;
        attempt.verification_status = profile.verification_status;

        // Normalize once; everything downstream compares normalized forms.
        // Email and website keep their punctuation (a trailing dot on a host
        // must be rejected, not trimmed away); the name gets the full
        // treatment including diacritic stripping.
        let email = remove_all_whitespace(
            &profile.email.as_deref().unwrap_or_default().trim().to_lowercase(),
        );
        let website = remove_all_whitespace(
            &profile.website.as_deref().unwrap_or_default().trim().to_lowercase(),
        );
        let name = normalize_string(profile.business_name.as_deref().unwrap_or_default());
        profile.email = Some(email.clone());
        profile.website = Some(website.clone());
        profile.business_name = Some(name.clone());

        if !all_populated(&[Some(&email), Some(&website), Some(&name)]) {
            return self
                .record_input_error(user_id, &profile, attempt, "Some user data is missing.")
                .await;
        }
        if !is_valid_email(&email) {
            return self
                .record_input_error(user_id, &profile, attempt, "Invalid email address received.")
                .await;
        }
        if !has_valid_website_scheme(&website) {
            return self
                .record_input_error(
                    user_id,
                    &profile,
                    attempt,
                    "Invalid website address scheme received.",
                )
                .await;
        }

        let pair = match match_domains(&self.resolver, &email, &website) {
            Ok(pair) => pair,
            Err(e) if e.is_recoverable() => {
                info!("Verification attempt for user {user_id} failed input checks: {e}");
                return self
                    .record_input_error(
                        user_id,
                        &profile,
                        attempt,
                        "Email or website address could not be processed properly and might \
                         have an invalid format.",
                    )
                    .await;
            }
            Err(e) => return Err(e),
        };

        if !pair.is_match() {
            let decision = self
                .apply_transition(user_id, &mut profile, &mut attempt, VerificationStatus::Rejected)
                .await?;
            info!(
                "User {user_id} rejected: email domain {} != website domain {}",
                pair.email_domain.registrable_domain, pair.website_domain.registrable_domain
            );
            return Ok(Decision {
                message: format!(
                    "Email and website domains do not match. {ERROR_MESSAGE_END}"
                ),
                ..decision
            });
        }

        let score = fuzzy_match_score(&pair.website_domain.label, &name);
        attempt.fuzzy_score = Some(i64::from(score));
        let confidence = Confidence::classify(
            score,
            self.settings.high_confidence_min,
            self.settings.medium_confidence_min,
        );
        info!(
            "User {user_id} scored {score} ({confidence:?}) against label {}",
            pair.website_domain.label
        );

        let status = match (confidence, profile.email_verified) {
            (Confidence::High, true) => VerificationStatus::Accepted,
            (Confidence::Medium, true) => VerificationStatus::PendingAdmin,
            (Confidence::High | Confidence::Medium, false) => VerificationStatus::PendingEmail,
            (Confidence::Low, _) => VerificationStatus::Rejected,
        };

        if status == VerificationStatus::PendingEmail {
            // Token issuance (mail + token write) happens before the status
            // is persisted, so a mailer failure applies no transition
            self.tokens.issue(user_id, &name, &email).await?;
        }

        let decision = self
            .apply_transition(user_id, &mut profile, &mut attempt, status)
            .await?;
        Ok(Decision {
            message: status_message(status),
            ..decision
        })
    }

    /// Re-evaluates an account after the token lifecycle confirmed email
    /// ownership. Uses the stored score of the most recent attempt; roles
    /// other than business accept immediately.
    pub async fn on_email_ownership_confirmed(
        &self,
        user_id: &str,
    ) -> Result<Decision, VerifyError> {
        let Some(profile_record) = self.store.get(&user_path(user_id)).await? else {
            return Ok(Decision::message_only(format!(
                "Could not find user in database. {RESEND_MESSAGE_END}"
            )));
        };
        let mut profile: BusinessProfile = serde_json::from_value(profile_record)
            .map_err(|e| VerifyError::ExternalService(format!("account record: {e}")))?;
        let mut attempt = self.load_attempt(user_id).await?;

        let high = i64::from(self.settings.high_confidence_min);
        let medium = i64::from(self.settings.medium_confidence_min);
        let score = attempt.fuzzy_score;

        let (status, message) = if profile.role != Role::Business {
            (
                VerificationStatus::Accepted,
                "Your email address verification was successful.".to_string(),
            )
        } else {
            match score {
                Some(s) if s >= high => (
                    VerificationStatus::Accepted,
                    "Your email address and business verification was successful.".to_string(),
                ),
                None => (
                    VerificationStatus::NotStarted,
                    "Your email address verification was successful. However, you still \
                     need to request business verification."
                        .to_string(),
                ),
                Some(s)
                    if s < medium
                        || profile.verification_status == VerificationStatus::Rejected =>
                {
                    (
                        VerificationStatus::Rejected,
                        "Your email address verification was successful. However, you \
                         still need to request new business verification."
                            .to_string(),
                    )
                }
                Some(_) => (
                    VerificationStatus::PendingAdmin,
                    "Your email address verification was successful. Just wait on admin \
                     approval for your business verification now."
                        .to_string(),
                ),
            }
        };

        profile.email_verified = true;
        attempt.email_verified = Some(true);
        let decision = self
            .apply_transition(user_id, &mut profile, &mut attempt, status)
            .await?;
        info!("User {user_id} confirmed email ownership, status {status}");
        Ok(Decision { message, ..decision })
    }

    /// Handles an email-click callback: consumes the token and, when it
    /// proves ownership, re-evaluates the account status. Token invalidation
    /// rides with the status write.
    pub async fn confirm_email(&self, secret: &str) -> Result<Decision, VerifyError> {
        match self.tokens.consume(secret).await? {
            ConsumeOutcome::Confirmed { user_id } => {
                self.on_email_ownership_confirmed(&user_id).await
            }
            ConsumeOutcome::NotFound => Ok(Decision::message_only(format!(
                "Could not find verification token in database. {RESEND_MESSAGE_END}"
            ))),
            ConsumeOutcome::Incomplete => Ok(Decision::message_only(format!(
                "Some user data is missing. {RESEND_MESSAGE_END}"
            ))),
            ConsumeOutcome::AlreadyVerified => Ok(Decision::message_only(
                "You already had a successful email verification process previously.",
            )),
            ConsumeOutcome::Mismatch => Ok(Decision::message_only(format!(
                "User details do not align with verification token details. {RESEND_MESSAGE_END}"
            ))),
            ConsumeOutcome::Expired { resent_to } => Ok(Decision::message_only(format!(
                "Your verification link has expired. A new one has been created \
                 automatically. Please look out for the resent verification email with \
                 the new verification link. It might take a few minutes to reflect in \
                 your inbox. Email address used: {resent_to}"
            ))),
        }
    }

    /// External write path for human admin review of `PendingAdmin`
    /// accounts: sets `Accepted`/`Rejected` directly.
    pub async fn resolve_admin_review(
        &self,
        user_id: &str,
        accept: bool,
    ) -> Result<Decision, VerifyError> {
        let Some(profile_record) = self.store.get(&user_path(user_id)).await? else {
            return Ok(Decision::message_only(format!(
                "Could not find user in database. {ERROR_MESSAGE_END}"
            )));
        };
        let mut profile: BusinessProfile = serde_json::from_value(profile_record)
            .map_err(|e| VerifyError::ExternalService(format!("account record: {e}")))?;
        let mut attempt = self.load_attempt(user_id).await?;

        let status = if accept {
            VerificationStatus::Accepted
        } else {
            VerificationStatus::Rejected
        };
        let decision = self
            .apply_transition(user_id, &mut profile, &mut attempt, status)
            .await?;
        info!("Admin review for user {user_id} recorded as {status}");
        Ok(Decision {
            message: "The admin review outcome has been recorded.".to_string(),
            ..decision
        })
    }

    async fn load_attempt(&self, user_id: &str) -> Result<VerificationAttempt, VerifyError> {
        match self.store.get(&attempt_path(user_id)).await? {
            Some(record) => serde_json::from_value(record)
                .map_err(|e| VerifyError::ExternalService(format!("attempt record: {e}"))),
            None => Ok(VerificationAttempt::default()),
        }
    }

    /// Sets the new status on both records, persists them, and invalidates
    /// outstanding tokens. Only a `PendingEmail` landing keeps its tokens,
    /// since it just issued the one the account is waiting on.
    async fn apply_transition(
        &self,
        user_id: &str,
        profile: &mut BusinessProfile,
        attempt: &mut VerificationAttempt,
        status: VerificationStatus,
    ) -> Result<Decision, VerifyError> {
        profile.verification_status = status;
        attempt.verification_status = status;
        attempt.status_updated_at = Some(Utc::now());

        self.persist(user_id, profile, attempt).await?;

        if status != VerificationStatus::PendingEmail {
            self.tokens.invalidate_all(user_id).await?;
        }

        Ok(Decision {
            status: Some(status),
            fuzzy_score: attempt.fuzzy_score,
            message: String::new(),
        })
    }

    /// Records a validation/parse failure: no transition, attempt marked.
    async fn record_input_error(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
        mut attempt: VerificationAttempt,
        message: &str,
    ) -> Result<Decision, VerifyError> {
        attempt.error_occurred = true;
        attempt.status_updated_at = Some(Utc::now());
        self.persist(user_id, profile, &attempt).await?;
        Ok(Decision::message_only(format!("{message} {ERROR_MESSAGE_END}")))
    }

    async fn persist(
        &self,
        user_id: &str,
        profile: &BusinessProfile,
        attempt: &VerificationAttempt,
    ) -> Result<(), VerifyError> {
        let profile_record = serde_json::to_value(profile)
            .map_err(|e| VerifyError::ExternalService(format!("account serialization: {e}")))?;
        let attempt_record = serde_json::to_value(attempt)
            .map_err(|e| VerifyError::ExternalService(format!("attempt serialization: {e}")))?;
        self.store.set(&user_path(user_id), profile_record).await?;
        self.store
            .set(&attempt_path(user_id), attempt_record)
            .await?;
        Ok(())
    }
}

fn status_message(status: VerificationStatus) -> String {
    match status {
        VerificationStatus::Accepted => "Your business verification request has been \
            approved. The next time you log in, you should be verified."
            .to_string(),
        VerificationStatus::PendingEmail => "Your business verification request is \
            pending email confirmation. Please check your inbox periodically for \
            instructions."
            .to_string(),
        VerificationStatus::PendingAdmin => "Your verification request is pending review \
            by an admin. You will be notified once it's processed."
            .to_string(),
        VerificationStatus::Rejected => format!(
            "Your verification request was rejected due to your domains and business \
             name not matching properly. {ERROR_MESSAGE_END}"
        ),
        VerificationStatus::NotStarted => format!(
            "An unexpected error occurred during your business verification request \
             process. Thus, your request has not started yet. {ERROR_MESSAGE_END}"
        ),
    }
}
