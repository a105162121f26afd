//! business_verify library: business verification decision pipeline
//!
//! Verifies that a self-reported business (email, website, display name)
//! plausibly belongs to one real organization, producing a trust decision
//! used to gate a "verified business" flag:
//!
//! - registrable-domain matching between the email address and website URL,
//! - fuzzy similarity scoring between the business name and the website's
//!   domain label,
//! - a multi-stage verification status state machine,
//! - a token-based email-ownership proof lifecycle (issue, expire,
//!   auto-resend, single-use consumption).
//!
//! Storage, mail transport, and identity decoding are external collaborators
//! behind the [`DocumentStore`], [`Mailer`], and [`IdentityProvider`] traits.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use business_verify::{
//!     LogMailer, MemoryStore, Settings, StaticIdentityProvider, SuffixResolver,
//!     VerificationService,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let resolver = Arc::new(SuffixResolver::from_url(&settings.suffix_list_url).await?);
//! let service = VerificationService::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(LogMailer),
//!     Arc::new(StaticIdentityProvider::new()),
//!     resolver,
//!     settings,
//! );
//! let decision = service.request_verification("some-user-id").await?;
//! println!("{}", decision.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. The public suffix rule list must
//! be obtainable at startup; a later refresh failure keeps serving stale
//! rules.

#![warn(missing_docs)]

pub mod config;
mod domain;
mod error_handling;
mod fuzzy;
mod identity;
mod mailer;
mod models;
mod normalize;
mod storage;
mod suffix;
mod token;
mod verification;

// Re-export public API
pub use config::{LogLevel, Settings};
pub use domain::{build_website_url, has_valid_website_scheme, match_domains, DomainPair};
pub use error_handling::VerifyError;
pub use fuzzy::{fuzzy_match_score, Confidence};
pub use identity::{IdentityError, IdentityProvider, StaticIdentityProvider};
pub use mailer::{build_verification_email_html, LogMailer, MailError, Mailer};
pub use models::{
    BusinessProfile, Decision, EmailOwnershipToken, Role, VerificationAttempt, VerificationStatus,
};
pub use normalize::{normalize_string, remove_all_whitespace};
pub use storage::{
    attempt_path, token_path, user_path, DocumentStore, MemoryStore, StoreError,
};
pub use suffix::{ResolvedDomain, SuffixListError, SuffixResolver};
pub use token::{generate_token, ConsumeOutcome, TokenService};
pub use verification::{VerificationService, GENERIC_FAILURE_MESSAGE};
