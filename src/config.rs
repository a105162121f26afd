use std::time::Duration;

use clap::ValueEnum;

// constants (used as defaults)

/// Minimum fuzzy score for high confidence (automatic accept once email is verified).
pub const HIGH_CONFIDENCE_MIN: u8 = 90;
/// Minimum fuzzy score for medium confidence (admin review once email is verified).
/// Scores below this are rejected outright.
pub const MEDIUM_CONFIDENCE_MIN: u8 = 65;

/// How long an email-ownership token stays valid after issuance.
pub const TOKEN_TTL_HOURS: i64 = 24;
/// Number of random bytes in a token secret before URL-safe base64 encoding.
pub const TOKEN_LENGTH_BYTES: usize = 32;

/// Canonical source of the public suffix rule list.
pub const PUBLIC_SUFFIX_LIST_URL: &str = "https://publicsuffix.org/list/public_suffix_list.dat";
/// Timeout for downloading the public suffix rule list.
pub const SUFFIX_LIST_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

// Document store collection layout, shared with the account-creation side.

/// Top-level collection of account records.
pub const USER_COLLECTION: &str = "users";
/// Per-account subcollection holding the verification attempt record.
pub const VERIFICATION_COLLECTION: &str = "businessVerification";
/// Top-level collection of email-ownership tokens, keyed by secret.
pub const TOKEN_COLLECTION: &str = "emailVerificationTokens";
/// Field inside a token record used for bulk cleanup of a user's tokens.
pub const TOKEN_USER_ID_FIELD: &str = "userId";

/// URI schemes accepted on a submitted website address.
pub const SUPPORTED_WEBSITE_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Logging level for the application.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Informational messages and above.
    Info,
    /// Debug detail and above.
    Debug,
    /// Everything, including trace detail.
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Immutable service configuration, constructed once at startup and passed
/// into component constructors.
///
/// Holding the fuzzy thresholds here keeps them tunable without touching the
/// scoring algorithm itself; the constants above are only defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL used when building verification links sent by email.
    pub base_url: String,
    /// Display name on outbound verification emails.
    pub sender_name: String,
    /// Sender address on outbound verification emails.
    pub sender_email: String,
    /// Where the public suffix rule list is fetched from.
    pub suffix_list_url: String,
    /// Fuzzy score at or above which a name match is high confidence.
    pub high_confidence_min: u8,
    /// Fuzzy score at or above which a name match is medium confidence.
    pub medium_confidence_min: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: "https://localhost".to_string(),
            sender_name: "Verification".to_string(),
            sender_email: "no-reply@localhost".to_string(),
            suffix_list_url: PUBLIC_SUFFIX_LIST_URL.to_string(),
            high_confidence_min: HIGH_CONFIDENCE_MIN,
            medium_confidence_min: MEDIUM_CONFIDENCE_MIN,
        }
    }
}
