// Shared test helpers: suffix rules, a recording mailer, and service setup.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use business_verify::{
    DocumentStore, MailError, Mailer, MemoryStore, Settings, StaticIdentityProvider,
    SuffixResolver, VerificationService,
};

/// A small but realistic slice of the public suffix rule list.
pub const TEST_RULES: &str = "// ===BEGIN ICANN DOMAINS===\ncom\nnet\norg\nio\nco.za\ncom.au\n// ===END ICANN DOMAINS===\n";

/// One captured outbound email.
#[derive(Debug, Clone)]
#[allow(dead_code)] // Fields inspected by some test files only
pub struct SentMail {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html_body: String,
}

/// Mailer that captures every send for assertions.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mailer lock").clone()
    }

    #[allow(dead_code)]
    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer lock").len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        self.sent.lock().expect("mailer lock").push(SentMail {
            to_email: to_email.to_string(),
            to_name: to_name.to_string(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

#[allow(dead_code)]
pub fn test_settings() -> Settings {
    Settings {
        base_url: "https://svc.test".to_string(),
        ..Settings::default()
    }
}

/// Builds a verification service over the given store and mailer, with a
/// resolver loaded from [`TEST_RULES`] and one known bearer token
/// (`good-token` -> `u1`).
#[allow(dead_code)]
pub fn build_service(
    store: Arc<MemoryStore>,
    mailer: Arc<RecordingMailer>,
) -> VerificationService {
    let resolver =
        Arc::new(SuffixResolver::from_list_text(TEST_RULES).expect("test rules should parse"));
    let identity = Arc::new(StaticIdentityProvider::new().with_subject("good-token", "u1"));
    VerificationService::new(store, mailer, identity, resolver, test_settings())
}

/// Seeds a `users/{userId}` record the way account creation would.
#[allow(dead_code)]
pub async fn seed_account(
    store: &MemoryStore,
    user_id: &str,
    role: &str,
    email: &str,
    website: &str,
    name: &str,
    email_verified: bool,
) {
    store
        .set(
            &business_verify::user_path(user_id),
            json!({
                "userId": user_id,
                "role": role,
                "email": email,
                "website": website,
                "businessName": name,
                "emailVerified": email_verified,
            }),
        )
        .await
        .expect("seeding account record");
}

/// Secrets of all outstanding email-ownership tokens in the store.
#[allow(dead_code)]
pub async fn outstanding_token_secrets(store: &MemoryStore) -> Vec<String> {
    store
        .paths_with_prefix("emailVerificationTokens/")
        .await
        .into_iter()
        .map(|p| p.trim_start_matches("emailVerificationTokens/").to_string())
        .collect()
}
