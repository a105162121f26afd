//! Verification state machine transitions.

mod helpers;

use std::sync::Arc;

use chrono::Duration;

use business_verify::{
    attempt_path, user_path, DocumentStore, EmailOwnershipToken, MemoryStore,
    VerificationAttempt, VerificationStatus,
};
use helpers::{build_service, outstanding_token_secrets, seed_account, RecordingMailer};

async fn stored_attempt(store: &MemoryStore, user_id: &str) -> VerificationAttempt {
    let record = store
        .get(&attempt_path(user_id))
        .await
        .unwrap()
        .expect("attempt record should exist");
    serde_json::from_value(record).unwrap()
}

async fn stored_status(store: &MemoryStore, user_id: &str) -> VerificationStatus {
    let record = store.get(&user_path(user_id)).await.unwrap().unwrap();
    serde_json::from_value(record.get("verificationStatus").unwrap().clone()).unwrap()
}

#[tokio::test]
async fn test_high_confidence_unverified_email_goes_pending_email_with_token() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@test.com", "https://test.com", "test", false,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, Some(VerificationStatus::PendingEmail));
    assert!(decision.fuzzy_score.unwrap() >= 90);
    assert_eq!(stored_status(&store, "u1").await, VerificationStatus::PendingEmail);

    // Exactly one token, valid for 24 hours from issuance
    let secrets = outstanding_token_secrets(&store).await;
    assert_eq!(secrets.len(), 1);
    let record = store
        .get(&business_verify::token_path(&secrets[0]))
        .await
        .unwrap()
        .unwrap();
    let token: EmailOwnershipToken = serde_json::from_value(record).unwrap();
    assert_eq!(token.user_id.as_deref(), Some("u1"));
    assert_eq!(
        token.expires_at.unwrap() - token.created_at.unwrap(),
        Duration::hours(24)
    );

    // The email carried the verification link with the secret
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "owner@test.com");
    assert!(sent[0].html_body.contains(&secrets[0]));
}

#[tokio::test]
async fn test_high_confidence_verified_email_is_accepted() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@test.com", "https://test.com", "test", true,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, Some(VerificationStatus::Accepted));
    assert_eq!(mailer.sent_count(), 0);
    assert_eq!(stored_status(&store, "u1").await, VerificationStatus::Accepted);
}

#[tokio::test]
async fn test_medium_confidence_verified_email_goes_pending_admin() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    // "exampel" vs label "example" lands between the 65 and 90 cutoffs
    seed_account(
        &store, "u1", "business", "owner@example.com", "https://example.com", "exampel", true,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, Some(VerificationStatus::PendingAdmin));
    let score = decision.fuzzy_score.unwrap();
    assert!((65..90).contains(&score), "got {score}");
    assert_eq!(mailer.sent_count(), 0);
}

#[tokio::test]
async fn test_medium_confidence_unverified_email_goes_pending_email() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@example.com", "https://example.com", "exampel", false,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, Some(VerificationStatus::PendingEmail));
    assert_eq!(mailer.sent_count(), 1);
}

#[tokio::test]
async fn test_low_confidence_is_rejected_regardless_of_email_state() {
    for email_verified in [false, true] {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::new());
        seed_account(
            &store,
            "u1",
            "business",
            "owner@microsoft.com",
            "https://microsoft.com",
            "Expert Solutions",
            email_verified,
        )
        .await;
        let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

        let decision = service.request_verification("u1").await.unwrap();

        assert_eq!(decision.status, Some(VerificationStatus::Rejected));
        assert!(decision.fuzzy_score.unwrap() < 65);
        assert_eq!(mailer.sent_count(), 0);
    }
}

#[tokio::test]
async fn test_domain_mismatch_rejects_with_score_unset() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "user@test.com", "https://different.com", "test", false,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, Some(VerificationStatus::Rejected));
    assert_eq!(decision.fuzzy_score, None);
    assert!(decision.message.contains("domains do not match"));

    let attempt = stored_attempt(&store, "u1").await;
    assert_eq!(attempt.fuzzy_score, None);
    assert!(!attempt.error_occurred);
    assert_eq!(attempt.verification_status, VerificationStatus::Rejected);
}

#[tokio::test]
async fn test_invalid_input_records_error_without_transition() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(&store, "u1", "business", "owner@test.com", "", "test", false).await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, None);
    assert!(decision.message.contains("missing"));
    assert_eq!(stored_status(&store, "u1").await, VerificationStatus::NotStarted);

    let attempt = stored_attempt(&store, "u1").await;
    assert!(attempt.error_occurred);
    assert_eq!(attempt.attempt_number, 1);
    assert_eq!(attempt.fuzzy_score, None);
}

#[tokio::test]
async fn test_unparseable_website_records_error_without_transition() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@test.com", "https://192.168.0.1", "test", false,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, None);
    assert_eq!(stored_status(&store, "u1").await, VerificationStatus::NotStarted);
    assert!(stored_attempt(&store, "u1").await.error_occurred);
}

#[tokio::test]
async fn test_non_business_role_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "customer", "owner@test.com", "https://test.com", "test", false,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, None);
    assert!(decision.message.contains("Only business accounts"));
    // No attempt is recorded for refused requests
    assert!(store.get(&attempt_path("u1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_user_gets_user_safe_message() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service.request_verification("missing").await.unwrap();

    assert_eq!(decision.status, None);
    assert!(decision.message.contains("Could not find user"));
}

#[tokio::test]
async fn test_attempt_number_increments_across_requests() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@test.com", "https://test.com", "test", false,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    service.request_verification("u1").await.unwrap();
    service.request_verification("u1").await.unwrap();

    assert_eq!(stored_attempt(&store, "u1").await.attempt_number, 2);
}

#[tokio::test]
async fn test_rejection_invalidates_outstanding_tokens() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@test.com", "https://test.com", "test", false,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    // First request lands PendingEmail and issues a token
    service.request_verification("u1").await.unwrap();
    assert_eq!(outstanding_token_secrets(&store).await.len(), 1);

    // The business name changes to something unrelated; the re-request
    // rejects and must clean up the outstanding token
    store
        .set(
            &user_path("u1"),
            serde_json::json!({"businessName": "Completely Unrelated Ventures"}),
        )
        .await
        .unwrap();
    let decision = service.request_verification("u1").await.unwrap();

    assert_eq!(decision.status, Some(VerificationStatus::Rejected));
    assert!(outstanding_token_secrets(&store).await.is_empty());
}

#[tokio::test]
async fn test_admin_review_write_path() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@example.com", "https://example.com", "exampel", true,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    service.request_verification("u1").await.unwrap();
    assert_eq!(stored_status(&store, "u1").await, VerificationStatus::PendingAdmin);

    let decision = service.resolve_admin_review("u1", true).await.unwrap();
    assert_eq!(decision.status, Some(VerificationStatus::Accepted));
    assert_eq!(stored_status(&store, "u1").await, VerificationStatus::Accepted);
}

#[tokio::test]
async fn test_bearer_boundary_resolves_caller() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::new());
    seed_account(
        &store, "u1", "business", "owner@test.com", "https://test.com", "test", true,
    )
    .await;
    let service = build_service(Arc::clone(&store), Arc::clone(&mailer));

    let decision = service
        .request_verification_for_bearer(Some("Bearer good-token"))
        .await
        .unwrap();
    assert_eq!(decision.status, Some(VerificationStatus::Accepted));

    let refused = service
        .request_verification_for_bearer(Some("Bearer bogus"))
        .await
        .unwrap();
    assert_eq!(refused.status, None);
    assert!(refused.message.contains("authorization token"));

    let missing = service.request_verification_for_bearer(None).await.unwrap();
    assert!(missing.message.contains("Missing or invalid"));
}
