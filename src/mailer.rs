//! Outbound mail seam and verification email content.
//!
//! The core builds the subject, HTML body, and verification link; the
//! [`Mailer`] only transports them. SMTP details live behind the trait.

use async_trait::async_trait;
use log::info;
use thiserror::Error;

/// Subject line on verification emails.
pub const VERIFICATION_EMAIL_SUBJECT: &str = "Verify your account email address";

/// Error types for outbound mail.
#[derive(Debug, Error)]
pub enum MailError {
    /// The transport could not deliver the message.
    #[error("send failed: {0}")]
    Send(String),
}

/// Transactional mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one HTML email to a single recipient.
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailError>;
}

/// Builds the HTML body of a verification email.
///
/// The recipient name is HTML-escaped; the link is produced by the token
/// service and contains only URL-safe characters.
pub fn build_verification_email_html(name: &str, verification_link: &str) -> String {
    let safe_name = html_escape(name);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8" /><title>Verify your email</title></head>
<body style="font-family: Arial, sans-serif; background-color: #f4f4f7; padding: 20px;">
  <h3>Verify your email address</h3>
  <p>Hi there <strong>{safe_name}</strong>,</p>
  <p>To verify your account email address, please click the button below:</p>
  <p style="text-align: center; margin: 30px 0;">
    <a href="{verification_link}"
       style="background-color: #673AB7; color: white; text-decoration: none; padding: 12px 24px; border-radius: 6px; display: inline-block;">
      Verify Email
    </a>
  </p>
  <p>If you did not request this, you can safely ignore this email. Your account will not be affected.</p>
  <p style="font-size: 12px; color: #888;">This link will expire in 24 hours.</p>
</body>
</html>"#
    )
}

fn html_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Mailer that logs instead of sending. Backs the CLI binary and tests.
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        _html_body: &str,
    ) -> Result<(), MailError> {
        info!("Would send \"{subject}\" to {to_name} <{to_email}>");
        Ok(())
    }
}
