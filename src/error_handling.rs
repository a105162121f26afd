use thiserror::Error;

use crate::identity::IdentityError;
use crate::mailer::MailError;
use crate::storage::StoreError;

/// Errors produced by the verification core.
///
/// `InputValidation` and `DomainParseFailure` are recovered at the state
/// machine boundary into a user-safe message with `errorOccurred = true` and
/// no status transition. A domain mismatch is not an error at all: it is a
/// normal `Rejected` outcome. Only `ExternalService` surfaces to the caller
/// as an unexpected failure, and its internal detail is logged server-side
/// rather than echoed back.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// Missing or empty fields, malformed email or URI, unsupported or
    /// duplicated URI scheme.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// A well-formed hostname that does not resolve to a registrable domain:
    /// bare top-level domain, unrecognized suffix, IP-literal host.
    #[error("domain parse failure: {0}")]
    DomainParseFailure(String),

    /// A collaborator (document store, mailer, identity provider) failed.
    /// Opaque by design; the user only ever sees a generic retry message.
    #[error("external service failure: {0}")]
    ExternalService(String),
}

impl From<StoreError> for VerifyError {
    fn from(e: StoreError) -> Self {
        VerifyError::ExternalService(format!("document store: {e}"))
    }
}

impl From<MailError> for VerifyError {
    fn from(e: MailError) -> Self {
        VerifyError::ExternalService(format!("mailer: {e}"))
    }
}

impl From<IdentityError> for VerifyError {
    fn from(e: IdentityError) -> Self {
        VerifyError::ExternalService(format!("identity provider: {e}"))
    }
}

impl VerifyError {
    /// True for the error classes that are recovered into a user-safe
    /// message instead of failing the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VerifyError::InputValidation(_) | VerifyError::DomainParseFailure(_)
        )
    }
}
