//! Registrable-domain matching between an email address and a website URL.
//!
//! The match is an exact, case-normalized string comparison of the two
//! registrable domains. Subdomain depth, ports, and paths never influence
//! the outcome; there is no subdomain-distance scoring.

use url::Url;

use crate::config::SUPPORTED_WEBSITE_SCHEMES;
use crate::error_handling::VerifyError;
use crate::normalize::remove_all_whitespace;
use crate::suffix::{ResolvedDomain, SuffixResolver};

/// The resolved domains of a validated email/website pair.
#[derive(Debug, Clone)]
pub struct DomainPair {
    /// Registrable domain of the email address host.
    pub email_domain: ResolvedDomain,
    /// Registrable domain of the website URL host.
    pub website_domain: ResolvedDomain,
}

impl DomainPair {
    /// True iff both registrable domains are exactly equal.
    pub fn is_match(&self) -> bool {
        self.email_domain.registrable_domain == self.website_domain.registrable_domain
    }
}

/// Checks that a website address either has no scheme at all, or has exactly
/// one `://` separator with a supported scheme (`http`, `https`, `ftp`).
pub fn has_valid_website_scheme(website: &str) -> bool {
    if !website.contains("://") {
        return true;
    }
    if website.matches("://").count() > 1 {
        return false;
    }
    // Split is non-empty because the separator is present
    let scheme = website.split("://").next().unwrap_or_default();
    SUPPORTED_WEBSITE_SCHEMES.contains(&scheme)
}

/// Builds a parseable URL from a website address, prepending `https://`
/// when no scheme is present.
pub fn build_website_url(website: &str) -> Result<Url, VerifyError> {
    let with_scheme = if website.contains("://") {
        website.to_string()
    } else {
        format!("https://{website}")
    };
    Url::parse(&with_scheme)
        .map_err(|e| VerifyError::InputValidation(format!("website address does not parse: {e}")))
}

/// Normalizes an email/website pair and resolves both to registrable
/// domains.
///
/// Returns `InputValidation` for empty inputs, a missing or hostless email,
/// an unsupported or duplicated website scheme, or an unparseable website
/// URL. Resolver failures (bare TLD, unknown suffix, IP literal, trailing
/// dot) propagate as `DomainParseFailure`.
pub fn match_domains(
    resolver: &SuffixResolver,
    email: &str,
    website: &str,
) -> Result<DomainPair, VerifyError> {
    // Trim, lowercase, strip whitespace. Deliberately no punctuation
    // trimming here: a trailing dot on a host must be rejected downstream,
    // not silently stripped.
    let email = remove_all_whitespace(&email.trim().to_lowercase());
    let website = remove_all_whitespace(&website.trim().to_lowercase());

    if email.is_empty() {
        return Err(VerifyError::InputValidation("empty email address".into()));
    }
    if website.is_empty() {
        return Err(VerifyError::InputValidation("empty website address".into()));
    }

    let email_host = match email.rsplit_once('@') {
        Some((_, host)) if !host.is_empty() => host,
        _ => {
            return Err(VerifyError::InputValidation(
                "email address has no host part".into(),
            ))
        }
    };

    if !has_valid_website_scheme(&website) {
        return Err(VerifyError::InputValidation(
            "unsupported or duplicated website scheme".into(),
        ));
    }
    let website_url = build_website_url(&website)?;
    let website_host = match website_url.host() {
        Some(url::Host::Domain(host)) => host.to_string(),
        Some(_) => {
            // Ipv4/Ipv6 host: no registrable domain exists
            return Err(VerifyError::DomainParseFailure(
                "website host is an IP literal".into(),
            ));
        }
        None => {
            return Err(VerifyError::InputValidation(
                "website address has no host".into(),
            ))
        }
    };

    let email_domain = resolver.resolve(email_host)?;
    let website_domain = resolver.resolve(&website_host)?;

    Ok(DomainPair {
        email_domain,
        website_domain,
    })
}
