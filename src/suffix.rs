//! Public-suffix resolution.
//!
//! Wraps a [`publicsuffix::List`] loaded from the downloadable rule list and
//! answers the one question the matcher needs: what is the registrable
//! domain (eTLD+1) of a hostname, and which part of it is the label left of
//! the public suffix?
//!
//! The rule table is read-only after load and safe for unlimited concurrent
//! readers; [`SuffixResolver::refresh`] swaps in a new table without
//! restarting the process. A failed refresh keeps serving the stale table.

use std::net::IpAddr;
use std::sync::RwLock;

use log::{info, warn};
use publicsuffix::{List, Psl};
use thiserror::Error;

use crate::config::SUFFIX_LIST_FETCH_TIMEOUT;
use crate::error_handling::VerifyError;

/// Errors loading or refreshing the public suffix rule list.
#[derive(Error, Debug)]
pub enum SuffixListError {
    /// The HTTP fetch of the rule list failed.
    #[error("failed to fetch public suffix list: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The downloaded text is not a valid rule list.
    #[error("failed to parse public suffix list: {0}")]
    Parse(String),
}

/// A hostname resolved against the public suffix rules.
///
/// Invariants: `suffix` is non-empty, `label` is non-empty, and
/// `registrable_domain == label + "." + suffix` (never a bare suffix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDomain {
    /// The public suffix plus exactly one label, e.g. `example.co.za`.
    pub registrable_domain: String,
    /// The public suffix, e.g. `co.za`.
    pub suffix: String,
    /// The label immediately left of the suffix, e.g. `example`.
    pub label: String,
}

/// Resolver over a loaded public suffix rule table.
pub struct SuffixResolver {
    rules: RwLock<List>,
}

impl SuffixResolver {
    /// Builds a resolver from raw rule list text (the format served at
    /// publicsuffix.org).
    pub fn from_list_text(text: &str) -> Result<Self, SuffixListError> {
        let list: List = text
            .parse()
            .map_err(|e| SuffixListError::Parse(format!("{e}")))?;
        Ok(SuffixResolver {
            rules: RwLock::new(list),
        })
    }

    /// Downloads the rule list and builds a resolver from it.
    ///
    /// Startup should fail hard if this returns an error: serving with no
    /// rule table at all is worse than not serving.
    pub async fn from_url(url: &str) -> Result<Self, SuffixListError> {
        let text = fetch_list_text(url).await?;
        let resolver = Self::from_list_text(&text)?;
        info!("Loaded public suffix rules from {url}");
        Ok(resolver)
    }

    /// Re-downloads the rule list and swaps the rule table in place.
    ///
    /// On failure the existing (stale but present) table keeps serving.
    pub async fn refresh(&self, url: &str) -> Result<(), SuffixListError> {
        let text = match fetch_list_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Public suffix list refresh failed, keeping stale rules: {e}");
                return Err(e);
            }
        };
        let list: List = text
            .parse()
            .map_err(|e| SuffixListError::Parse(format!("{e}")))?;
        let mut rules = self
            .rules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *rules = list;
        info!("Public suffix rules refreshed from {url}");
        Ok(())
    }

    /// Resolves a hostname to its registrable domain, public suffix, and the
    /// label left of the suffix.
    ///
    /// Fails with `DomainParseFailure` when the hostname is an IP literal,
    /// carries a trailing dot, has no label beyond the recognized public
    /// suffix (bare TLD), or matches no known rule.
    pub fn resolve(&self, hostname: &str) -> Result<ResolvedDomain, VerifyError> {
        let host = hostname.trim().to_lowercase();
        if host.is_empty() {
            return Err(VerifyError::DomainParseFailure("empty hostname".into()));
        }
        if host.ends_with('.') {
            return Err(VerifyError::DomainParseFailure(format!(
                "trailing dot on hostname: {host}"
            )));
        }
        // IP literals have no registrable domain
        if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
            return Err(VerifyError::DomainParseFailure(format!(
                "IP-literal host: {host}"
            )));
        }

        let rules = self
            .rules
            .read()
            .map_err(|_| VerifyError::ExternalService("suffix rule table lock poisoned".into()))?;

        let domain = rules.domain(host.as_bytes()).ok_or_else(|| {
            VerifyError::DomainParseFailure(format!("no registrable domain in: {host}"))
        })?;
        let suffix = domain.suffix();
        if !suffix.is_known() {
            return Err(VerifyError::DomainParseFailure(format!(
                "top level domain not recognized: {host}"
            )));
        }

        let registrable_domain = String::from_utf8_lossy(domain.as_bytes()).to_string();
        let suffix = String::from_utf8_lossy(suffix.as_bytes()).to_string();
        let label = registrable_domain
            .strip_suffix(&suffix)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or_default()
            .to_string();
        if suffix.is_empty() || label.is_empty() || registrable_domain == suffix {
            return Err(VerifyError::DomainParseFailure(format!(
                "bare public suffix: {host}"
            )));
        }

        Ok(ResolvedDomain {
            registrable_domain,
            suffix,
            label,
        })
    }
}

async fn fetch_list_text(url: &str) -> Result<String, SuffixListError> {
    let client = reqwest::Client::builder()
        .timeout(SUFFIX_LIST_FETCH_TIMEOUT)
        .build()?;
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}
