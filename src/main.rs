//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `business_verify` library for checking
//! a business submission from the command line: it loads the public suffix
//! rules, seeds an in-memory store with the given account details, and runs
//! one verification request through the real state machine. Emails are
//! logged instead of sent.
//!
//! All core functionality is implemented in the library crate.

use std::path::Path;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;
use serde_json::json;

use business_verify::config::LogLevel;
use business_verify::{
    DocumentStore, LogMailer, MemoryStore, Settings, StaticIdentityProvider, SuffixResolver,
    VerificationService, GENERIC_FAILURE_MESSAGE,
};

#[derive(Debug, Parser)]
#[command(
    name = "business_verify",
    about = "Runs a business verification request for a single account submission."
)]
struct Opt {
    /// Account email address
    #[arg(long)]
    email: String,

    /// Claimed business website
    #[arg(long)]
    website: String,

    /// Claimed business display name
    #[arg(long)]
    name: String,

    /// Treat the account email as already verified
    #[arg(long, default_value_t = false)]
    email_verified: bool,

    /// Public suffix rule list: a local file path or a URL
    #[arg(long)]
    suffix_list: Option<String>,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> Result<()> {
    let opt = Opt::parse();

    env_logger::Builder::from_default_env()
        .filter_level(opt.log_level.clone().into())
        .init();

    let settings = Settings::default();

    let source = opt
        .suffix_list
        .clone()
        .unwrap_or_else(|| settings.suffix_list_url.clone());
    let resolver = if Path::new(&source).exists() {
        let text = std::fs::read_to_string(&source)
            .with_context(|| format!("Failed to read suffix list file {source}"))?;
        SuffixResolver::from_list_text(&text).context("Failed to parse suffix list file")?
    } else {
        SuffixResolver::from_url(&source)
            .await
            .context("Failed to load public suffix rules")?
    };

    let store = Arc::new(MemoryStore::new());
    let user_id = "cli-check";
    store
        .set(
            &business_verify::user_path(user_id),
            json!({
                "userId": user_id,
                "businessName": opt.name,
                "email": opt.email,
                "website": opt.website,
                "role": "business",
                "emailVerified": opt.email_verified,
            }),
        )
        .await
        .context("Failed to seed account record")?;

    let service = VerificationService::new(
        store,
        Arc::new(LogMailer),
        Arc::new(StaticIdentityProvider::new()),
        Arc::new(resolver),
        settings,
    );

    match service.request_verification(user_id).await {
        Ok(decision) => {
            if let Some(status) = decision.status {
                println!("status: {status}");
            }
            if let Some(score) = decision.fuzzy_score {
                println!("fuzzy score: {score}");
            }
            println!("{}", decision.message);
            Ok(())
        }
        Err(e) => {
            error!("Verification request failed: {e}");
            eprintln!("{GENERIC_FAILURE_MESSAGE}");
            process::exit(1);
        }
    }
}
