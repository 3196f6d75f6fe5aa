//! formguard demo
//!
//! Runs one submission of a sign-up form against an in-memory session store
//! and prints the resulting error report as JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use formguard::{
    CsrfConfig, CsrfTokenManager, FieldDescriptor, FieldsMatch, FormSchema, MemorySessionStore,
    Payload, Validator,
};

/// Submit a URL-encoded payload to the demo sign-up form.
#[derive(Debug, Parser)]
#[command(name = "formguard", version)]
struct Cli {
    /// Form payload, e.g. `username=alice&email=a%40b.com`.
    #[arg(long, default_value = "")]
    payload: String,

    /// Session identifier the CSRF token is bound to.
    #[arg(long, default_value = "demo-session")]
    session: String,

    /// Issue a token for the session and add it to the payload before submitting.
    #[arg(long)]
    with_token: bool,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = CsrfConfig::from_env().context("failed to load CSRF configuration")?;
    info!(
        lifetime_secs = config.token_lifetime.as_secs(),
        single_use = config.single_use,
        "configuration loaded"
    );

    let csrf = CsrfTokenManager::new(Arc::new(MemorySessionStore::new()), config)
        .context("failed to create CSRF token manager")?;
    let schema = signup_schema().context("failed to build sign-up schema")?;

    let mut payload = Payload::from_urlencoded(&cli.payload);
    if cli.with_token {
        let mut page = schema.instantiate();
        let issued = page
            .issue_csrf_token(&csrf, &cli.session)
            .context("failed to issue CSRF token")?;
        payload.append(issued.name.clone(), issued.token.clone());
    }

    let mut form = schema.instantiate();
    let valid = form
        .submit(&payload, &csrf, &cli.session)
        .context("form submission failed")?;
    info!(form_id = %form.form_id(), build_id = %form.build_id(), valid, "submission processed");

    let values: BTreeMap<_, _> = form
        .fields()
        .iter()
        .map(|f| (f.name(), f.bound_value()))
        .collect();
    let report = serde_json::json!({
        "valid": valid,
        "values": values,
        "errors": form.errors(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn signup_schema() -> Result<Arc<FormSchema>> {
    let schema = FormSchema::builder("user_register_form")
        .field(
            "username",
            FieldDescriptor::trimmed_string()
                .label("Username")
                .validators([Validator::required(), Validator::length(3, 32)]),
        )
        .field(
            "email",
            FieldDescriptor::email()
                .label("Email")
                .validators([Validator::required(), Validator::email()]),
        )
        .field(
            "age",
            FieldDescriptor::integer_in(0, 150)
                .label("Age")
                .validators([Validator::Optional, Validator::number_range(13.0, 150.0)]),
        )
        .field(
            "password",
            FieldDescriptor::password()
                .label("Password")
                .validators([Validator::required(), Validator::min_length(8)]),
        )
        .field("confirm", FieldDescriptor::password().label("Confirm password"))
        .cross_field(FieldsMatch::new("password", "confirm").message("Passwords must match."))
        .build()?;
    Ok(schema)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
