//! Lists the first page of templates and bounces for the configured server.
//!
//! Reads `POSTMARK_SERVER_TOKEN` (and optionally `POSTMARK_BASE_URL`,
//! `POSTMARK_TIMEOUT_SECS`) from the environment or a `.env` file. Point
//! `POSTMARK_BASE_URL` at a running `mock-server` to try it locally.

use anyhow::Context;
use postmark_core::{ClientConfig, PostmarkClient};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const PAGE_SIZE: u32 = 20;

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run() {
        tracing::error!("demo failed: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = ClientConfig::from_env().context("loading configuration")?;
    tracing::info!(base_url = %config.base_url, "configuration loaded");
    let client = PostmarkClient::new(&config);

    let templates = client
        .list_templates(0, PAGE_SIZE)
        .context("listing templates")?;
    println!("{} template(s) in total", templates.total_count);
    for template in &templates.templates {
        println!(
            "Template ID: {}, Name: {}, Subject: {}, Active: {}",
            template.template_id, template.name, template.subject, template.active
        );
    }

    let bounces = client.list_bounces(0, PAGE_SIZE).context("listing bounces")?;
    println!("{} bounce(s) in total", bounces.total_count);
    for bounce in &bounces.bounces {
        println!(
            "Bounce ID: {}, Type: {}, Email: {}, At: {}, Can activate: {}",
            bounce.id, bounce.kind, bounce.email, bounce.bounced_at, bounce.can_activate
        );
    }
    Ok(())
}
