//! Lattice Checkout CLI

use std::{
    io::{self, Write},
    process,
};

use anyhow::{Context, bail};
use tracing::info;

use lattice_checkout::{
    config::CheckoutConfig, fixtures::Fixture, observability::init_subscriber, receipt::Receipt,
};

fn main() -> anyhow::Result<()> {
    // Load configuration from .env and CLI arguments
    let config = CheckoutConfig::load().unwrap_or_else(|e| e.exit());

    if let Err(error) = init_subscriber(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging failed to initialize, must use eprintln"
        )]
        {
            eprintln!("Logging error: {error}");
        }

        process::exit(1);
    }

    let pricing = config
        .pricing
        .pricing_config()
        .context("invalid checkout charges")?;

    let fixture = Fixture::with_base_path(&config.fixtures_dir);
    let mut session = fixture
        .session(&config.fixture)
        .with_context(|| format!("failed to load fixture set '{}'", config.fixture))?;

    let cart_currency = session.cart().currency();

    if cart_currency != pricing.shipping().currency() {
        bail!(
            "cart is priced in {} but checkout charges are in {}",
            cart_currency.iso_alpha_code,
            pricing.shipping().currency().iso_alpha_code
        );
    }

    info!(
        fixture = %config.fixture,
        items = session.cart().len(),
        discounts_available = session.discount_entry_enabled(),
        "loaded checkout"
    );

    if let Some(code) = config.code.as_deref() {
        session.apply(code);

        if config.remove {
            session.remove();
        }
    }

    let receipt = Receipt::new(&session, &pricing)?;
    let mut out = io::stdout().lock();

    receipt.write_to(&mut out)?;

    for notice in session.take_notices() {
        writeln!(out, "{notice}")?;
    }

    Ok(())
}
