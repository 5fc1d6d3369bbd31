//! Command line configuration

use std::path::PathBuf;

use clap::{Args, Parser};
use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use thiserror::Error;

use crate::{
    fixtures::{FixtureError, parse_currency},
    pricing::{PricingConfig, minor_units_from_decimal},
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Currency is not supported
    #[error(transparent)]
    Currency(#[from] FixtureError),

    /// Amount does not fit the currency's minor units
    #[error("invalid {0} amount: {1}")]
    Amount(&'static str, Decimal),
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Checkout charges.
#[derive(Debug, Args)]
pub struct PricingArgs {
    /// Currency of the checkout charges
    #[arg(long, env = "CHECKOUT_CURRENCY", default_value = "GBP")]
    pub currency: String,

    /// Shipping charge
    #[arg(long, env = "CHECKOUT_SHIPPING", default_value = "0.00")]
    pub shipping: Decimal,

    /// Taxes charge
    #[arg(long, env = "CHECKOUT_TAXES", default_value = "0.20")]
    pub taxes: Decimal,
}

impl PricingArgs {
    /// Currency named by `--currency`
    ///
    /// # Errors
    ///
    /// Returns an error if the currency is not supported.
    pub fn currency(&self) -> Result<&'static Currency, ConfigError> {
        Ok(parse_currency(&self.currency)?)
    }

    /// Build the checkout charges.
    ///
    /// # Errors
    ///
    /// Returns an error if the currency is not supported or an amount is negative or out
    /// of range.
    pub fn pricing_config(&self) -> Result<PricingConfig<'static>, ConfigError> {
        let currency = self.currency()?;

        Ok(PricingConfig::new(
            charge("shipping", self.shipping, currency)?,
            charge("taxes", self.taxes, currency)?,
        ))
    }
}

fn charge(
    name: &'static str,
    amount: Decimal,
    currency: &'static Currency,
) -> Result<Money<'static, Currency>, ConfigError> {
    if amount.is_sign_negative() {
        return Err(ConfigError::Amount(name, amount));
    }

    minor_units_from_decimal(amount, currency)
        .map(|minor| Money::from_minor(minor, currency))
        .ok_or(ConfigError::Amount(name, amount))
}

/// Checkout CLI configuration
#[derive(Debug, Parser)]
#[command(
    name = "lattice-checkout",
    about = "Apply a discount code to a fixture cart and print the order summary",
    long_about = None
)]
pub struct CheckoutConfig {
    /// Fixture set to load
    #[arg(short, long, default_value = "storefront")]
    pub fixture: String,

    /// Directory holding the `discounts/` and `carts/` fixtures
    #[arg(long, default_value = "./fixtures")]
    pub fixtures_dir: PathBuf,

    /// Discount code to apply
    #[arg(short, long)]
    pub code: Option<String>,

    /// Remove the discount again after applying it
    #[arg(long, requires = "code")]
    pub remove: bool,

    /// Checkout charges.
    #[command(flatten)]
    pub pricing: PricingArgs,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,
}

impl CheckoutConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}
