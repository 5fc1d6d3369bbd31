//! Fixtures
//!
//! Named checkout scenarios stored as YAML. A set called `name` is made up of
//! `discounts/<name>.yml` (discount records as served by the discounts endpoint) and
//! `carts/<name>.yml` (cart lines with prices written as `"AMOUNT CURRENCY"`).

use std::{fs, path::PathBuf};

use rust_decimal::Decimal;
use rusty_money::{
    Money,
    iso::{Currency, EUR, GBP, USD},
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    cart::{Cart, CartError},
    catalog::FileDiscountSource,
    checkout::CheckoutSession,
    ids::{CategoryId, ProductId},
    items::CartLineItem,
    pricing::minor_units_from_decimal,
};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Unknown currency code
    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    /// Currency mismatch between cart lines
    #[error("Currency mismatch: expected {0}, found {1}")]
    CurrencyMismatch(String, String),

    /// Cart has no lines and no declared currency
    #[error("Cart fixture has no items and no currency")]
    NoCurrency,

    /// Cart creation error
    #[error("Failed to create cart: {0}")]
    Cart(#[from] CartError),
}

/// Cart fixture file
#[derive(Debug, Deserialize)]
pub struct CartFixture {
    /// Currency code, required only when `items` is empty
    #[serde(default)]
    pub currency: Option<String>,

    /// Cart lines
    #[serde(default)]
    pub items: Vec<CartLineFixture>,
}

/// Cart line fixture
#[derive(Debug, Deserialize)]
pub struct CartLineFixture {
    /// Product id
    pub product: String,

    /// Category id
    #[serde(default)]
    pub category: Option<String>,

    /// Unit price (e.g., "2.99 GBP")
    pub price: String,

    /// Quantity
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Fixture
#[derive(Debug, Clone)]
pub struct Fixture {
    /// Base path for fixture files
    base_path: PathBuf,
}

impl Fixture {
    /// Create a fixture loader with the default base path
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create a fixture loader with a custom base path
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Discount source reading `discounts/<name>.yml`
    pub fn discount_source(&self, name: &str) -> FileDiscountSource {
        FileDiscountSource::new(self.base_path.join("discounts").join(format!("{name}.yml")))
    }

    /// Load a cart from `carts/<name>.yml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a price is malformed, the
    /// lines are priced in more than one currency, or a line has a negative price or a zero
    /// quantity.
    pub fn load_cart(&self, name: &str) -> Result<Cart<'static>, FixtureError> {
        let file_path = self.base_path.join("carts").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: CartFixture = serde_norway::from_str(&contents)?;

        let mut currency = fixture.currency.as_deref().map(parse_currency).transpose()?;
        let mut items = Vec::with_capacity(fixture.items.len());

        for line in fixture.items {
            let price = parse_price(&line.price)?;
            let line_currency = price.currency();

            // Validate currency consistency
            if let Some(existing_currency) = currency {
                if existing_currency != line_currency {
                    return Err(FixtureError::CurrencyMismatch(
                        existing_currency.iso_alpha_code.to_string(),
                        line_currency.iso_alpha_code.to_string(),
                    ));
                }
            } else {
                currency = Some(line_currency);
            }

            let product = ProductId::from(line.product);

            items.push(match line.category {
                Some(category) => CartLineItem::with_category(
                    product,
                    CategoryId::from(category),
                    price,
                    line.quantity,
                ),
                None => CartLineItem::new(product, price, line.quantity),
            });
        }

        let currency = currency.ok_or(FixtureError::NoCurrency)?;

        Ok(Cart::with_items(items, currency)?)
    }

    /// Start a checkout session for the fixture set `name`.
    ///
    /// A missing or malformed discounts file leaves the session without a catalog, just as
    /// a failed fetch would.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be loaded.
    pub fn session(&self, name: &str) -> Result<CheckoutSession<'static>, FixtureError> {
        let cart = self.load_cart(name)?;

        Ok(CheckoutSession::start(&self.discount_source(name), cart))
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a supported ISO currency code
///
/// # Errors
///
/// Returns [`FixtureError::UnknownCurrency`] for anything other than GBP, USD or EUR.
pub fn parse_currency(code: &str) -> Result<&'static Currency, FixtureError> {
    match code.trim() {
        "GBP" => Ok(GBP),
        "USD" => Ok(USD),
        "EUR" => Ok(EUR),
        other => Err(FixtureError::UnknownCurrency(other.to_string())),
    }
}

/// Parse a fixture price such as `"2.99 GBP"`.
///
/// The amount is converted to the currency's minor units, rounding half away from zero as
/// cart payloads are.
///
/// # Errors
///
/// Returns [`FixtureError::InvalidPrice`] if the value is not `AMOUNT CURRENCY` or the
/// amount does not fit, and [`FixtureError::UnknownCurrency`] for an unsupported code.
pub fn parse_price(s: &str) -> Result<Money<'static, Currency>, FixtureError> {
    let invalid = || FixtureError::InvalidPrice(s.to_string());

    let (amount, currency_code) = s.trim().split_once(char::is_whitespace).ok_or_else(invalid)?;

    let amount = amount.parse::<Decimal>().map_err(|_err| invalid())?;
    let currency = parse_currency(currency_code)?;

    let minor_units = minor_units_from_decimal(amount, currency).ok_or_else(invalid)?;

    Ok(Money::from_minor(minor_units, currency))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use testresult::TestResult;

    use super::*;

    fn write(dir: &TempDir, relative: &str, contents: &str) -> std::io::Result<()> {
        let path = dir.path().join(relative);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;

        Ok(())
    }

    #[test]
    fn parse_price_rejects_invalid_format() {
        let result = parse_price("2.99GBP");

        assert!(matches!(result, Err(FixtureError::InvalidPrice(_))));
    }

    #[test]
    fn parse_price_rejects_unknown_currency() {
        let result = parse_price("2.99 ABC");

        assert!(matches!(result, Err(FixtureError::UnknownCurrency(code)) if code == "ABC"));
    }

    #[test]
    fn parse_price_accepts_usd_and_eur() -> Result<(), FixtureError> {
        assert_eq!(parse_price("1.00 USD")?, Money::from_minor(100, USD));
        assert_eq!(parse_price(" 2.50 EUR ")?, Money::from_minor(250, EUR));

        Ok(())
    }

    #[test]
    fn parse_price_rounds_half_away_from_zero() -> Result<(), FixtureError> {
        assert_eq!(parse_price("0.005 GBP")?, Money::from_minor(1, GBP));
        assert_eq!(parse_price("0.015 GBP")?, Money::from_minor(2, GBP));

        Ok(())
    }

    #[test]
    fn load_cart_reads_lines() -> TestResult {
        let dir = TempDir::new()?;

        write(
            &dir,
            "carts/basic.yml",
            "items:\n  - product: P1\n    category: C1\n    price: \"100.00 GBP\"\n    quantity: 2\n  - product: P2\n    price: \"5.00 GBP\"\n",
        )?;

        let cart = Fixture::with_base_path(dir.path()).load_cart("basic")?;

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.currency(), GBP);
        assert_eq!(cart.subtotal()?, Money::from_minor(20_500, GBP));

        Ok(())
    }

    #[test]
    fn load_cart_rejects_negative_price_and_zero_quantity() -> TestResult {
        let dir = TempDir::new()?;

        write(
            &dir,
            "carts/negative.yml",
            "items:\n  - product: P1\n    price: \"-3.00 GBP\"\n",
        )?;
        write(
            &dir,
            "carts/zero.yml",
            "items:\n  - product: P1\n    price: \"3.00 GBP\"\n    quantity: 0\n",
        )?;

        let fixture = Fixture::with_base_path(dir.path());

        assert!(matches!(
            fixture.load_cart("negative"),
            Err(FixtureError::Cart(CartError::InvalidLine(0, _)))
        ));
        assert!(matches!(
            fixture.load_cart("zero"),
            Err(FixtureError::Cart(CartError::InvalidLine(0, _)))
        ));

        Ok(())
    }

    #[test]
    fn load_cart_rejects_mixed_currencies() -> TestResult {
        let dir = TempDir::new()?;

        write(
            &dir,
            "carts/mixed.yml",
            "items:\n  - product: P1\n    price: \"1.00 GBP\"\n  - product: P2\n    price: \"1.00 USD\"\n",
        )?;

        let result = Fixture::with_base_path(dir.path()).load_cart("mixed");

        assert!(matches!(result, Err(FixtureError::CurrencyMismatch(_, _))));

        Ok(())
    }

    #[test]
    fn load_empty_cart_needs_currency() -> TestResult {
        let dir = TempDir::new()?;

        write(&dir, "carts/empty.yml", "items: []\n")?;
        write(&dir, "carts/empty-gbp.yml", "currency: GBP\nitems: []\n")?;

        let fixture = Fixture::with_base_path(dir.path());

        assert!(matches!(
            fixture.load_cart("empty"),
            Err(FixtureError::NoCurrency)
        ));
        assert!(fixture.load_cart("empty-gbp")?.is_empty());

        Ok(())
    }

    #[test]
    fn session_without_discounts_file_disables_entry() -> TestResult {
        let dir = TempDir::new()?;

        write(
            &dir,
            "carts/nodiscounts.yml",
            "items:\n  - product: P1\n    price: \"1.00 GBP\"\n",
        )?;

        let session = Fixture::with_base_path(dir.path()).session("nodiscounts")?;

        assert!(!session.discount_entry_enabled());

        Ok(())
    }
}
