//! Cart
//!
//! The cart is owned by the storefront API; checkout only reads it. Cart payloads are
//! validated here, at the point they enter the crate.

use rust_decimal::Decimal;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    ids::{CategoryId, ProductId},
    items::CartLineItem,
    pricing::{PricingError, minor_units_from_decimal, total_price},
};

/// Errors related to cart ingestion or totals.
#[derive(Debug, Error)]
pub enum CartError {
    /// An item's currency differs from the cart currency (index, item currency, cart currency).
    #[error("Item {0} has currency {1}, but cart has currency {2}")]
    CurrencyMismatch(usize, &'static str, &'static str),

    /// A cart line failed validation (index, reason).
    #[error("Cart line {0} is invalid: {1}")]
    InvalidLine(usize, &'static str),

    /// Cart payload could not be parsed.
    #[error("Failed to parse cart payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// A cart line exactly as returned by the cart endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRecord {
    /// Product id
    pub product_id: ProductId,

    /// Product category, if any
    #[serde(default)]
    pub category_id: Option<CategoryId>,

    /// Unit price
    pub price: Decimal,

    /// Quantity
    pub quantity: u32,
}

/// A cart exactly as returned by the cart endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRecord {
    /// Cart lines
    pub cart_items: Vec<CartLineRecord>,

    /// Subtotal as reported by the API
    #[serde(default)]
    pub total_price: Option<Decimal>,
}

impl CartRecord {
    /// Parse a cart endpoint response body.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Json`] if the body is not a cart.
    pub fn from_json(body: &str) -> Result<Self, CartError> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Cart
#[derive(Debug, Clone)]
pub struct Cart<'a> {
    items: Vec<CartLineItem<'a>>,
    currency: &'a Currency,
}

impl<'a> Cart<'a> {
    /// Create a new, empty cart.
    pub fn new(currency: &'a Currency) -> Self {
        Cart {
            items: Vec::new(),
            currency,
        }
    }

    /// Create a new cart with the given items.
    ///
    /// Every line must be priced in `currency`, at a non-negative price, with a positive
    /// quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CurrencyMismatch`] or [`CartError::InvalidLine`] for the first
    /// line that fails.
    pub fn with_items(
        items: impl Into<Vec<CartLineItem<'a>>>,
        currency: &'a Currency,
    ) -> Result<Self, CartError> {
        let items = items.into();

        items.iter().enumerate().try_for_each(|(i, item)| {
            let item_currency = item.price().currency();

            if item_currency != currency {
                return Err(CartError::CurrencyMismatch(
                    i,
                    item_currency.iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            if item.price().is_negative() {
                return Err(CartError::InvalidLine(i, "price must not be negative"));
            }

            if item.quantity() == 0 {
                return Err(CartError::InvalidLine(i, "quantity must be positive"));
            }

            Ok(())
        })?;

        Ok(Cart { items, currency })
    }

    /// Validate a cart payload and price it in `currency`.
    ///
    /// Lines must have a non-negative price and a positive quantity. A reported
    /// `totalPrice` that disagrees with the line items is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidLine`] for the first line that fails validation.
    pub fn from_record(record: CartRecord, currency: &'a Currency) -> Result<Self, CartError> {
        let items = record
            .cart_items
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                let minor = minor_units_from_decimal(line.price, currency)
                    .ok_or(CartError::InvalidLine(i, "price out of range"))?;

                let price = Money::from_minor(minor, currency);

                Ok::<_, CartError>(match line.category_id {
                    Some(category) => {
                        CartLineItem::with_category(line.product_id, category, price, line.quantity)
                    }
                    None => CartLineItem::new(line.product_id, price, line.quantity),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cart = Self::with_items(items, currency)?;

        if let Some(reported) = record.total_price {
            let reported_total = minor_units_from_decimal(reported, currency)
                .map(|minor| Money::from_minor(minor, currency));
            let computed_total = cart.subtotal().ok();

            if reported_total != computed_total {
                warn!(
                    reported = %reported,
                    computed = ?computed_total,
                    "cart totalPrice disagrees with its line items; using line items"
                );
            }
        }

        Ok(cart)
    }

    /// Calculate the subtotal of the cart.
    ///
    /// # Errors
    ///
    /// Returns a `PricingError` if a line overflows or there was a currency mismatch.
    pub fn subtotal(&self) -> Result<Money<'a, Currency>, PricingError> {
        if self.is_empty() {
            return Ok(Money::from_minor(0, self.currency));
        }

        total_price(&self.items)
    }

    /// Get the cart lines.
    pub fn items(&self) -> &[CartLineItem<'a>] {
        &self.items
    }

    /// Iterate over the cart lines.
    pub fn iter(&self) -> impl Iterator<Item = &CartLineItem<'a>> {
        self.items.iter()
    }

    /// Get the number of lines in the cart.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the currency of the cart.
    pub fn currency(&self) -> &'a Currency {
        self.currency
    }
}
