//! Pricing
//!
//! Line totals and the final order totals shown at checkout.

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rusty_money::{Money, MoneyError, iso::Currency};
use thiserror::Error;
use tracing::debug;

use crate::items::CartLineItem;

/// Errors that can occur while calculating prices.
#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// No items were provided, so currency could not be determined.
    #[error("no items provided; cannot determine currency")]
    NoItems,

    /// A line or order total does not fit in minor units.
    #[error("price overflowed while calculating totals")]
    Overflow,

    /// Wrapped money arithmetic or currency mismatch error.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Convert a decimal amount (e.g. `12.34`) into minor units of `currency`.
///
/// Rounds half away from zero to the currency's exponent. Returns `None` if the result does
/// not fit in an `i64`.
pub fn minor_units_from_decimal(amount: Decimal, currency: &Currency) -> Option<i64> {
    let scale = 10_i64.checked_pow(currency.exponent)?;

    amount
        .checked_mul(Decimal::from(scale))?
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Calculates the sum of `price * quantity` over a list of line items.
///
/// # Errors
///
/// - [`PricingError::NoItems`]: No items were provided, so currency could not be determined.
/// - [`PricingError::Overflow`]: A line subtotal does not fit in minor units.
/// - [`PricingError::Money`]: Wrapped money arithmetic or currency mismatch error.
pub fn total_price<'a>(
    items: &[CartLineItem<'a>],
) -> Result<Money<'a, Currency>, PricingError> {
    let first = items.first().ok_or(PricingError::NoItems)?;

    items.iter().try_fold(
        Money::from_minor(0, first.price().currency()),
        |acc, item| {
            let line = item.subtotal_minor().ok_or(PricingError::Overflow)?;

            Ok(acc.add(Money::from_minor(line, item.price().currency()))?)
        },
    )
}

/// Fixed checkout charges applied on top of the cart subtotal.
///
/// Taxes are a configured amount, not computed from rates.
#[derive(Debug, Clone, Copy)]
pub struct PricingConfig<'a> {
    shipping: Money<'a, Currency>,
    taxes: Money<'a, Currency>,
}

impl<'a> PricingConfig<'a> {
    /// Create a pricing config.
    pub fn new(shipping: Money<'a, Currency>, taxes: Money<'a, Currency>) -> Self {
        Self { shipping, taxes }
    }

    /// No shipping charge, fixed taxes.
    pub fn free_shipping(taxes: Money<'a, Currency>) -> Self {
        Self {
            shipping: Money::from_minor(0, taxes.currency()),
            taxes,
        }
    }

    /// Shipping charge
    pub fn shipping(&self) -> Money<'a, Currency> {
        self.shipping
    }

    /// Taxes charge
    pub fn taxes(&self) -> Money<'a, Currency> {
        self.taxes
    }
}

/// Order totals derived from the cart, checkout charges and the applied discount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals<'a> {
    /// Cart subtotal before charges and discounts
    pub subtotal: Money<'a, Currency>,

    /// Shipping charge
    pub shipping: Money<'a, Currency>,

    /// Taxes charge
    pub taxes: Money<'a, Currency>,

    /// Discount taken off the order
    pub discount_amount: Money<'a, Currency>,

    /// Amount payable, never below zero
    pub total: Money<'a, Currency>,
}

/// Combine subtotal, shipping, taxes and discount into order totals.
///
/// `total = subtotal + shipping + taxes - discount_amount`, floored at zero. The requested
/// `discount_amount` is kept as given even when the floor kicks in.
///
/// # Errors
///
/// Returns [`PricingError::Money`] if the amounts are in different currencies.
pub fn compute_totals<'a>(
    subtotal: Money<'a, Currency>,
    shipping: Money<'a, Currency>,
    taxes: Money<'a, Currency>,
    discount_amount: Money<'a, Currency>,
) -> Result<OrderTotals<'a>, PricingError> {
    let gross = subtotal.add(shipping)?.add(taxes)?;
    let net = gross.sub(discount_amount)?;

    let total = if net.is_negative() {
        debug!(
            gross_minor = gross.to_minor_units(),
            discount_minor = discount_amount.to_minor_units(),
            "discount exceeds order value; total floored at zero"
        );

        Money::from_minor(0, subtotal.currency())
    } else {
        net
    };

    Ok(OrderTotals {
        subtotal,
        shipping,
        taxes,
        discount_amount,
        total,
    })
}
