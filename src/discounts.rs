//! Discounts
//!
//! Works out how much an applied discount takes off a cart. Scoped discounts are summed
//! over the lines they cover; a discount without a product or category scope is taken off
//! the cart subtotal once.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{Money, iso::Currency};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    cart::Cart,
    catalog::{Discount, DiscountKind},
    pricing::PricingError,
};

/// Errors specific to discount calculations.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// A line subtotal or the summed discount does not fit in minor units.
    #[error("discount amount overflowed")]
    Overflow,

    /// A fixed discount is priced in a different currency from the cart (discount, cart).
    #[error("discount is in {0}, but cart is in {1}")]
    CurrencyMismatch(&'static str, &'static str),

    /// Errors bubbled up from cart subtotal calculation.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Amount taken off a single cart line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDiscount<'a> {
    /// Index of the line in the cart
    pub line_idx: usize,

    /// Price times quantity for the line
    pub line_subtotal: Money<'a, Currency>,

    /// Amount taken off the line
    pub amount: Money<'a, Currency>,
}

/// How a discount amount was arrived at.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountBreakdown<'a> {
    lines: SmallVec<[LineDiscount<'a>; 8]>,
    total: Money<'a, Currency>,
    cart_wide: bool,
}

impl<'a> DiscountBreakdown<'a> {
    fn nothing(currency: &'a Currency) -> Self {
        Self {
            lines: SmallVec::new(),
            total: Money::from_minor(0, currency),
            cart_wide: false,
        }
    }

    /// Per-line contributions. Empty for cart-wide discounts.
    pub fn lines(&self) -> &[LineDiscount<'a>] {
        &self.lines
    }

    /// Total amount taken off the cart
    pub fn total(&self) -> Money<'a, Currency> {
        self.total
    }

    /// Whether the amount was taken off the cart subtotal rather than individual lines
    pub fn is_cart_wide(&self) -> bool {
        self.cart_wide
    }

    /// Amount taken off the line at `line_idx`, if the discount covered it.
    pub fn for_line(&self, line_idx: usize) -> Option<Money<'a, Currency>> {
        self.lines
            .iter()
            .find(|line| line.line_idx == line_idx)
            .map(|line| line.amount)
    }
}

/// Calculates the amount `discount` takes off `cart`.
///
/// # Errors
///
/// See [`discount_breakdown`].
pub fn compute_discount_amount<'a>(
    discount: &Discount<'a>,
    cart: &Cart<'a>,
) -> Result<Money<'a, Currency>, DiscountError> {
    Ok(discount_breakdown(discount, cart)?.total())
}

/// Calculates the amount `discount` takes off `cart`, line by line.
///
/// An empty cart gets nothing. A scoped discount is applied to each line its scope covers
/// and the contributions are summed; a fixed amount is granted per covered line, capped at
/// that line's subtotal. An unscoped discount is applied once to the cart subtotal, with a
/// fixed amount capped at the subtotal.
///
/// # Errors
///
/// Returns an error if:
/// - a percentage calculation cannot be safely represented in minor units
///   (`DiscountError::PercentConversion`).
/// - a line subtotal or the summed amount overflows (`DiscountError::Overflow`).
/// - a fixed amount is in a different currency from the cart (`DiscountError::CurrencyMismatch`).
pub fn discount_breakdown<'a>(
    discount: &Discount<'a>,
    cart: &Cart<'a>,
) -> Result<DiscountBreakdown<'a>, DiscountError> {
    let currency = cart.currency();

    if cart.is_empty() {
        return Ok(DiscountBreakdown::nothing(currency));
    }

    if discount.scope().is_cart_wide() {
        let subtotal = cart.subtotal()?.to_minor_units();
        let amount = amount_off(discount.kind(), subtotal, currency)?;

        return Ok(DiscountBreakdown {
            lines: SmallVec::new(),
            total: Money::from_minor(amount, currency),
            cart_wide: true,
        });
    }

    let mut breakdown = DiscountBreakdown::nothing(currency);
    let mut total_minor = 0_i64;

    for (line_idx, item) in cart.iter().enumerate() {
        if !discount.scope().matches(item) {
            continue;
        }

        let line_minor = item.subtotal_minor().ok_or(DiscountError::Overflow)?;
        let amount = amount_off(discount.kind(), line_minor, currency)?;

        total_minor = total_minor
            .checked_add(amount)
            .ok_or(DiscountError::Overflow)?;

        breakdown.lines.push(LineDiscount {
            line_idx,
            line_subtotal: Money::from_minor(line_minor, currency),
            amount: Money::from_minor(amount, currency),
        });
    }

    breakdown.total = Money::from_minor(total_minor, currency);

    Ok(breakdown)
}

/// Amount, in minor units, that `kind` takes off `subtotal_minor`.
fn amount_off(
    kind: &DiscountKind<'_>,
    subtotal_minor: i64,
    currency: &Currency,
) -> Result<i64, DiscountError> {
    match kind {
        DiscountKind::Percentage(percent) => percent_of_minor(percent, subtotal_minor),
        DiscountKind::Fixed(amount) => {
            if amount.currency() != currency {
                return Err(DiscountError::CurrencyMismatch(
                    amount.currency().iso_alpha_code,
                    currency.iso_alpha_code,
                ));
            }

            Ok(amount.to_minor_units().min(subtotal_minor))
        }
    }
}

/// Calculate the discount amount in minor units based on a percentage and a minor unit amount.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] if the calculation overflows or cannot be
/// safely represented.
pub fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, DiscountError> {
    let minor = Decimal::from_i64(minor).ok_or(DiscountError::PercentConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage crate doesn't actually expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(DiscountError::PercentConversion)
}
