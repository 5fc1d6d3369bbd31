//! Discount Catalog
//!
//! Discount definitions fetched from the storefront API once per checkout session. The
//! catalog is immutable once built; sessions only ever read from it.

use std::fmt;

use decimal_percentage::Percentage;
use jiff::Timestamp;
use rust_decimal::Decimal;
use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    ids::{CategoryId, DiscountId, ProductId},
    items::CartLineItem,
    pricing::minor_units_from_decimal,
};

pub mod matcher;
pub mod source;

pub use matcher::find_by_code;
pub use source::{DiscountSource, FileDiscountSource, StaticDiscountSource};

/// Errors raised while fetching or building a discount catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A discount record failed validation.
    #[error("invalid discount {code:?}: {reason}")]
    InvalidDiscount {
        /// Code of the offending discount.
        code: String,

        /// What was wrong with it.
        reason: &'static str,
    },

    /// The discount list could not be fetched: the file is missing, or a remote source
    /// could not be reached.
    #[error("discount list unavailable: {0}")]
    Unavailable(String),

    /// IO error reading a catalog file.
    #[error("failed to read discount catalog: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("failed to parse discount catalog YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// JSON parsing error.
    #[error("failed to parse discount catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Discount type as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// `discountValue` is in percentage points (0-100).
    Percentage,

    /// `discountValue` is an amount in the storefront currency.
    Fixed,
}

/// A discount exactly as returned by the discounts endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRecord {
    /// Opaque identifier
    pub id: DiscountId,

    /// Code customers type in
    pub code: String,

    /// Percentage or fixed amount
    pub discount_type: DiscountType,

    /// Percentage points or currency amount, depending on `discount_type`
    pub discount_value: Decimal,

    /// Start of the validity window
    #[serde(default)]
    pub starts_at: Option<Timestamp>,

    /// End of the validity window
    #[serde(default)]
    pub expires_at: Option<Timestamp>,

    /// Restrict to line items in this category
    #[serde(default)]
    pub category_id: Option<CategoryId>,

    /// Restrict to line items for this product
    #[serde(default)]
    pub product_id: Option<ProductId>,
}

/// How much a discount takes off.
#[derive(Debug, Clone, Copy)]
pub enum DiscountKind<'a> {
    /// Take a percentage off (e.g., "10% off")
    Percentage(Percentage),

    /// Take a fixed amount off (e.g., "£5 off")
    Fixed(Money<'a, Currency>),
}

/// Which line items a discount applies to.
///
/// A scope with neither a product nor a category applies to the whole cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscountScope {
    product: Option<ProductId>,
    category: Option<CategoryId>,
}

impl DiscountScope {
    /// Scope covering the whole cart.
    pub fn cart() -> Self {
        Self::default()
    }

    /// Scope covering a single product.
    pub fn product(product: impl Into<ProductId>) -> Self {
        Self {
            product: Some(product.into()),
            category: None,
        }
    }

    /// Scope covering every product in a category.
    pub fn category(category: impl Into<CategoryId>) -> Self {
        Self {
            product: None,
            category: Some(category.into()),
        }
    }

    /// Product restriction, if any
    pub fn product_id(&self) -> Option<&ProductId> {
        self.product.as_ref()
    }

    /// Category restriction, if any
    pub fn category_id(&self) -> Option<&CategoryId> {
        self.category.as_ref()
    }

    /// True when the discount is not restricted to a product or category.
    pub fn is_cart_wide(&self) -> bool {
        self.product.is_none() && self.category.is_none()
    }

    /// Does this scope cover the given line item?
    ///
    /// The product restriction is checked first; the category restriction is only consulted
    /// when there is no product restriction or the product does not match.
    pub fn matches(&self, item: &CartLineItem<'_>) -> bool {
        if self
            .product
            .as_ref()
            .is_some_and(|product| product == item.product())
        {
            return true;
        }

        self.category
            .as_ref()
            .is_some_and(|category| item.category() == Some(category))
    }
}

/// A validated discount definition.
#[derive(Debug, Clone)]
pub struct Discount<'a> {
    id: DiscountId,
    code: String,
    kind: DiscountKind<'a>,
    scope: DiscountScope,
    starts_at: Option<Timestamp>,
    expires_at: Option<Timestamp>,
}

impl<'a> Discount<'a> {
    /// Create a discount with no validity window.
    pub fn new(
        id: impl Into<DiscountId>,
        code: impl Into<String>,
        kind: DiscountKind<'a>,
        scope: DiscountScope,
    ) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
            kind,
            scope,
            starts_at: None,
            expires_at: None,
        }
    }

    /// Set the informational validity window.
    #[must_use]
    pub fn with_window(
        mut self,
        starts_at: Option<Timestamp>,
        expires_at: Option<Timestamp>,
    ) -> Self {
        self.starts_at = starts_at;
        self.expires_at = expires_at;
        self
    }

    /// Validate a wire record and convert amounts into `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidDiscount`] if the code is blank, a percentage lies outside
    /// 0-100, or a fixed amount is negative or unrepresentable.
    pub fn from_record(
        record: DiscountRecord,
        currency: &'a Currency,
    ) -> Result<Self, CatalogError> {
        let invalid = |reason| CatalogError::InvalidDiscount {
            code: record.code.clone(),
            reason,
        };

        if record.code.trim().is_empty() {
            return Err(invalid("code is blank"));
        }

        let kind = match record.discount_type {
            DiscountType::Percentage => {
                if record.discount_value < Decimal::ZERO
                    || record.discount_value > Decimal::ONE_HUNDRED
                {
                    return Err(invalid("percentage must be between 0 and 100"));
                }

                DiscountKind::Percentage(Percentage::from(
                    record.discount_value / Decimal::ONE_HUNDRED,
                ))
            }
            DiscountType::Fixed => {
                if record.discount_value.is_sign_negative() {
                    return Err(invalid("fixed amount must not be negative"));
                }

                let minor = minor_units_from_decimal(record.discount_value, currency)
                    .ok_or_else(|| invalid("fixed amount out of range"))?;

                DiscountKind::Fixed(Money::from_minor(minor, currency))
            }
        };

        // Product and category are mutually exclusive in practice, but both are kept so the
        // product-then-category matching order still holds if a record carries both.
        let scope = DiscountScope {
            product: record.product_id,
            category: record.category_id,
        };

        Ok(Self {
            id: record.id,
            code: record.code,
            kind,
            scope,
            starts_at: record.starts_at,
            expires_at: record.expires_at,
        })
    }

    /// Return the discount id
    pub fn id(&self) -> &DiscountId {
        &self.id
    }

    /// Return the discount code as defined in the catalog
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Return the discount kind
    pub fn kind(&self) -> &DiscountKind<'a> {
        &self.kind
    }

    /// Return the discount scope
    pub fn scope(&self) -> &DiscountScope {
        &self.scope
    }

    /// Start of the validity window
    pub fn starts_at(&self) -> Option<Timestamp> {
        self.starts_at
    }

    /// End of the validity window
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    /// Is `now` inside the validity window?
    ///
    /// Only used for display; applying a discount never checks it.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.starts_at.is_none_or(|start| start <= now)
            && self.expires_at.is_none_or(|end| now < end)
    }
}

impl fmt::Display for Discount<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiscountKind::Percentage(pct) => {
                write!(f, "{} ({}% off", self.code, percent_points(pct).normalize())?;
            }
            DiscountKind::Fixed(amount) => write!(f, "{} ({amount} off", self.code)?,
        }

        match (&self.scope.product, &self.scope.category) {
            (Some(product), _) => write!(f, " product {product})"),
            (None, Some(category)) => write!(f, " category {category})"),
            (None, None) => write!(f, " order)"),
        }
    }
}

/// Express a fractional percentage as percentage points (0.1 -> 10).
pub fn percent_points(percent: &Percentage) -> Decimal {
    (*percent) * Decimal::ONE_HUNDRED
}

/// An immutable, ordered list of discounts.
#[derive(Debug, Clone, Default)]
pub struct DiscountCatalog<'a> {
    discounts: Vec<Discount<'a>>,
}

impl<'a> DiscountCatalog<'a> {
    /// Build a catalog from already validated discounts.
    pub fn new(discounts: impl Into<Vec<Discount<'a>>>) -> Self {
        let discounts = discounts.into();

        warn_on_duplicate_codes(&discounts);

        Self { discounts }
    }

    /// Validate wire records and build a catalog in their original order.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogError::InvalidDiscount`] encountered.
    pub fn from_records(
        records: impl IntoIterator<Item = DiscountRecord>,
        currency: &'a Currency,
    ) -> Result<Self, CatalogError> {
        let discounts = records
            .into_iter()
            .map(|record| Discount::from_record(record, currency))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(discounts))
    }

    /// Find the discount whose code matches `code`, ignoring case and surrounding whitespace.
    pub fn find(&self, code: &str) -> Option<&Discount<'a>> {
        find_by_code(code, Some(self.discounts.as_slice()))
    }

    /// All discounts in catalog order
    pub fn discounts(&self) -> &[Discount<'a>] {
        &self.discounts
    }

    /// Number of discounts in the catalog
    pub fn len(&self) -> usize {
        self.discounts.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.discounts.is_empty()
    }
}

fn warn_on_duplicate_codes(discounts: &[Discount<'_>]) {
    let mut seen = FxHashSet::default();

    for discount in discounts {
        if !seen.insert(discount.code.to_lowercase()) {
            warn!(
                code = %discount.code,
                discount_id = %discount.id,
                "duplicate discount code in catalog; earlier entry wins"
            );
        }
    }
}
