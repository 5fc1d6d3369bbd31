//! Items

use rusty_money::{Money, iso::Currency};

use crate::ids::{CategoryId, ProductId};

/// A single cart line: one product at a unit price, bought `quantity` times.
#[derive(Clone, Debug, PartialEq)]
pub struct CartLineItem<'a> {
    product: ProductId,
    category: Option<CategoryId>,
    price: Money<'a, Currency>,
    quantity: u32,
}

impl<'a> CartLineItem<'a> {
    /// Creates a new line item without a category.
    pub fn new(product: impl Into<ProductId>, price: Money<'a, Currency>, quantity: u32) -> Self {
        Self {
            product: product.into(),
            category: None,
            price,
            quantity,
        }
    }

    /// Creates a new line item for a product in a category.
    pub fn with_category(
        product: impl Into<ProductId>,
        category: impl Into<CategoryId>,
        price: Money<'a, Currency>,
        quantity: u32,
    ) -> Self {
        Self {
            product: product.into(),
            category: Some(category.into()),
            price,
            quantity,
        }
    }

    /// Returns the product id
    pub fn product(&self) -> &ProductId {
        &self.product
    }

    /// Returns the category id, if the product has one
    pub fn category(&self) -> Option<&CategoryId> {
        self.category.as_ref()
    }

    /// Returns the unit price
    pub fn price(&self) -> &Money<'a, Currency> {
        &self.price
    }

    /// Returns the quantity
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price multiplied by quantity, in minor units.
    ///
    /// Returns `None` if the multiplication overflows.
    pub fn subtotal_minor(&self) -> Option<i64> {
        self.price
            .to_minor_units()
            .checked_mul(i64::from(self.quantity))
    }
}
