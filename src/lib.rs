//! Lattice Checkout
//!
//! Discount code handling for a storefront checkout: matching codes against a fetched
//! catalog, calculating the amount they take off a cart, and producing the order totals
//! and notices the checkout page shows.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod discounts;
pub mod fixtures;
pub mod ids;
pub mod items;
pub mod observability;
pub mod prelude;
pub mod pricing;
pub mod receipt;
