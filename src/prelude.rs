//! Lattice Checkout prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{Cart, CartError, CartLineRecord, CartRecord},
    catalog::{
        CatalogError, Discount, DiscountCatalog, DiscountKind, DiscountRecord, DiscountScope,
        DiscountSource, DiscountType, FileDiscountSource, StaticDiscountSource, find_by_code,
    },
    checkout::{
        AppliedDiscount, CheckoutIssue, CheckoutSession, Notice, NoticeLevel,
        submission::{
            CheckoutOutcome, CheckoutRequest, CheckoutResponse, CheckoutSelection, OrderGateway,
            PaymentError, PaymentGateway, PaymentMethod, SubmissionError, submit_checkout,
        },
    },
    discounts::{DiscountBreakdown, DiscountError, compute_discount_amount, discount_breakdown},
    fixtures::{Fixture, FixtureError},
    ids::{CategoryId, DiscountId, ProductId},
    items::CartLineItem,
    pricing::{OrderTotals, PricingConfig, PricingError, compute_totals},
    receipt::{Receipt, ReceiptError},
};
