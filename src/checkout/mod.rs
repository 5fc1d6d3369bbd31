//! Checkout Session
//!
//! Holds the discount state for one checkout. At most one discount is applied at a time;
//! applying another replaces it outright. All state changes go through [`CheckoutSession::apply`],
//! [`CheckoutSession::remove`], [`CheckoutSession::set_code`] and
//! [`CheckoutSession::replace_cart`], and each reports what happened as a [`Notice`].

use std::mem;

use rusty_money::{Money, iso::Currency};
use tracing::{Span, debug, info, warn};

use crate::{
    cart::Cart,
    catalog::{Discount, DiscountCatalog, DiscountSource},
    discounts::{DiscountBreakdown, discount_breakdown},
    pricing::{OrderTotals, PricingConfig, PricingError, compute_totals},
};

pub mod notice;
pub mod submission;

pub use notice::{CheckoutIssue, Notice, NoticeLevel};
pub use submission::{CheckoutRequest, CheckoutSelection};

const APPLIED_MESSAGE: &str = "Discount applied";
const REMOVED_MESSAGE: &str = "Discount removed";

/// The discount currently in effect and what it takes off the cart.
#[derive(Debug, Clone)]
pub struct AppliedDiscount<'a> {
    discount: Discount<'a>,
    breakdown: DiscountBreakdown<'a>,
}

impl<'a> AppliedDiscount<'a> {
    /// The applied discount
    pub fn discount(&self) -> &Discount<'a> {
        &self.discount
    }

    /// Total amount taken off the cart
    pub fn amount(&self) -> Money<'a, Currency> {
        self.breakdown.total()
    }

    /// Per-line detail of the amount
    pub fn breakdown(&self) -> &DiscountBreakdown<'a> {
        &self.breakdown
    }
}

/// Discount state for one checkout.
#[derive(Debug)]
pub struct CheckoutSession<'a> {
    catalog: Option<DiscountCatalog<'a>>,
    cart: Cart<'a>,
    code: String,
    applied: Option<AppliedDiscount<'a>>,
    notices: Vec<Notice>,
}

impl<'a> CheckoutSession<'a> {
    /// Start a checkout, fetching the discount list once from `source`.
    ///
    /// If the list cannot be fetched the session still starts, but discount entry is disabled
    /// until [`CheckoutSession::refresh_catalog`] succeeds.
    pub fn start(source: &impl DiscountSource, cart: Cart<'a>) -> Self {
        let mut session = Self {
            catalog: None,
            cart,
            code: String::new(),
            applied: None,
            notices: Vec::new(),
        };

        session.refresh_catalog(source);

        session
    }

    /// Start a checkout with an already built catalog.
    pub fn with_catalog(catalog: DiscountCatalog<'a>, cart: Cart<'a>) -> Self {
        Self {
            catalog: Some(catalog),
            cart,
            code: String::new(),
            applied: None,
            notices: Vec::new(),
        }
    }

    /// Fetch the discount list again.
    ///
    /// On success an applied discount is recalculated from the new list. If its code is gone
    /// it is cleared and an invalid-code notice is recorded. On failure the previous list, if
    /// any, is kept and an error notice is returned.
    #[tracing::instrument(name = "checkout.session.refresh_catalog", skip_all)]
    pub fn refresh_catalog(&mut self, source: &impl DiscountSource) -> Option<Notice> {
        let catalog = source
            .fetch_discounts()
            .and_then(|records| DiscountCatalog::from_records(records, self.cart.currency()));

        match catalog {
            Ok(catalog) => {
                info!(discount_count = catalog.len(), "loaded discount catalog");

                self.catalog = Some(catalog);

                if let Some(previous) = self.applied.take() {
                    let code = self.code.clone();

                    match self.resolve(&code, false) {
                        Some(notice) if notice.is_error() => {
                            self.record(notice);
                        }
                        Some(_) => {}
                        None => {
                            info!(
                                discount_id = %previous.discount.id(),
                                "applied discount withdrawn from catalog"
                            );

                            self.record(Notice::from(CheckoutIssue::InvalidCode));
                        }
                    }
                }

                None
            }
            Err(error) => {
                warn!(%error, "discount catalog unavailable");

                Some(self.record(Notice::from(CheckoutIssue::CatalogUnavailable)))
            }
        }
    }

    /// Whether there is a discount list to match codes against.
    pub fn discount_entry_enabled(&self) -> bool {
        self.catalog.is_some()
    }

    /// The discount list, if it was fetched.
    pub fn catalog(&self) -> Option<&DiscountCatalog<'a>> {
        self.catalog.as_ref()
    }

    /// The cart being checked out.
    pub fn cart(&self) -> &Cart<'a> {
        &self.cart
    }

    /// The bound discount code field.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The applied discount and its amount, if any.
    pub fn applied(&self) -> Option<&AppliedDiscount<'a>> {
        self.applied.as_ref()
    }

    /// The applied discount, if any.
    pub fn applied_discount(&self) -> Option<&Discount<'a>> {
        self.applied.as_ref().map(AppliedDiscount::discount)
    }

    /// Amount taken off by the applied discount; zero when none is applied.
    pub fn discount_amount(&self) -> Money<'a, Currency> {
        self.applied.as_ref().map_or_else(
            || Money::from_minor(0, self.cart.currency()),
            AppliedDiscount::amount,
        )
    }

    /// Apply the discount matching `code`.
    ///
    /// Applying the code that is already applied changes nothing. A code that matches nothing
    /// clears any applied discount.
    #[tracing::instrument(
        name = "checkout.session.apply",
        skip(self),
        fields(discount_id = tracing::field::Empty, amount_minor = tracing::field::Empty)
    )]
    pub fn apply(&mut self, code: &str) -> Notice {
        code.clone_into(&mut self.code);

        let notice = self
            .resolve(code, true)
            .unwrap_or_else(|| Notice::success(APPLIED_MESSAGE));

        self.record(notice)
    }

    /// Remove the applied discount and clear the code field.
    #[tracing::instrument(name = "checkout.session.remove", skip(self))]
    pub fn remove(&mut self) -> Notice {
        if let Some(applied) = self.applied.take() {
            info!(discount_id = %applied.discount.id(), "removed discount");
        }

        self.code.clear();

        self.record(Notice::info(REMOVED_MESSAGE))
    }

    /// React to the code field changing, whether typed by the customer or set by picking a
    /// discount from a list.
    ///
    /// A new matching code replaces the applied discount without an explicit apply. A code
    /// that is blank or matches nothing clears the applied discount. Returns a notice only
    /// when a discount was applied or could not be calculated.
    #[tracing::instrument(
        name = "checkout.session.set_code",
        skip(self, code),
        fields(discount_id = tracing::field::Empty, amount_minor = tracing::field::Empty)
    )]
    pub fn set_code(&mut self, code: impl Into<String>) -> Option<Notice> {
        self.code = code.into();

        if self.catalog.is_none() {
            return None;
        }

        let code = self.code.clone();

        self.resolve(&code, false).map(|notice| self.record(notice))
    }

    /// Swap in a freshly fetched cart, recalculating the applied discount against it.
    #[tracing::instrument(name = "checkout.session.replace_cart", skip_all)]
    pub fn replace_cart(&mut self, cart: Cart<'a>) -> Option<Notice> {
        self.cart = cart;

        let discount = self.applied.take()?.discount;

        match discount_breakdown(&discount, &self.cart) {
            Ok(breakdown) => {
                debug!(
                    discount_id = %discount.id(),
                    amount_minor = breakdown.total().to_minor_units(),
                    "recalculated discount for new cart"
                );

                self.applied = Some(AppliedDiscount {
                    discount,
                    breakdown,
                });

                None
            }
            Err(error) => {
                warn!(%error, discount_id = %discount.id(), "failed to recalculate discount");

                Some(self.record(Notice::from(CheckoutIssue::Calculation(error))))
            }
        }
    }

    /// Order totals for the current cart and applied discount.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the cart subtotal cannot be calculated or the pricing
    /// config is in a different currency.
    pub fn totals(&self, pricing: &PricingConfig<'a>) -> Result<OrderTotals<'a>, PricingError> {
        compute_totals(
            self.cart.subtotal()?,
            pricing.shipping(),
            pricing.taxes(),
            self.discount_amount(),
        )
    }

    /// Body for submitting this checkout with the customer's shipping and payment choices.
    pub fn checkout_request(&self, selection: CheckoutSelection) -> CheckoutRequest {
        CheckoutRequest::for_session(self, selection)
    }

    /// Hand over every notice produced since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        mem::take(&mut self.notices)
    }

    /// Match `code` and update the applied discount, returning the notice to report.
    ///
    /// An unchanged discount reports nothing. For an `explicit` apply the success notice is
    /// left to the caller and a failed match is reported; otherwise a new match reports
    /// success and a failed match quietly clears the applied discount.
    fn resolve(&mut self, code: &str, explicit: bool) -> Option<Notice> {
        let Some(catalog) = self.catalog.as_ref() else {
            self.applied = None;
            return Some(Notice::from(CheckoutIssue::CatalogUnavailable));
        };

        let Some(discount) = catalog.find(code) else {
            if let Some(applied) = self.applied.take() {
                debug!(
                    discount_id = %applied.discount.id(),
                    "code no longer matches; cleared discount"
                );
            }

            return explicit.then(|| Notice::from(CheckoutIssue::InvalidCode));
        };

        let span = Span::current();
        span.record("discount_id", tracing::field::display(discount.id()));

        if self
            .applied
            .as_ref()
            .is_some_and(|applied| applied.discount.id() == discount.id())
        {
            debug!("discount already applied");
            return None;
        }

        let discount = discount.clone();

        match discount_breakdown(&discount, &self.cart) {
            Ok(breakdown) => {
                let amount_minor = breakdown.total().to_minor_units();

                span.record("amount_minor", amount_minor);
                info!(discount_id = %discount.id(), amount_minor, "applied discount");

                self.applied = Some(AppliedDiscount {
                    discount,
                    breakdown,
                });

                (!explicit).then(|| Notice::success(APPLIED_MESSAGE))
            }
            Err(error) => {
                warn!(%error, discount_id = %discount.id(), "failed to calculate discount");

                self.applied = None;

                Some(Notice::from(CheckoutIssue::Calculation(error)))
            }
        }
    }

    fn record(&mut self, notice: Notice) -> Notice {
        self.notices.push(notice.clone());
        notice
    }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use rust_decimal::Decimal;
    use rusty_money::iso::GBP;
    use testresult::TestResult;

    use crate::{
        catalog::{CatalogError, DiscountKind, DiscountScope, source::MockDiscountSource},
        items::CartLineItem,
    };

    use super::*;

    fn catalog<'a>() -> DiscountCatalog<'a> {
        DiscountCatalog::new([
            Discount::new(
                "d1",
                "SAVE10",
                DiscountKind::Percentage(Percentage::from(Decimal::new(10, 2))),
                DiscountScope::product("P1"),
            ),
            Discount::new(
                "d2",
                "FIFTY",
                DiscountKind::Fixed(Money::from_minor(5_000, GBP)),
                DiscountScope::category("C1"),
            ),
        ])
    }

    fn cart<'a>() -> Result<Cart<'a>, crate::cart::CartError> {
        Cart::with_items(
            [
                CartLineItem::new("P1", Money::from_minor(10_000, GBP), 2),
                CartLineItem::with_category("P2", "C1", Money::from_minor(1_000, GBP), 1),
            ],
            GBP,
        )
    }

    fn session<'a>() -> Result<CheckoutSession<'a>, crate::cart::CartError> {
        Ok(CheckoutSession::with_catalog(catalog(), cart()?))
    }

    #[test]
    fn apply_matching_code_case_insensitively() -> TestResult {
        let mut session = session()?;

        let notice = session.apply("save10");

        assert_eq!(notice, Notice::success(APPLIED_MESSAGE));
        assert_eq!(session.applied_discount().map(Discount::code), Some("SAVE10"));
        assert_eq!(session.discount_amount(), Money::from_minor(2_000, GBP));
        assert_eq!(session.code(), "save10");

        Ok(())
    }

    #[test]
    fn apply_unknown_code_clears_prior_discount() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");

        let notice = session.apply("NOPE");

        assert!(notice.is_error());
        assert_eq!(notice.message(), "Invalid discount code");
        assert!(session.applied_discount().is_none());
        assert_eq!(session.discount_amount(), Money::from_minor(0, GBP));

        Ok(())
    }

    #[test]
    fn apply_same_code_twice_is_idempotent() -> TestResult {
        let mut once = session()?;
        once.apply("SAVE10");

        let mut twice = session()?;
        twice.apply("SAVE10");
        let notice = twice.apply("save10");

        assert!(!notice.is_error());
        assert_eq!(
            once.applied_discount().map(Discount::id),
            twice.applied_discount().map(Discount::id)
        );
        assert_eq!(once.discount_amount(), twice.discount_amount());

        Ok(())
    }

    #[test]
    fn apply_replaces_rather_than_stacks() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");
        session.apply("FIFTY");

        assert_eq!(session.applied_discount().map(Discount::code), Some("FIFTY"));
        assert_eq!(session.discount_amount(), Money::from_minor(1_000, GBP));

        Ok(())
    }

    #[test]
    fn remove_clears_everything() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");

        let notice = session.remove();

        assert_eq!(notice.level(), NoticeLevel::Info);
        assert_eq!(notice.message(), "Discount removed");
        assert!(session.applied().is_none());
        assert_eq!(session.discount_amount(), Money::from_minor(0, GBP));
        assert_eq!(session.code(), "");

        Ok(())
    }

    #[test]
    fn set_code_applies_new_match_implicitly() -> TestResult {
        let mut session = session()?;

        let notice = session.set_code("fifty");

        assert_eq!(notice, Some(Notice::success(APPLIED_MESSAGE)));
        assert_eq!(session.applied_discount().map(Discount::code), Some("FIFTY"));

        Ok(())
    }

    #[test]
    fn set_code_to_same_discount_is_silent() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");

        assert_eq!(session.set_code("SaVe10"), None);
        assert_eq!(session.applied_discount().map(Discount::code), Some("SAVE10"));

        Ok(())
    }

    #[test]
    fn set_code_without_match_clears_quietly() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");

        assert_eq!(session.set_code("SAVE1"), None);
        assert!(session.applied().is_none());

        Ok(())
    }

    #[test]
    fn set_code_blank_clears_quietly() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");

        assert_eq!(session.set_code("  "), None);
        assert!(session.applied().is_none());

        Ok(())
    }

    #[test]
    fn failed_catalog_fetch_disables_entry() -> TestResult {
        let mut source = MockDiscountSource::new();
        source
            .expect_fetch_discounts()
            .returning(|| Err(CatalogError::Unavailable("connection refused".to_string())));

        let mut session = CheckoutSession::start(&source, cart()?);

        assert!(!session.discount_entry_enabled());
        assert_eq!(
            session.take_notices(),
            vec![Notice::error("Discounts are currently unavailable")]
        );

        let notice = session.apply("SAVE10");

        assert_eq!(notice.message(), "Discounts are currently unavailable");
        assert!(session.applied().is_none());
        assert_eq!(session.set_code("SAVE10"), None);

        Ok(())
    }

    #[test]
    fn refresh_catalog_enables_entry() -> TestResult {
        let mut failing = MockDiscountSource::new();
        failing
            .expect_fetch_discounts()
            .returning(|| Err(CatalogError::Unavailable("timeout".to_string())));

        let mut session = CheckoutSession::start(&failing, cart()?);

        let mut working = MockDiscountSource::new();
        working.expect_fetch_discounts().times(1).returning(|| {
            crate::catalog::source::parse_json_payload(
                r#"[{"id":"d1","code":"SAVE10","discountType":"percentage","discountValue":10,"productId":"P1"}]"#,
            )
        });

        assert_eq!(session.refresh_catalog(&working), None);
        assert!(session.discount_entry_enabled());
        assert!(!session.apply("SAVE10").is_error());

        Ok(())
    }

    #[test]
    fn refresh_catalog_reports_withdrawn_discount() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");
        session.take_notices();

        let mut source = MockDiscountSource::new();
        source.expect_fetch_discounts().times(1).returning(|| {
            crate::catalog::source::parse_json_payload(
                r#"[{"id":"d2","code":"FIFTY","discountType":"fixed","discountValue":50,"categoryId":"C1"}]"#,
            )
        });

        assert_eq!(session.refresh_catalog(&source), None);
        assert!(session.applied().is_none());
        assert_eq!(session.discount_amount(), Money::from_minor(0, GBP));
        assert_eq!(
            session.take_notices(),
            [Notice::error("Invalid discount code")]
        );

        Ok(())
    }

    #[test]
    fn replace_cart_recalculates_amount() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");

        let bigger = Cart::with_items(
            [CartLineItem::new("P1", Money::from_minor(10_000, GBP), 5)],
            GBP,
        )?;

        assert_eq!(session.replace_cart(bigger), None);
        assert_eq!(session.discount_amount(), Money::from_minor(5_000, GBP));

        Ok(())
    }

    #[test]
    fn totals_include_discount() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");

        let totals = session.totals(&PricingConfig::free_shipping(Money::from_minor(20, GBP)))?;

        assert_eq!(totals.subtotal, Money::from_minor(21_000, GBP));
        assert_eq!(totals.discount_amount, Money::from_minor(2_000, GBP));
        assert_eq!(totals.total, Money::from_minor(19_020, GBP));

        Ok(())
    }

    #[test]
    fn notices_are_queued_until_taken() -> TestResult {
        let mut session = session()?;
        session.apply("SAVE10");
        session.remove();

        let notices = session.take_notices();

        assert_eq!(notices.len(), 2);
        assert!(session.take_notices().is_empty());

        Ok(())
    }

    #[test]
    fn checkout_request_carries_applied_code() -> TestResult {
        let mut session = CheckoutSession::with_catalog(catalog(), cart()?);
        session.apply("fifty");

        let request = session.checkout_request(CheckoutSelection {
            shipping_address_id: "addr-1".to_string(),
            payment_method: submission::PaymentMethod::CashOnDelivery,
        });

        assert_eq!(request.discount_code.as_deref(), Some("FIFTY"));

        Ok(())
    }
}
