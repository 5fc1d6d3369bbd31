//! Checkout Submission
//!
//! Sends the finished checkout to the order service and, for card payments, hands the
//! returned client secret to the payment gateway. Nothing here retries: a failed submission
//! is reported, and a failed payment sends the customer to the order status page because the
//! order already exists server-side.

use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::checkout::{CheckoutIssue, CheckoutSession, Notice};

/// Errors returned by the order service.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The order service refused the order.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The order service could not be reached.
    #[error("order service unreachable: {0}")]
    Transport(String),

    /// The order service replied with something we could not read.
    #[error("unreadable order response: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors returned by the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The payment was declined.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The payment gateway could not be reached.
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
}

/// How the customer is paying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card payment confirmed through the payment gateway
    Card,

    /// Paid on delivery, no gateway involved
    CashOnDelivery,
}

/// Shipping and payment choices made on the checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSelection {
    /// Saved shipping address to deliver to
    pub shipping_address_id: String,

    /// Payment method
    pub payment_method: PaymentMethod,
}

/// Body sent to the checkout endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Code of the applied discount, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,

    /// Saved shipping address to deliver to
    pub shipping_address_id: String,

    /// Payment method
    pub payment_method: PaymentMethod,
}

impl CheckoutRequest {
    /// Build the request for `session`, carrying the applied discount's catalog code.
    pub fn for_session(session: &CheckoutSession<'_>, selection: CheckoutSelection) -> Self {
        Self {
            discount_code: session
                .applied_discount()
                .map(|discount| discount.code().to_string()),
            shipping_address_id: selection.shipping_address_id,
            payment_method: selection.payment_method,
        }
    }

    /// Serialize as the JSON body of the checkout endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`SubmissionError::Json`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SubmissionError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Body returned by the checkout endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Identifier of the created order
    pub order_id: String,

    /// Payment intent client secret, present for gateway payments
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Payment identifier at the gateway
    #[serde(default)]
    pub payment_id: Option<String>,
}

/// The order service.
#[automock]
pub trait OrderGateway {
    /// Create an order from a checkout request.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmissionError`] if the order was not created.
    fn submit_order(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutResponse, SubmissionError>;
}

/// The external payment gateway.
#[automock]
pub trait PaymentGateway {
    /// Confirm the payment identified by `client_secret` for `order_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`PaymentError`] if the payment did not go through.
    fn confirm_payment(&self, order_id: &str, client_secret: &str)
    -> Result<(), PaymentError>;
}

/// What happened when the checkout was submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The order was placed and, if needed, paid.
    Placed {
        /// Identifier of the created order
        order_id: String,
    },

    /// The order exists but payment failed; send the customer to its status page.
    PaymentFailed {
        /// Identifier of the created order
        order_id: String,

        /// Order status page
        redirect: String,

        /// Message for the customer
        notice: Notice,
    },

    /// No order was created.
    Failed {
        /// Message for the customer
        notice: Notice,
    },
}

/// Path of the order status page for `order_id`.
pub fn order_status_path(order_id: &str) -> String {
    format!("/orders/{order_id}")
}

/// Submit the checkout for `session`.
///
/// The payment gateway is only involved when paying by card and the order service returned a
/// client secret.
#[tracing::instrument(
    name = "checkout.submit",
    skip_all,
    fields(
        discount_code = tracing::field::Empty,
        payment_method = ?selection.payment_method
    )
)]
pub fn submit_checkout(
    session: &CheckoutSession<'_>,
    selection: CheckoutSelection,
    orders: &impl OrderGateway,
    payments: &impl PaymentGateway,
) -> CheckoutOutcome {
    let request = CheckoutRequest::for_session(session, selection);

    if let Some(code) = request.discount_code.as_deref() {
        tracing::Span::current().record("discount_code", code);
    }

    let response = match orders.submit_order(&request) {
        Ok(response) => response,
        Err(error) => {
            warn!(%error, "order submission failed");

            return CheckoutOutcome::Failed {
                notice: Notice::from(CheckoutIssue::Submission(error)),
            };
        }
    };

    let order_id = response.order_id;

    if request.payment_method == PaymentMethod::Card
        && let Some(client_secret) = response.client_secret.as_deref()
        && let Err(error) = payments.confirm_payment(&order_id, client_secret)
    {
        warn!(%error, order_id = %order_id, "payment failed; redirecting to order status");

        return CheckoutOutcome::PaymentFailed {
            redirect: order_status_path(&order_id),
            order_id,
            notice: Notice::from(CheckoutIssue::Payment(error)),
        };
    }

    info!(order_id = %order_id, "order placed");

    CheckoutOutcome::Placed { order_id }
}

#[cfg(test)]
mod tests {
    use decimal_percentage::Percentage;
    use mockall::predicate::{always, eq};
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::{
        cart::Cart,
        catalog::{Discount, DiscountCatalog, DiscountKind, DiscountScope},
        items::CartLineItem,
    };

    use super::*;

    fn session<'a>() -> Result<CheckoutSession<'a>, crate::cart::CartError> {
        let catalog = DiscountCatalog::new([Discount::new(
            "d1",
            "SAVE10",
            DiscountKind::Percentage(Percentage::from(0.1)),
            DiscountScope::product("P1"),
        )]);

        let cart = Cart::with_items(
            [CartLineItem::new("P1", Money::from_minor(10_000, GBP), 1)],
            GBP,
        )?;

        Ok(CheckoutSession::with_catalog(catalog, cart))
    }

    fn card() -> CheckoutSelection {
        CheckoutSelection {
            shipping_address_id: "addr-1".to_string(),
            payment_method: PaymentMethod::Card,
        }
    }

    fn response(client_secret: Option<&str>) -> CheckoutResponse {
        CheckoutResponse {
            order_id: "order-1".to_string(),
            client_secret: client_secret.map(str::to_string),
            payment_id: None,
        }
    }

    #[test]
    fn request_carries_catalog_code_of_applied_discount() -> TestResult {
        let mut session = session()?;
        session.apply("save10");

        let request = CheckoutRequest::for_session(&session, card());

        assert_eq!(request.discount_code.as_deref(), Some("SAVE10"));
        assert_eq!(
            request.to_json()?,
            r#"{"discountCode":"SAVE10","shippingAddressId":"addr-1","paymentMethod":"card"}"#
        );

        Ok(())
    }

    #[test]
    fn request_omits_discount_code_when_none_applied() -> TestResult {
        let session = session()?;

        let request = CheckoutRequest::for_session(&session, card());

        assert_eq!(
            request.to_json()?,
            r#"{"shippingAddressId":"addr-1","paymentMethod":"card"}"#
        );

        Ok(())
    }

    #[test]
    fn card_payment_is_confirmed() -> TestResult {
        let session = session()?;

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .times(1)
            .returning(|_| Ok(response(Some("secret"))));

        let mut payments = MockPaymentGateway::new();
        payments
            .expect_confirm_payment()
            .with(eq("order-1"), eq("secret"))
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = submit_checkout(&session, card(), &orders, &payments);

        assert_eq!(
            outcome,
            CheckoutOutcome::Placed {
                order_id: "order-1".to_string()
            }
        );

        Ok(())
    }

    #[test]
    fn payment_failure_redirects_to_order_status() -> TestResult {
        let session = session()?;

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .returning(|_| Ok(response(Some("secret"))));

        let mut payments = MockPaymentGateway::new();
        payments
            .expect_confirm_payment()
            .with(always(), always())
            .times(1)
            .returning(|_, _| Err(PaymentError::Declined("insufficient funds".to_string())));

        let outcome = submit_checkout(&session, card(), &orders, &payments);

        assert!(matches!(
            outcome,
            CheckoutOutcome::PaymentFailed { ref order_id, ref redirect, ref notice }
                if order_id == "order-1"
                    && redirect == "/orders/order-1"
                    && notice.is_error()
        ));

        Ok(())
    }

    #[test]
    fn submission_failure_is_reported_without_payment() -> TestResult {
        let session = session()?;

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .times(1)
            .returning(|_| Err(SubmissionError::Transport("timeout".to_string())));

        let mut payments = MockPaymentGateway::new();
        payments.expect_confirm_payment().never();

        let outcome = submit_checkout(&session, card(), &orders, &payments);

        assert_eq!(
            outcome,
            CheckoutOutcome::Failed {
                notice: Notice::error("Unable to place order")
            }
        );

        Ok(())
    }

    #[test]
    fn cash_on_delivery_skips_gateway() -> TestResult {
        let session = session()?;

        let mut orders = MockOrderGateway::new();
        orders
            .expect_submit_order()
            .withf(|request| request.payment_method == PaymentMethod::CashOnDelivery)
            .returning(|_| Ok(response(None)));

        let mut payments = MockPaymentGateway::new();
        payments.expect_confirm_payment().never();

        let selection = CheckoutSelection {
            shipping_address_id: "addr-1".to_string(),
            payment_method: PaymentMethod::CashOnDelivery,
        };

        let outcome = submit_checkout(&session, selection, &orders, &payments);

        assert!(matches!(outcome, CheckoutOutcome::Placed { .. }));

        Ok(())
    }

    #[test]
    fn response_parses_from_api_json() -> TestResult {
        let response: CheckoutResponse =
            serde_json::from_str(r#"{"orderId":"o-9","clientSecret":"pi_secret"}"#)?;

        assert_eq!(response.order_id, "o-9");
        assert_eq!(response.client_secret.as_deref(), Some("pi_secret"));
        assert!(response.payment_id.is_none());

        Ok(())
    }
}
