//! Checkout Notices
//!
//! Nothing that goes wrong during checkout is allowed to escape as an error; it is turned
//! into a [`Notice`] for the storefront to show instead.

use std::fmt;

use thiserror::Error;

use crate::{
    checkout::submission::{PaymentError, SubmissionError},
    discounts::DiscountError,
};

/// Problems a customer can run into during checkout.
///
/// The `Display` text is what the customer sees.
#[derive(Debug, Error)]
pub enum CheckoutIssue {
    /// Code does not match any discount in the catalog.
    #[error("Invalid discount code")]
    InvalidCode,

    /// The discount list could not be fetched, so no code can be matched.
    #[error("Discounts are currently unavailable")]
    CatalogUnavailable,

    /// A matched discount could not be calculated against the cart.
    #[error("Unable to apply discount")]
    Calculation(#[source] DiscountError),

    /// The order could not be submitted.
    #[error("Unable to place order")]
    Submission(#[source] SubmissionError),

    /// The order was created but payment did not go through.
    #[error("Payment failed, please check your order status")]
    Payment(#[source] PaymentError),
}

/// How a notice should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Something the customer asked for worked.
    Success,

    /// Something the customer asked for did not work.
    Error,

    /// Neutral information.
    Info,
}

/// A message for the storefront to show the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    level: NoticeLevel,
    message: String,
}

impl Notice {
    /// Create a success notice.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// Create an error notice.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Create an informational notice.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    /// Notice level
    pub fn level(&self) -> NoticeLevel {
        self.level
    }

    /// Notice text
    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for error notices
    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&CheckoutIssue> for Notice {
    fn from(issue: &CheckoutIssue) -> Self {
        Self::error(issue.to_string())
    }
}

impl From<CheckoutIssue> for Notice {
    fn from(issue: CheckoutIssue) -> Self {
        Self::from(&issue)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.level {
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
            NoticeLevel::Info => "info",
        };

        write!(f, "[{label}] {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_become_error_notices() {
        let notice = Notice::from(CheckoutIssue::InvalidCode);

        assert!(notice.is_error());
        assert_eq!(notice.message(), "Invalid discount code");
    }

    #[test]
    fn calculation_issue_hides_internal_detail() {
        let notice = Notice::from(CheckoutIssue::Calculation(DiscountError::Overflow));

        assert_eq!(notice.message(), "Unable to apply discount");
    }

    #[test]
    fn display_includes_level() {
        assert_eq!(
            Notice::info("Discount removed").to_string(),
            "[info] Discount removed"
        );
        assert_eq!(
            Notice::success("Discount applied").level(),
            NoticeLevel::Success
        );
    }
}
