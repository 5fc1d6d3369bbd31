//! Receipt

use std::io;

use rusty_money::Money;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{
    checkout::{AppliedDiscount, CheckoutSession},
    pricing::{OrderTotals, PricingConfig, PricingError},
};

/// Errors that can occur when building a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Error calculating the order totals.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Order summary for a checkout session.
#[derive(Debug, Clone)]
pub struct Receipt<'s, 'a> {
    session: &'s CheckoutSession<'a>,
    totals: OrderTotals<'a>,
}

impl<'s, 'a> Receipt<'s, 'a> {
    /// Build a receipt for `session` with the given checkout charges.
    ///
    /// # Errors
    ///
    /// Returns an error if the totals cannot be computed.
    pub fn new(
        session: &'s CheckoutSession<'a>,
        pricing: &PricingConfig<'a>,
    ) -> Result<Self, ReceiptError> {
        Ok(Self {
            session,
            totals: session.totals(pricing)?,
        })
    }

    /// Totals shown in the summary
    pub fn totals(&self) -> &OrderTotals<'a> {
        &self.totals
    }

    /// Writes the receipt.
    ///
    /// # Errors
    ///
    /// Returns an error if the receipt cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Product", "Category", "Price", "Qty", "Line Total", "Discount"]);

        let breakdown = self.session.applied().map(AppliedDiscount::breakdown);

        for (idx, item) in self.session.cart().iter().enumerate() {
            let line_total = item
                .subtotal_minor()
                .map(|minor| Money::from_minor(minor, item.price().currency()))
                .ok_or(PricingError::Overflow)?;

            let discount = breakdown
                .and_then(|breakdown| breakdown.for_line(idx))
                .map(|amount| format!("-{amount}"))
                .unwrap_or_default();

            builder.push_record([
                format!("#{:<3}", idx + 1),
                item.product().to_string(),
                item.category().map(ToString::to_string).unwrap_or_default(),
                format!("{}", item.price()),
                item.quantity().to_string(),
                format!("{line_total}"),
                discount,
            ]);
        }

        write_receipt_table(&mut out, builder)?;

        write_receipt_summary(&mut out, self)
    }
}

fn write_receipt_table(out: &mut impl io::Write, builder: Builder) -> Result<(), ReceiptError> {
    let mut table = builder.build();
    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(
        1,
        HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
    );

    table.with(theme);
    table.modify(Columns::new(3..), Alignment::right());
    table.modify(Rows::first(), Alignment::center());

    writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)
}

fn write_receipt_summary(
    out: &mut impl io::Write,
    receipt: &Receipt<'_, '_>,
) -> Result<(), ReceiptError> {
    let totals = receipt.totals();

    let discount_label = match receipt.session.applied_discount() {
        Some(discount) => format!(" Discount ({}):", discount.code()),
        None => " Discount:".to_string(),
    };

    let lines = [
        (" Subtotal:".to_string(), totals.subtotal.to_string()),
        (" Shipping:".to_string(), totals.shipping.to_string()),
        (" Taxes:".to_string(), totals.taxes.to_string()),
        (discount_label, format!("-{}", totals.discount_amount)),
        (" Total:".to_string(), totals.total.to_string()),
    ];

    let label_width = lines
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or_default();

    let value_width = lines
        .iter()
        .map(|(_, value)| value.chars().count())
        .max()
        .unwrap_or_default();

    for (label, value) in &lines {
        writeln!(out, "{label:<label_width$} {value:>value_width$}  ")
            .map_err(|_err| ReceiptError::IO)?;
    }

    writeln!(out).map_err(|_err| ReceiptError::IO)
}
