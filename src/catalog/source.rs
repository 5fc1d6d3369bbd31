//! Discount Sources
//!
//! Where a session gets its discount list from. The storefront fetches it once at the start
//! of checkout and never revalidates it.

use std::{fs, io, path::PathBuf};

use mockall::automock;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::{CatalogError, DiscountRecord};

/// Anything that can hand over the current discount list.
#[automock]
pub trait DiscountSource {
    /// Fetch every discount record, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the list cannot be fetched or parsed.
    fn fetch_discounts(&self) -> Result<Vec<DiscountRecord>, CatalogError>;
}

/// Discounts file wrapper, `discounts:` at the top level.
#[derive(Debug, Deserialize)]
pub struct DiscountsFixture {
    /// Discount records in catalog order
    pub discounts: Vec<DiscountRecord>,
}

/// Parse a discounts endpoint response body (a bare JSON array).
///
/// # Errors
///
/// Returns [`CatalogError::Json`] if the body is not an array of discount records.
pub fn parse_json_payload(body: &str) -> Result<Vec<DiscountRecord>, CatalogError> {
    Ok(serde_json::from_str(body)?)
}

/// Reads discounts from a file on disk.
///
/// `.json` files hold a bare array as returned by the discounts endpoint; anything else is
/// read as YAML with a top-level `discounts:` list.
#[derive(Debug, Clone)]
pub struct FileDiscountSource {
    path: PathBuf,
}

impl FileDiscountSource {
    /// Create a source reading from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DiscountSource for FileDiscountSource {
    fn fetch_discounts(&self) -> Result<Vec<DiscountRecord>, CatalogError> {
        let contents = fs::read_to_string(&self.path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                CatalogError::Unavailable(format!("{} not found", self.path.display()))
            } else {
                CatalogError::Io(error)
            }
        })?;

        let records = if self
            .path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
        {
            parse_json_payload(&contents)?
        } else {
            serde_norway::from_str::<DiscountsFixture>(&contents)?.discounts
        };

        debug!(path = %self.path.display(), count = records.len(), "read discount records");

        Ok(records)
    }
}

/// An in-memory discount list.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscountSource {
    records: Vec<DiscountRecord>,
}

impl StaticDiscountSource {
    /// Wrap an already fetched list of records.
    pub fn new(records: impl Into<Vec<DiscountRecord>>) -> Self {
        Self {
            records: records.into(),
        }
    }
}

impl DiscountSource for StaticDiscountSource {
    fn fetch_discounts(&self) -> Result<Vec<DiscountRecord>, CatalogError> {
        Ok(self.records.clone())
    }
}
