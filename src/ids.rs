//! Identifiers
//!
//! Opaque string identifiers handed to us by the storefront API.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id! {
    /// Discount identifier
    DiscountId
}

string_id! {
    /// Product identifier
    ProductId
}

string_id! {
    /// Category identifier
    CategoryId
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn ids_compare_by_value() {
        assert_eq!(ProductId::from("P1"), ProductId::new(String::from("P1")));
        assert_ne!(CategoryId::from("C1"), CategoryId::from("c1"));
    }

    #[test]
    fn ids_serialize_transparently() -> TestResult {
        let json = serde_json::to_string(&DiscountId::from("d-42"))?;

        assert_eq!(json, "\"d-42\"");

        let id: ProductId = serde_json::from_str("\"P9\"")?;

        assert_eq!(id.as_str(), "P9");
        assert_eq!(id.to_string(), "P9");

        Ok(())
    }
}
