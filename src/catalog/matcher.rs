//! Discount code matching

use crate::catalog::Discount;

/// Find the first discount whose code matches `code`.
///
/// The input is trimmed and compared case-insensitively against each catalog code. Returns
/// `None` for blank input or a missing/empty catalog. Catalog order breaks ties.
pub fn find_by_code<'c, 'a>(
    code: &str,
    catalog: Option<&'c [Discount<'a>]>,
) -> Option<&'c Discount<'a>> {
    let code = code.trim();

    if code.is_empty() {
        return None;
    }

    catalog?
        .iter()
        .find(|discount| codes_match(discount.code(), code))
}

/// Case-insensitive comparison that does not allocate.
fn codes_match(catalog_code: &str, code: &str) -> bool {
    catalog_code
        .chars()
        .flat_map(char::to_lowercase)
        .eq(code.chars().flat_map(char::to_lowercase))
}
