//! Numeric field parsing for supplier rows.
//!
//! Suppliers decorate numbers freely: `"1 234,50 руб."`, `">10"`, `"~5"`.
//! These functions strip the decoration and fail with
//! [`CatalogError::Malformed`] when nothing usable remains.

use std::str::FromStr;

use pricecat_core::{CatalogError, CatalogResult};
use rust_decimal::Decimal;

/// Parses a price with `,` or `.` as the decimal separator. Text before the
/// first digit and after the last one is dropped, then everything other than
/// digits and separators. The result is rounded to two decimal places.
///
/// # Errors
///
/// Returns `Malformed` for an empty, non-numeric, or negative price.
pub fn parse_price(raw: &str) -> CatalogResult<Decimal> {
    let malformed = || CatalogError::malformed("price", raw);
    if raw.trim_start().starts_with('-') {
        return Err(malformed());
    }

    let kept: String = raw
        .trim_matches(|c: char| !c.is_ascii_digit())
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let normalized = kept.replacen(',', ".", 1);
    let normalized = normalized.trim_end_matches('.');
    if normalized.is_empty() {
        return Err(malformed());
    }

    Decimal::from_str(normalized)
        .map(|d| d.round_dp(2))
        .map_err(|_| malformed())
}

/// Parses a quantity. An empty cell means 0.
///
/// # Errors
///
/// Returns `Malformed` when the cell holds no digits or overflows.
pub fn parse_quantity(raw: &str) -> CatalogResult<i32> {
    parse_count("quantity", raw)
}

/// Parses a stock count, ignoring decoration such as `<`, `>`, `~`, or a
/// trailing unit. A fractional part is dropped. An empty cell means 0.
///
/// # Errors
///
/// Returns `Malformed` when the cell holds no digits or overflows.
pub fn parse_rest(raw: &str) -> CatalogResult<i32> {
    parse_count("rest", raw)
}

fn parse_count(field: &'static str, raw: &str) -> CatalogResult<i32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }

    let integral = trimmed
        .split(['.', ','])
        .next()
        .unwrap_or_default();
    let digits: String = integral.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(CatalogError::malformed(field, raw));
    }
    digits
        .parse::<i32>()
        .map_err(|_| CatalogError::malformed(field, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_accepts_comma_decimal_and_noise() {
        assert_eq!(parse_price("1 234,50 руб.").unwrap(), Decimal::new(123_450, 2));
        assert_eq!(parse_price("99.9").unwrap(), Decimal::new(9990, 2));
        assert_eq!(parse_price("$15").unwrap(), Decimal::new(15, 0));
    }

    #[test]
    fn price_ignores_currency_before_the_number() {
        assert_eq!(parse_price("руб. 12,50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_price("р.1 200.00").unwrap(), Decimal::new(120_000, 2));
        assert_eq!(parse_price("USD 7.5 $.").unwrap(), Decimal::new(750, 2));
    }

    #[test]
    fn price_rounds_to_cents() {
        assert_eq!(parse_price("10,005").unwrap(), Decimal::new(1000, 2));
        assert_eq!(parse_price("10,015").unwrap(), Decimal::new(1002, 2));
    }

    #[test]
    fn price_rejects_garbage() {
        assert!(matches!(
            parse_price("по запросу"),
            Err(CatalogError::Malformed { field: "price", .. })
        ));
        assert!(parse_price("").is_err());
        assert!(parse_price("1.234.56").is_err());
        assert!(parse_price("-5").is_err());
    }

    #[test]
    fn rest_strips_decoration() {
        assert_eq!(parse_rest(">10").unwrap(), 10);
        assert_eq!(parse_rest("<5").unwrap(), 5);
        assert_eq!(parse_rest("~ 3 шт").unwrap(), 3);
        assert_eq!(parse_rest("12,000").unwrap(), 12);
        assert_eq!(parse_rest("").unwrap(), 0);
    }

    #[test]
    fn rest_without_digits_is_malformed() {
        let err = parse_rest("много").unwrap_err();
        assert_eq!(err.to_string(), "malformed rest: \"много\"");
    }

    #[test]
    fn quantity_defaults_to_zero_and_rejects_overflow() {
        assert_eq!(parse_quantity("  ").unwrap(), 0);
        assert_eq!(parse_quantity("4").unwrap(), 4);
        assert!(parse_quantity("99999999999").is_err());
    }
}
