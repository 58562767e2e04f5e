//! Shared coercion helpers for free-text property fields

use crate::analysis::types::{GrammarProximity, OfstedRating, PropertyType};
use once_cell::sync::Lazy;
use regex::Regex;

/// UK postcode shape: outward code (e.g. "SE1") + inward code (e.g. "9SP"),
/// with the separating space optional.
static POSTCODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{1,2}\d[A-Z\d]?\s?\d[A-Z]{2}$").expect("postcode pattern"));

/// Parse a price that may arrive as a currency string ("£350,000")
pub fn parse_price(value: &str) -> Option<i64> {
    let cleaned = value
        .replace('£', "")
        .replace('$', "")
        .replace(',', "")
        .trim()
        .to_string();

    if cleaned.is_empty() {
        return None;
    }

    // Accept "350000.00" style values from spreadsheet exports
    let amount = cleaned.parse::<f64>().ok()?;
    if !amount.is_finite() {
        return None;
    }
    Some(amount.round() as i64)
}

/// Upper-case and trim a postcode without judging its shape
pub fn normalize_postcode(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Check a normalized postcode against the UK shape
pub fn is_valid_postcode(postcode: &str) -> bool {
    POSTCODE_RE.is_match(postcode)
}

/// Outward code of a normalized postcode ("SE1 9SP" -> "SE1")
pub fn outward_code(postcode: &str) -> &str {
    if let Some(idx) = postcode.find(' ') {
        &postcode[..idx]
    } else if postcode.len() > 3 {
        &postcode[..postcode.len() - 3]
    } else {
        postcode
    }
}

/// Normalize a free-text property type to the canonical enum.
///
/// Keywords are checked in a fixed order so that compound descriptions
/// ("semi-detached house") resolve to the most specific match rather than
/// whichever keyword happens to be seen first.
pub fn parse_property_type(value: &str) -> PropertyType {
    let lower = value.to_lowercase();

    if lower.contains("semi") {
        PropertyType::SemiDetached
    } else if lower.contains("end of terrace") || lower.contains("end-of-terrace") {
        PropertyType::EndOfTerrace
    } else if lower.contains("terrace") {
        PropertyType::Terraced
    } else if lower.contains("detached") {
        PropertyType::Detached
    } else if lower.contains("town") {
        PropertyType::Townhouse
    } else if lower.contains("bungalow") {
        PropertyType::Bungalow
    } else if lower.contains("cottage") {
        PropertyType::Cottage
    } else if lower.contains("maisonette") || lower.contains("duplex") {
        PropertyType::Maisonette
    } else if lower.contains("penthouse") {
        PropertyType::Penthouse
    } else if lower.contains("studio") {
        PropertyType::Studio
    } else if lower.contains("flat") || lower.contains("apartment") || lower.contains("apt")
        || lower.contains("condo")
    {
        PropertyType::Flat
    } else if lower.contains("house") || lower.contains("dwelling") {
        PropertyType::House
    } else {
        PropertyType::Other
    }
}

/// Parse an Ofsted rating from free text. None means unrecognized.
pub fn parse_ofsted_rating(value: &str) -> Option<OfstedRating> {
    let lower = value.to_lowercase();

    if lower.contains("outstanding") {
        Some(OfstedRating::Outstanding)
    } else if lower.contains("requires") {
        Some(OfstedRating::RequiresImprovement)
    } else if lower.contains("inadequate") {
        Some(OfstedRating::Inadequate)
    } else if lower.contains("good") {
        Some(OfstedRating::Good)
    } else if lower.contains("unknown") {
        Some(OfstedRating::Unknown)
    } else {
        None
    }
}

/// Parse a grammar-school catchment status from free text
pub fn parse_grammar_status(value: &str) -> Option<GrammarProximity> {
    let lower = value.to_lowercase();

    if lower.contains("yes") || lower.contains("close") || lower.contains("within catchment")
        || lower.contains("nearby")
    {
        Some(GrammarProximity::Yes)
    } else if lower.contains("possible") || lower.contains("maybe") || lower.contains("borderline")
    {
        Some(GrammarProximity::Possible)
    } else if lower.contains("no") || lower.contains("outside") {
        Some(GrammarProximity::No)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_currency_string() {
        assert_eq!(parse_price("£350,000"), Some(350_000));
        assert_eq!(parse_price("$1,250,000"), Some(1_250_000));
        assert_eq!(parse_price(" 420000 "), Some(420_000));
        assert_eq!(parse_price("385000.00"), Some(385_000));
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        assert_eq!(parse_price("POA"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("£"), None);
    }

    #[test]
    fn test_postcode_shape() {
        assert!(is_valid_postcode("SE1 9SP"));
        assert!(is_valid_postcode("SE19SP"));
        assert!(is_valid_postcode("N1 7AA"));
        assert!(is_valid_postcode("EC1A 1BB"));

        assert!(!is_valid_postcode("not a postcode"));
        assert!(!is_valid_postcode("12345"));
        assert!(!is_valid_postcode(""));
    }

    #[test]
    fn test_outward_code() {
        assert_eq!(outward_code("SE1 9SP"), "SE1");
        assert_eq!(outward_code("EC1A1BB"), "EC1A");
        assert_eq!(outward_code("N1"), "N1");
    }

    #[test]
    fn test_parse_property_type() {
        assert_eq!(parse_property_type("Semi-Detached House"), PropertyType::SemiDetached);
        assert_eq!(parse_property_type("Detached"), PropertyType::Detached);
        assert_eq!(parse_property_type("End of Terrace"), PropertyType::EndOfTerrace);
        assert_eq!(parse_property_type("Victorian terraced house"), PropertyType::Terraced);
        assert_eq!(parse_property_type("apartment"), PropertyType::Flat);
        assert_eq!(parse_property_type("Studio"), PropertyType::Studio);
        assert_eq!(parse_property_type("Houseboat"), PropertyType::House);
        assert_eq!(parse_property_type("Castle"), PropertyType::Other);
    }

    #[test]
    fn test_parse_ofsted_rating() {
        assert_eq!(parse_ofsted_rating("Outstanding"), Some(OfstedRating::Outstanding));
        assert_eq!(
            parse_ofsted_rating("Requires Improvement"),
            Some(OfstedRating::RequiresImprovement)
        );
        assert_eq!(parse_ofsted_rating("good"), Some(OfstedRating::Good));
        assert_eq!(parse_ofsted_rating("excellent"), None);
    }

    #[test]
    fn test_parse_grammar_status() {
        assert_eq!(parse_grammar_status("Yes"), Some(GrammarProximity::Yes));
        assert_eq!(parse_grammar_status("borderline"), Some(GrammarProximity::Possible));
        assert_eq!(parse_grammar_status("No"), Some(GrammarProximity::No));
        assert_eq!(parse_grammar_status("???"), None);
    }
}
