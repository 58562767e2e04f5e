//! Validation - checks and normalizes raw property input into typed records

use crate::analysis::error::ValidationError;
use crate::analysis::types::{PropertyRecord, PropertyType, RawProperty};
use crate::analysis::utils::{
    is_valid_postcode, normalize_postcode, parse_grammar_status, parse_ofsted_rating, parse_price,
    parse_property_type,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Plausibility bands for warning-level checks. These never invalidate a
/// record, they only flag values worth a second look.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorLimits {
    pub price_floor: i64,
    pub price_ceiling: i64,
    pub max_bedrooms: u32,
}

impl Default for ValidatorLimits {
    fn default() -> Self {
        ValidatorLimits {
            price_floor: 50_000,
            price_ceiling: 50_000_000,
            max_bedrooms: 10,
        }
    }
}

/// Result of validating one raw property. `record` is present exactly when
/// there are no errors; warnings never block scoring.
#[derive(Debug, Clone)]
pub struct Validation {
    pub record: Option<PropertyRecord>,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate and clean a raw property. Pure function of its input: errors and
/// warnings come back as data, and a record is only built when every hard
/// check passes.
pub fn validate(raw: &RawProperty, limits: &ValidatorLimits) -> Validation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Required-field presence. Whitespace-only counts as missing.
    let property_id = required(&raw.property_id, "property_id", &mut errors);
    let price_text = required(&raw.price, "price", &mut errors);
    let bedrooms_text = required(&raw.bedrooms, "bedrooms", &mut errors);
    let postcode_text = required(&raw.postcode, "postcode", &mut errors);
    let type_text = required(&raw.property_type, "property_type", &mut errors);

    let price = price_text.and_then(|text| match parse_price(text) {
        Some(amount) if amount > 0 => {
            if amount < limits.price_floor {
                warnings.push(format!("price £{amount} seems very low"));
            } else if amount > limits.price_ceiling {
                warnings.push(format!("price £{amount} seems very high"));
            }
            Some(amount)
        }
        _ => {
            errors.push(ValidationError::InvalidPrice {
                value: text.to_string(),
            });
            None
        }
    });

    let bedrooms = bedrooms_text.and_then(|text| match parse_bedrooms(text) {
        Some(count) => {
            let clamped = if count < 0 {
                warnings.push("bedrooms cannot be negative".to_string());
                0
            } else {
                count as u32
            };
            if clamped > limits.max_bedrooms {
                warnings.push(format!("very high number of bedrooms ({clamped})"));
            }
            Some(clamped)
        }
        None => {
            errors.push(ValidationError::InvalidBedroomCount {
                value: text.to_string(),
            });
            None
        }
    });

    // Shape check only applies to a non-empty postcode; absence was already
    // reported as a missing field.
    let postcode = postcode_text.and_then(|text| {
        let normalized = normalize_postcode(text);
        if is_valid_postcode(&normalized) {
            Some(normalized)
        } else {
            errors.push(ValidationError::InvalidPostcodeFormat {
                value: text.to_string(),
            });
            None
        }
    });

    let property_type = type_text.map(|text| {
        let parsed = parse_property_type(text);
        if parsed == PropertyType::Other {
            warnings.push(format!("unusual property type: '{}'", text.trim()));
        } else if !text.trim().eq_ignore_ascii_case(parsed.label()) {
            debug!("mapped property type '{}' to '{}'", text.trim(), parsed);
            warnings.push(format!(
                "property type mapped from '{}' to '{}'",
                text.trim(),
                parsed
            ));
        }
        parsed
    });

    let commute_minutes = lenient_u32(&raw.commute_minutes, "commute_minutes", &mut warnings);
    let distance_to_station_km = lenient_decimal(
        &raw.distance_to_station_km,
        "distance_to_station_km",
        &mut warnings,
    );

    let nearest_school_ofsted = trimmed(&raw.nearest_school_ofsted).and_then(|text| {
        let rating = parse_ofsted_rating(text);
        if rating.is_none() {
            warnings.push(format!("unrecognized Ofsted rating: '{text}'"));
        }
        rating
    });

    let grammar_school_proximity = trimmed(&raw.grammar_school_proximity).and_then(|text| {
        let status = parse_grammar_status(text);
        if status.is_none() {
            warnings.push(format!("unrecognized grammar school status: '{text}'"));
        }
        status
    });

    let record = match (property_id, price, bedrooms, postcode.as_deref(), property_type) {
        (Some(id), Some(price), Some(bedrooms), Some(postcode), Some(property_type))
            if errors.is_empty() =>
        {
            Some(PropertyRecord {
                property_id: id.to_string(),
                postcode: postcode.to_string(),
                price,
                property_type,
                bedrooms,
                outdoor_space: trimmed(&raw.outdoor_space).map(str::to_string),
                tenure: trimmed(&raw.tenure).map(str::to_string),
                agent_name: trimmed(&raw.agent_name).map(str::to_string),
                agent_phone: trimmed(&raw.agent_phone).map(str::to_string),
                description: trimmed(&raw.description).map(str::to_string),
                commute_minutes,
                distance_to_station_km,
                nearest_school_ofsted,
                grammar_school_proximity,
                added_at: Utc::now(),
            })
        }
        _ => None,
    };

    Validation {
        record,
        errors,
        warnings,
    }
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn required<'a>(
    value: &'a Option<String>,
    field: &'static str,
    errors: &mut Vec<ValidationError>,
) -> Option<&'a str> {
    match trimmed(value) {
        Some(text) => Some(text),
        None => {
            errors.push(ValidationError::MissingField { field });
            None
        }
    }
}

/// Whole numbers only, but tolerate spreadsheet floats like "3.0"
fn parse_bedrooms(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(count) = trimmed.parse::<i64>() {
        return Some(count);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value.is_finite() => Some(value as i64),
        _ => None,
    }
}

fn lenient_u32(value: &Option<String>, field: &str, warnings: &mut Vec<String>) -> Option<u32> {
    trimmed(value).and_then(|text| match text.parse::<f64>() {
        Ok(number) if number.is_finite() && number >= 0.0 => Some(number.round() as u32),
        _ => {
            warnings.push(format!("invalid {field}: '{text}'"));
            None
        }
    })
}

fn lenient_decimal(value: &Option<String>, field: &str, warnings: &mut Vec<String>) -> Option<Decimal> {
    trimmed(value).and_then(|text| match Decimal::from_str(text) {
        Ok(number) if number >= Decimal::ZERO => Some(number),
        _ => {
            warnings.push(format!("invalid {field}: '{text}'"));
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::{GrammarProximity, OfstedRating};

    fn raw_property() -> RawProperty {
        RawProperty {
            property_id: Some("prop-001".to_string()),
            price: Some("£350,000".to_string()),
            property_type: Some("Apartment".to_string()),
            bedrooms: Some("2".to_string()),
            postcode: Some("se1 9sp".to_string()),
            outdoor_space: Some("  Balcony ".to_string()),
            tenure: Some("Leasehold".to_string()),
            ..RawProperty::default()
        }
    }

    #[test]
    fn test_validate_cleans_fields() {
        let result = validate(&raw_property(), &ValidatorLimits::default());

        assert!(result.is_valid());
        let record = result.record.unwrap();
        assert_eq!(record.price, 350_000);
        assert_eq!(record.postcode, "SE1 9SP");
        assert_eq!(record.property_type, PropertyType::Flat);
        assert_eq!(record.bedrooms, 2);
        assert_eq!(record.outdoor_space.as_deref(), Some("Balcony"));

        // Apartment -> Flat is reported as a warning, not an error
        assert!(result.warnings.iter().any(|w| w.contains("mapped")));
    }

    #[test]
    fn test_missing_required_fields() {
        let raw = RawProperty {
            property_id: Some("prop-002".to_string()),
            price: Some("  ".to_string()),
            ..RawProperty::default()
        };

        let result = validate(&raw, &ValidatorLimits::default());

        assert!(!result.is_valid());
        assert!(result.record.is_none());
        let missing: Vec<_> = result
            .errors
            .iter()
            .filter_map(|e| match e {
                ValidationError::MissingField { field } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["price", "bedrooms", "postcode", "property_type"]);
    }

    #[test]
    fn test_invalid_price() {
        let mut raw = raw_property();
        raw.price = Some("POA".to_string());

        let result = validate(&raw, &ValidatorLimits::default());

        assert!(!result.is_valid());
        assert!(matches!(
            result.errors[0],
            ValidationError::InvalidPrice { .. }
        ));
    }

    #[test]
    fn test_non_positive_price_is_error() {
        let mut raw = raw_property();
        raw.price = Some("-5".to_string());

        let result = validate(&raw, &ValidatorLimits::default());
        assert!(!result.is_valid());
    }

    #[test]
    fn test_malformed_postcode() {
        let mut raw = raw_property();
        raw.postcode = Some("not a postcode".to_string());

        let result = validate(&raw, &ValidatorLimits::default());

        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidPostcodeFormat { .. })));
    }

    #[test]
    fn test_negative_bedrooms_clamp_to_zero() {
        let mut raw = raw_property();
        raw.bedrooms = Some("-2".to_string());

        let result = validate(&raw, &ValidatorLimits::default());

        assert!(result.is_valid());
        assert_eq!(result.record.unwrap().bedrooms, 0);
        assert!(result.warnings.iter().any(|w| w.contains("negative")));
    }

    #[test]
    fn test_price_plausibility_warning() {
        let mut raw = raw_property();
        raw.price = Some("£60,000,000".to_string());

        let result = validate(&raw, &ValidatorLimits::default());

        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.contains("very high")));
    }

    #[test]
    fn test_derived_fields_coerced_leniently() {
        let mut raw = raw_property();
        raw.commute_minutes = Some("35".to_string());
        raw.distance_to_station_km = Some("0.8".to_string());
        raw.nearest_school_ofsted = Some("Outstanding".to_string());
        raw.grammar_school_proximity = Some("Possible".to_string());

        let record = validate(&raw, &ValidatorLimits::default()).record.unwrap();

        assert_eq!(record.commute_minutes, Some(35));
        assert_eq!(
            record.distance_to_station_km,
            Some(Decimal::from_str("0.8").unwrap())
        );
        assert_eq!(record.nearest_school_ofsted, Some(OfstedRating::Outstanding));
        assert_eq!(
            record.grammar_school_proximity,
            Some(GrammarProximity::Possible)
        );
    }

    #[test]
    fn test_bad_derived_field_warns_but_keeps_record_valid() {
        let mut raw = raw_property();
        raw.commute_minutes = Some("soon".to_string());

        let result = validate(&raw, &ValidatorLimits::default());

        assert!(result.is_valid());
        assert_eq!(result.record.unwrap().commute_minutes, None);
        assert!(result.warnings.iter().any(|w| w.contains("commute_minutes")));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let limits = ValidatorLimits::default();
        let first = validate(&raw_property(), &limits);
        let record = first.record.unwrap();

        let second = validate(&record.to_raw(), &limits);
        assert!(second.is_valid());
        let reclean = second.record.unwrap();

        // Identical apart from the fresh added_at timestamp
        assert_eq!(reclean.property_id, record.property_id);
        assert_eq!(reclean.price, record.price);
        assert_eq!(reclean.property_type, record.property_type);
        assert_eq!(reclean.bedrooms, record.bedrooms);
        assert_eq!(reclean.postcode, record.postcode);
        assert_eq!(reclean.outdoor_space, record.outdoor_space);

        // Canonical input produces no mapping warnings the second time round
        assert!(second.warnings.is_empty());
    }
}
