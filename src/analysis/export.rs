//! Export functions - serialize scored properties to tabular output

use crate::analysis::types::ScoredProperty;
use anyhow::Result;
use std::io::Write;
use tracing::info;

const COLUMNS: [&str; 24] = [
    "property_id",
    "price",
    "property_type",
    "bedrooms",
    "postcode",
    "outdoor_space",
    "tenure",
    "agent_name",
    "agent_phone",
    "description",
    "commute_minutes",
    "distance_to_station_km",
    "nearest_school_ofsted",
    "grammar_school_proximity",
    "added_at",
    "processed_at",
    "total_score",
    "price_score",
    "commute_score",
    "type_score",
    "bedroom_score",
    "outdoor_score",
    "school_score",
    "grammar_bonus",
];

/// Write scored properties as CSV, one row per property, scores included.
/// Returns the number of rows written.
pub fn write_csv<W: Write>(writer: W, properties: &[ScoredProperty]) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(COLUMNS)?;

    for property in properties {
        let record = &property.record;
        let scores = &property.scores;

        csv_writer.write_record([
            record.property_id.clone(),
            record.price.to_string(),
            record.property_type.to_string(),
            record.bedrooms.to_string(),
            record.postcode.clone(),
            record.outdoor_space.clone().unwrap_or_default(),
            record.tenure.clone().unwrap_or_default(),
            record.agent_name.clone().unwrap_or_default(),
            record.agent_phone.clone().unwrap_or_default(),
            record.description.clone().unwrap_or_default(),
            record
                .commute_minutes
                .map(|m| m.to_string())
                .unwrap_or_default(),
            record
                .distance_to_station_km
                .map(|d| d.to_string())
                .unwrap_or_default(),
            record
                .nearest_school_ofsted
                .map(|r| r.to_string())
                .unwrap_or_default(),
            record
                .grammar_school_proximity
                .map(|g| g.to_string())
                .unwrap_or_default(),
            record.added_at.to_rfc3339(),
            property.processed_at.to_rfc3339(),
            format!("{:.1}", scores.total_score),
            format!("{:.1}", scores.price_score),
            format!("{:.1}", scores.commute_score),
            format!("{:.1}", scores.type_score),
            format!("{:.1}", scores.bedroom_score),
            format!("{:.1}", scores.outdoor_score),
            format!("{:.1}", scores.school_score),
            format!("{:.1}", scores.grammar_bonus),
        ])?;
    }

    csv_writer.flush()?;
    info!("exported {} scored properties", properties.len());
    Ok(properties.len())
}
