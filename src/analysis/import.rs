//! Import functions - turn tabular files into raw property rows

use crate::analysis::types::RawProperty;
use anyhow::Result;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::{info, warn};
use uuid::Uuid;

/// Headers a bulk import must carry; everything else is optional
const REQUIRED_COLUMNS: [&str; 4] = ["price", "property_type", "bedrooms", "postcode"];

/// Read raw properties from CSV. Column names follow the `RawProperty` field
/// names; rows without a `property_id` get a generated one. Rows that fail to
/// deserialize are logged and skipped - a bad row never aborts the import.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawProperty>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut parse_errors = 0;

    for (idx, result) in csv_reader.deserialize::<RawProperty>().enumerate() {
        match result {
            Ok(row) => rows.push(ensure_property_id(row)),
            Err(e) => {
                parse_errors += 1;
                if parse_errors <= 10 {
                    // Only log first 10 errors
                    warn!("failed to deserialize row {}: {}", idx, e);
                }
            }
        }
    }

    info!("read {} property rows from CSV ({} errors)", rows.len(), parse_errors);
    Ok(rows)
}

/// Read raw properties from the first sheet of an XLSX workbook. The header
/// row maps columns by name; string, integer, and float cells are all
/// accepted as text.
pub fn read_xlsx(bytes: &[u8]) -> Result<Vec<RawProperty>> {
    info!("parsing XLSX import ({} bytes)", bytes.len());

    let cursor = Cursor::new(bytes);
    let mut workbook = open_workbook_auto_from_rs(cursor)?;

    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(anyhow::anyhow!("No sheets found in workbook"));
    }

    let sheet_name = sheet_names[0].clone();
    let range = workbook.worksheet_range(&sheet_name)?;
    let mut row_iter = range.rows();

    let headers: HashMap<String, usize> = match row_iter.next() {
        Some(header_row) => header_row
            .iter()
            .enumerate()
            .filter_map(|(idx, cell)| cell_text(cell).map(|name| (normalize_header(&name), idx)))
            .collect(),
        None => return Err(anyhow::anyhow!("Workbook sheet '{}' is empty", sheet_name)),
    };

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.contains_key(**column))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(anyhow::anyhow!(
            "Missing required columns: {}",
            missing.join(", ")
        ));
    }

    let column = |row: &[Data], name: &str| -> Option<String> {
        headers.get(name).and_then(|idx| row.get(*idx)).and_then(cell_text)
    };

    let mut rows = Vec::new();
    for row in row_iter {
        let raw = RawProperty {
            property_id: column(row, "property_id"),
            price: column(row, "price"),
            property_type: column(row, "property_type"),
            bedrooms: column(row, "bedrooms"),
            postcode: column(row, "postcode"),
            outdoor_space: column(row, "outdoor_space"),
            tenure: column(row, "tenure"),
            agent_name: column(row, "agent_name"),
            agent_phone: column(row, "agent_phone"),
            description: column(row, "description"),
            commute_minutes: column(row, "commute_minutes"),
            distance_to_station_km: column(row, "distance_to_station_km"),
            nearest_school_ofsted: column(row, "nearest_school_ofsted"),
            grammar_school_proximity: column(row, "grammar_school_proximity"),
        };

        // Skip rows that are entirely blank
        if raw == RawProperty::default() {
            continue;
        }
        rows.push(ensure_property_id(raw));
    }

    info!("read {} property rows from XLSX", rows.len());
    Ok(rows)
}

fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                Some(format!("{:.0}", f))
            } else {
                Some(f.to_string())
            }
        }
        Data::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn ensure_property_id(mut raw: RawProperty) -> RawProperty {
    let blank = raw
        .property_id
        .as_deref()
        .map(|id| id.trim().is_empty())
        .unwrap_or(true);
    if blank {
        raw.property_id = Some(Uuid::new_v4().to_string());
    }
    raw
}
