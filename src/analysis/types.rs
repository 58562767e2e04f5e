//! Core data types for the analysis pipeline
//! Pure data structures with no behavior

use crate::analysis::error::ValidationError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw property input as delivered by manual entry, a scrape result, or a
/// tabular import. Everything arrives as text - coercion belongs to the
/// validator, not the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProperty {
    pub property_id: Option<String>,
    pub price: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<String>,
    pub postcode: Option<String>,
    pub outdoor_space: Option<String>,
    pub tenure: Option<String>,
    pub agent_name: Option<String>,
    pub agent_phone: Option<String>,
    pub description: Option<String>,

    // Derived fields a caller may supply up front. Enrichment never
    // overwrites these.
    pub commute_minutes: Option<String>,
    pub distance_to_station_km: Option<String>,
    pub nearest_school_ofsted: Option<String>,
    pub grammar_school_proximity: Option<String>,
}

/// Canonical property types, normalized from free text during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Detached,
    SemiDetached,
    Terraced,
    EndOfTerrace,
    Townhouse,
    House,
    Bungalow,
    Cottage,
    Maisonette,
    Penthouse,
    Flat,
    Studio,
    Other,
}

impl PropertyType {
    /// Canonical display label, title case as stored in exports
    pub const fn label(self) -> &'static str {
        match self {
            PropertyType::Detached => "Detached House",
            PropertyType::SemiDetached => "Semi-Detached House",
            PropertyType::Terraced => "Terraced House",
            PropertyType::EndOfTerrace => "End of Terrace",
            PropertyType::Townhouse => "Townhouse",
            PropertyType::House => "House",
            PropertyType::Bungalow => "Bungalow",
            PropertyType::Cottage => "Cottage",
            PropertyType::Maisonette => "Maisonette",
            PropertyType::Penthouse => "Penthouse",
            PropertyType::Flat => "Flat",
            PropertyType::Studio => "Studio",
            PropertyType::Other => "Other",
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ofsted inspection grades for the nearest school
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfstedRating {
    Outstanding,
    Good,
    RequiresImprovement,
    Inadequate,
    Unknown,
}

impl OfstedRating {
    pub const fn label(self) -> &'static str {
        match self {
            OfstedRating::Outstanding => "Outstanding",
            OfstedRating::Good => "Good",
            OfstedRating::RequiresImprovement => "Requires Improvement",
            OfstedRating::Inadequate => "Inadequate",
            OfstedRating::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for OfstedRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Grammar school catchment status for a postcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarProximity {
    Yes,
    Possible,
    No,
}

impl GrammarProximity {
    pub const fn label(self) -> &'static str {
        match self {
            GrammarProximity::Yes => "Yes",
            GrammarProximity::Possible => "Possible",
            GrammarProximity::No => "No",
        }
    }
}

impl std::fmt::Display for GrammarProximity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Cleaned property record - only the validator constructs these
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    // Core identification
    pub property_id: String,
    pub postcode: String,

    // Property attributes
    pub price: i64,
    pub property_type: PropertyType,
    pub bedrooms: u32,
    pub outdoor_space: Option<String>,

    // Free-form optional details
    pub tenure: Option<String>,
    pub agent_name: Option<String>,
    pub agent_phone: Option<String>,
    pub description: Option<String>,

    // Derived fields - populated by the enricher unless the caller
    // supplied them
    pub commute_minutes: Option<u32>,
    pub distance_to_station_km: Option<Decimal>,
    pub nearest_school_ofsted: Option<OfstedRating>,
    pub grammar_school_proximity: Option<GrammarProximity>,

    pub added_at: DateTime<Utc>,
}

impl PropertyRecord {
    /// Project back to the raw input shape, e.g. for re-validation after an
    /// external edit. Timestamps are not part of the raw shape.
    pub fn to_raw(&self) -> RawProperty {
        RawProperty {
            property_id: Some(self.property_id.clone()),
            price: Some(self.price.to_string()),
            property_type: Some(self.property_type.label().to_string()),
            bedrooms: Some(self.bedrooms.to_string()),
            postcode: Some(self.postcode.clone()),
            outdoor_space: self.outdoor_space.clone(),
            tenure: self.tenure.clone(),
            agent_name: self.agent_name.clone(),
            agent_phone: self.agent_phone.clone(),
            description: self.description.clone(),
            commute_minutes: self.commute_minutes.map(|m| m.to_string()),
            distance_to_station_km: self.distance_to_station_km.map(|d| d.to_string()),
            nearest_school_ofsted: self.nearest_school_ofsted.map(|r| r.label().to_string()),
            grammar_school_proximity: self
                .grammar_school_proximity
                .map(|g| g.label().to_string()),
        }
    }
}

/// The seven weighted sub-scores plus their sum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub price_score: f64,
    pub commute_score: f64,
    pub type_score: f64,
    pub bedroom_score: f64,
    pub outdoor_score: f64,
    pub school_score: f64,
    pub grammar_bonus: f64,
    /// Always the exact sum of the seven sub-scores - no hidden
    /// normalization
    pub total_score: f64,
}

/// A record that made it through the full pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredProperty {
    pub record: PropertyRecord,
    pub scores: ScoreBreakdown,
    pub warnings: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

/// Per-record pipeline outcome. Invalid records carry their errors as data;
/// score fields are structurally absent, so "not scored" can never be
/// mistaken for "scored zero".
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Scored(ScoredProperty),
    Invalid {
        raw: RawProperty,
        errors: Vec<ValidationError>,
        warnings: Vec<String>,
    },
}

impl ProcessOutcome {
    pub fn is_scored(&self) -> bool {
        matches!(self, ProcessOutcome::Scored(_))
    }

    pub fn as_scored(&self) -> Option<&ScoredProperty> {
        match self {
            ProcessOutcome::Scored(scored) => Some(scored),
            ProcessOutcome::Invalid { .. } => None,
        }
    }
}

/// Batch processing statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchStats {
    pub scored: usize,
    pub invalid: usize,
    pub with_warnings: usize,
}

impl BatchStats {
    pub fn summarize(outcomes: &[ProcessOutcome]) -> Self {
        let mut stats = BatchStats::default();
        for outcome in outcomes {
            match outcome {
                ProcessOutcome::Scored(scored) => {
                    stats.scored += 1;
                    if !scored.warnings.is_empty() {
                        stats.with_warnings += 1;
                    }
                }
                ProcessOutcome::Invalid { warnings, .. } => {
                    stats.invalid += 1;
                    if !warnings.is_empty() {
                        stats.with_warnings += 1;
                    }
                }
            }
        }
        stats
    }
}

impl std::fmt::Display for BatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "scored: {}, invalid: {}, with warnings: {}",
            self.scored, self.invalid, self.with_warnings
        )
    }
}
