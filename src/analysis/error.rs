//! Typed errors for validation, configuration, lookups, and the collection

use thiserror::Error;

/// Per-record validation failures. Returned as data, never raised, so a bad
/// row in a bulk import cannot abort the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid price: '{value}'")]
    InvalidPrice { value: String },

    #[error("invalid bedroom count: '{value}'")]
    InvalidBedroomCount { value: String },

    #[error("invalid postcode format: '{value}'")]
    InvalidPostcodeFormat { value: String },
}

impl ValidationError {
    /// The record field this error refers to, for per-field reporting.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField { field } => field,
            ValidationError::InvalidPrice { .. } => "price",
            ValidationError::InvalidBedroomCount { .. } => "bedrooms",
            ValidationError::InvalidPostcodeFormat { .. } => "postcode",
        }
    }
}

/// Invalid scoring/pipeline configuration. Rejected at pipeline construction,
/// before any record is processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("budget_min ({min}) must be less than budget_max ({max})")]
    BudgetRange { min: i64, max: i64 },

    #[error("budget bounds must be positive (got min {min})")]
    NonPositiveBudget { min: i64 },

    #[error("scoring weight '{name}' must be positive (got {value})")]
    NonPositiveWeight { name: &'static str, value: f64 },

    #[error("{category} tier table is empty")]
    EmptyTierTable { category: &'static str },

    #[error("{category} band ceilings must be strictly ascending")]
    NonAscendingBands { category: &'static str },

    #[error("max_workers must be at least 1")]
    NoWorkers,

    #[error("lookup timeout must be non-zero")]
    ZeroLookupTimeout,
}

/// Failures from the external location lookup collaborator. Always absorbed
/// by the enricher, which degrades the affected field to a sentinel default.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("lookup timed out")]
    Timeout,

    #[error("no data for postcode '{postcode}'")]
    NoData { postcode: String },
}

/// Caller errors against the session collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("property '{property_id}' already exists in the collection")]
    DuplicateId { property_id: String },

    #[error("property '{property_id}' not found")]
    NotFound { property_id: String },
}
