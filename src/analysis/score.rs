//! Scoring - seven weighted, individually bounded sub-scores over
//! configurable threshold tables. Scoring is total: every input path has a
//! default branch and nothing here ever fails.

use crate::analysis::enrich::FALLBACK_COMMUTE_MINUTES;
use crate::analysis::error::ConfigError;
use crate::analysis::types::{
    GrammarProximity, OfstedRating, PropertyRecord, ScoreBreakdown,
};
use serde::{Deserialize, Serialize};

/// Documented per-category maxima. Sub-scores are clamped to these even if a
/// misconfigured weight would push them outside.
pub const MAX_PRICE_POINTS: f64 = 20.0;
pub const MAX_COMMUTE_POINTS: f64 = 20.0;
pub const MAX_TYPE_POINTS: f64 = 15.0;
pub const MAX_BEDROOM_POINTS: f64 = 15.0;
pub const MAX_OUTDOOR_POINTS: f64 = 10.0;
pub const MAX_SCHOOL_POINTS: f64 = 10.0;
pub const MAX_GRAMMAR_POINTS: f64 = 10.0;

// Weight scaling is relative to the shipped weights, so default weights
// reproduce the raw tier tables exactly.
const DEFAULT_PRICE_WEIGHT: f64 = 0.20;
const DEFAULT_COMMUTE_WEIGHT: f64 = 0.20;
const DEFAULT_TYPE_WEIGHT: f64 = 0.15;
const DEFAULT_BEDROOM_WEIGHT: f64 = 0.15;
const DEFAULT_OUTDOOR_WEIGHT: f64 = 0.10;
const DEFAULT_SCHOOL_WEIGHT: f64 = 0.10;
const DEFAULT_GRAMMAR_WEIGHT: f64 = 0.10;

/// Relative importance of each category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub price: f64,
    pub commute: f64,
    pub property_type: f64,
    pub bedrooms: f64,
    pub outdoor_space: f64,
    pub schools: f64,
    pub grammar_bonus: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        CategoryWeights {
            price: DEFAULT_PRICE_WEIGHT,
            commute: DEFAULT_COMMUTE_WEIGHT,
            property_type: DEFAULT_TYPE_WEIGHT,
            bedrooms: DEFAULT_BEDROOM_WEIGHT,
            outdoor_space: DEFAULT_OUTDOOR_WEIGHT,
            schools: DEFAULT_SCHOOL_WEIGHT,
            grammar_bonus: DEFAULT_GRAMMAR_WEIGHT,
        }
    }
}

/// Price band with an *exclusive* ceiling: the band applies to prices
/// strictly below it. Bands are scanned in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub ceiling: i64,
    pub points: f64,
}

/// Commute band with an inclusive ceiling in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommuteBand {
    pub ceiling_minutes: u32,
    pub points: f64,
}

/// The two shipped bedroom-scoring shapes. Neither is the single truth -
/// the source history carried both, so both remain selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedroomRule {
    /// Stepped table relative to the minimum: one above or better is full
    /// marks, each bedroom short drops steeply.
    #[default]
    Graded,
    /// Two above the minimum for full marks; below the minimum scores three
    /// points per bedroom.
    RelativeToMinimum,
}

/// Points per Ofsted grade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchoolPoints {
    pub outstanding: f64,
    pub good: f64,
    pub requires_improvement: f64,
    pub inadequate: f64,
    pub unknown: f64,
}

impl Default for SchoolPoints {
    fn default() -> Self {
        SchoolPoints {
            outstanding: 10.0,
            good: 8.0,
            requires_improvement: 5.0,
            inadequate: 2.0,
            unknown: 6.0,
        }
    }
}

/// Points per grammar catchment status
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrammarPoints {
    pub yes: f64,
    pub possible: f64,
    pub no: f64,
}

impl Default for GrammarPoints {
    fn default() -> Self {
        GrammarPoints {
            yes: 10.0,
            possible: 5.0,
            no: 0.0,
        }
    }
}

/// Complete scoring configuration. Every threshold table is caller-tunable;
/// `Default` ships the reference thresholds (budget £300k-£420k, 3 bedrooms,
/// 60 minute commute cap).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub budget_min: i64,
    pub budget_max: i64,
    pub min_bedrooms: u32,
    pub max_commute_minutes: u32,
    pub weights: CategoryWeights,
    pub bedroom_rule: BedroomRule,

    /// Ascending exclusive-ceiling bands; prices below `budget_min` score
    /// `below_budget_points` instead, prices past the last ceiling score 0.
    pub price_bands: Vec<PriceBand>,
    pub below_budget_points: f64,

    /// Ascending inclusive-ceiling bands; commutes past the last score 0
    pub commute_bands: Vec<CommuteBand>,

    /// Ordered keyword tables - first matching entry wins, deterministically
    pub type_points: Vec<(String, f64)>,
    pub type_default_points: f64,
    pub outdoor_points: Vec<(String, f64)>,
    pub outdoor_default_points: f64,

    pub school_points: SchoolPoints,
    pub grammar_points: GrammarPoints,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig::for_budget(300_000, 420_000, 3, 60)
    }
}

impl ScoringConfig {
    /// Build a configuration for a budget range, deriving the price bands
    /// proportionally and the commute bands from the commute cap. The
    /// reference budget (300k-420k) reproduces the shipped tier boundaries
    /// exactly: 350k / 380k / 420k / 450k.
    pub fn for_budget(
        budget_min: i64,
        budget_max: i64,
        min_bedrooms: u32,
        max_commute_minutes: u32,
    ) -> Self {
        let range = (budget_max - budget_min).max(0);
        let price_bands = vec![
            PriceBand {
                ceiling: budget_min + range * 5 / 12,
                points: 20.0,
            },
            PriceBand {
                ceiling: budget_min + range * 2 / 3,
                points: 15.0,
            },
            PriceBand {
                ceiling: budget_max,
                points: 10.0,
            },
            PriceBand {
                ceiling: budget_max + range / 4,
                points: 5.0,
            },
        ];

        let tier_points = [20.0, 15.0, 10.0];
        let mut commute_bands: Vec<CommuteBand> = [30u32, 40, 50]
            .iter()
            .filter(|ceiling| **ceiling < max_commute_minutes)
            .enumerate()
            .map(|(idx, ceiling)| CommuteBand {
                ceiling_minutes: *ceiling,
                points: tier_points.get(idx).copied().unwrap_or(5.0),
            })
            .collect();
        commute_bands.push(CommuteBand {
            ceiling_minutes: max_commute_minutes,
            points: 5.0,
        });

        ScoringConfig {
            budget_min,
            budget_max,
            min_bedrooms,
            max_commute_minutes,
            weights: CategoryWeights::default(),
            bedroom_rule: BedroomRule::default(),
            price_bands,
            below_budget_points: 18.0,
            commute_bands,
            type_points: default_type_points(),
            type_default_points: 7.0,
            outdoor_points: default_outdoor_points(),
            outdoor_default_points: 3.0,
            school_points: SchoolPoints::default(),
            grammar_points: GrammarPoints::default(),
        }
    }

    /// Fail-fast sanity checks, run before any record is processed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget_min <= 0 {
            return Err(ConfigError::NonPositiveBudget {
                min: self.budget_min,
            });
        }
        if self.budget_min >= self.budget_max {
            return Err(ConfigError::BudgetRange {
                min: self.budget_min,
                max: self.budget_max,
            });
        }

        let weights = [
            ("price", self.weights.price),
            ("commute", self.weights.commute),
            ("property_type", self.weights.property_type),
            ("bedrooms", self.weights.bedrooms),
            ("outdoor_space", self.weights.outdoor_space),
            ("schools", self.weights.schools),
            ("grammar_bonus", self.weights.grammar_bonus),
        ];
        for (name, value) in weights {
            if value <= 0.0 || !value.is_finite() {
                return Err(ConfigError::NonPositiveWeight { name, value });
            }
        }

        if self.price_bands.is_empty() {
            return Err(ConfigError::EmptyTierTable { category: "price" });
        }
        if !self.price_bands.windows(2).all(|w| w[0].ceiling < w[1].ceiling) {
            return Err(ConfigError::NonAscendingBands { category: "price" });
        }

        if self.commute_bands.is_empty() {
            return Err(ConfigError::EmptyTierTable { category: "commute" });
        }
        if !self
            .commute_bands
            .windows(2)
            .all(|w| w[0].ceiling_minutes < w[1].ceiling_minutes)
        {
            return Err(ConfigError::NonAscendingBands { category: "commute" });
        }

        if self.type_points.is_empty() {
            return Err(ConfigError::EmptyTierTable {
                category: "property_type",
            });
        }
        if self.outdoor_points.is_empty() {
            return Err(ConfigError::EmptyTierTable {
                category: "outdoor_space",
            });
        }

        Ok(())
    }
}

/// Keyword table order is significant: specific variants come before the
/// generic keywords they contain, and the first match wins.
fn default_type_points() -> Vec<(String, f64)> {
    [
        ("semi-detached", 12.0),
        ("end of terrace", 11.0),
        ("terraced", 10.0),
        ("detached", 15.0),
        ("townhouse", 12.0),
        ("bungalow", 13.0),
        ("cottage", 10.0),
        ("maisonette", 8.0),
        ("penthouse", 8.0),
        ("studio", 2.0),
        ("flat", 5.0),
        ("apartment", 5.0),
    ]
    .into_iter()
    .map(|(keyword, points)| (keyword.to_string(), points))
    .collect()
}

fn default_outdoor_points() -> Vec<(String, f64)> {
    [
        ("large garden", 10.0),
        ("big garden", 10.0),
        ("spacious garden", 10.0),
        ("garden", 8.0),
        ("yard", 8.0),
        ("patio", 8.0),
        ("courtyard", 6.0),
        ("terrace", 6.0),
        ("balcony", 4.0),
        ("none", 0.0),
        ("no", 0.0),
        ("n/a", 0.0),
    ]
    .into_iter()
    .map(|(keyword, points)| (keyword.to_string(), points))
    .collect()
}

/// Compute the full breakdown for a validated (ideally enriched) record.
/// `total_score` is the exact sum of the seven clamped sub-scores.
pub fn score(record: &PropertyRecord, config: &ScoringConfig) -> ScoreBreakdown {
    let price_score = clamp(
        price_points(record.price, config) * (config.weights.price / DEFAULT_PRICE_WEIGHT),
        MAX_PRICE_POINTS,
    );

    let commute = record
        .commute_minutes
        .unwrap_or(FALLBACK_COMMUTE_MINUTES);
    let commute_score = clamp(
        commute_points(commute, config) * (config.weights.commute / DEFAULT_COMMUTE_WEIGHT),
        MAX_COMMUTE_POINTS,
    );

    let type_score = clamp(
        type_points(record, config) * (config.weights.property_type / DEFAULT_TYPE_WEIGHT),
        MAX_TYPE_POINTS,
    );

    let bedroom_score = clamp(
        bedroom_points(record.bedrooms, config)
            * (config.weights.bedrooms / DEFAULT_BEDROOM_WEIGHT),
        MAX_BEDROOM_POINTS,
    );

    let outdoor_score = clamp(
        outdoor_points(record.outdoor_space.as_deref(), config)
            * (config.weights.outdoor_space / DEFAULT_OUTDOOR_WEIGHT),
        MAX_OUTDOOR_POINTS,
    );

    let school_score = clamp(
        school_points(record.nearest_school_ofsted, config)
            * (config.weights.schools / DEFAULT_SCHOOL_WEIGHT),
        MAX_SCHOOL_POINTS,
    );

    let grammar_bonus = clamp(
        grammar_points(record.grammar_school_proximity, config)
            * (config.weights.grammar_bonus / DEFAULT_GRAMMAR_WEIGHT),
        MAX_GRAMMAR_POINTS,
    );

    ScoreBreakdown {
        price_score,
        commute_score,
        type_score,
        bedroom_score,
        outdoor_score,
        school_score,
        grammar_bonus,
        total_score: price_score
            + commute_score
            + type_score
            + bedroom_score
            + outdoor_score
            + school_score
            + grammar_bonus,
    }
}

fn clamp(value: f64, max: f64) -> f64 {
    value.clamp(0.0, max)
}

fn price_points(price: i64, config: &ScoringConfig) -> f64 {
    if price <= 0 {
        return 0.0;
    }
    if price < config.budget_min {
        return config.below_budget_points;
    }
    for band in &config.price_bands {
        if price < band.ceiling {
            return band.points;
        }
    }
    0.0
}

fn commute_points(minutes: u32, config: &ScoringConfig) -> f64 {
    for band in &config.commute_bands {
        if minutes <= band.ceiling_minutes {
            return band.points;
        }
    }
    0.0
}

fn type_points(record: &PropertyRecord, config: &ScoringConfig) -> f64 {
    let label = record.property_type.label().to_lowercase();
    for (keyword, points) in &config.type_points {
        if label.contains(keyword.as_str()) {
            return *points;
        }
    }
    config.type_default_points
}

fn bedroom_points(bedrooms: u32, config: &ScoringConfig) -> f64 {
    let min = config.min_bedrooms;
    match config.bedroom_rule {
        BedroomRule::Graded => {
            if bedrooms >= min + 1 {
                15.0
            } else if bedrooms == min {
                12.0
            } else if bedrooms + 1 == min {
                5.0
            } else if bedrooms + 2 == min {
                2.0
            } else {
                0.0
            }
        }
        BedroomRule::RelativeToMinimum => {
            if bedrooms >= min + 2 {
                15.0
            } else if bedrooms >= min + 1 {
                12.0
            } else if bedrooms >= min {
                8.0
            } else {
                (bedrooms * 3) as f64
            }
        }
    }
}

fn outdoor_points(outdoor_space: Option<&str>, config: &ScoringConfig) -> f64 {
    let text = match outdoor_space {
        Some(text) => text.to_lowercase(),
        None => return config.outdoor_default_points,
    };
    for (keyword, points) in &config.outdoor_points {
        if text.contains(keyword.as_str()) {
            return *points;
        }
    }
    config.outdoor_default_points
}

fn school_points(rating: Option<OfstedRating>, config: &ScoringConfig) -> f64 {
    let points = &config.school_points;
    match rating {
        Some(OfstedRating::Outstanding) => points.outstanding,
        Some(OfstedRating::Good) => points.good,
        Some(OfstedRating::RequiresImprovement) => points.requires_improvement,
        Some(OfstedRating::Inadequate) => points.inadequate,
        Some(OfstedRating::Unknown) | None => points.unknown,
    }
}

fn grammar_points(status: Option<GrammarProximity>, config: &ScoringConfig) -> f64 {
    let points = &config.grammar_points;
    match status {
        Some(GrammarProximity::Yes) => points.yes,
        Some(GrammarProximity::Possible) => points.possible,
        Some(GrammarProximity::No) | None => points.no,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::PropertyType;
    use chrono::Utc;

    fn mock_record() -> PropertyRecord {
        PropertyRecord {
            property_id: "test-123".to_string(),
            postcode: "SE9 1AA".to_string(),
            price: 350_000,
            property_type: PropertyType::SemiDetached,
            bedrooms: 3,
            outdoor_space: Some("Garden".to_string()),
            tenure: None,
            agent_name: None,
            agent_phone: None,
            description: None,
            commute_minutes: Some(25),
            distance_to_station_km: None,
            nearest_school_ofsted: Some(OfstedRating::Good),
            grammar_school_proximity: Some(GrammarProximity::No),
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_at_first_ceiling_lands_in_good_tier() {
        let config = ScoringConfig::default();
        let mut record = mock_record();
        record.price = 350_000;

        // The top tier is reserved for prices strictly below £350k
        let scores = score(&record, &config);
        assert_eq!(scores.price_score, 15.0);

        record.price = 349_999;
        assert_eq!(score(&record, &config).price_score, 20.0);
    }

    #[test]
    fn test_price_tiers() {
        let config = ScoringConfig::default();
        let mut record = mock_record();

        record.price = 250_000;
        assert_eq!(score(&record, &config).price_score, 18.0);

        record.price = 395_000;
        assert_eq!(score(&record, &config).price_score, 10.0);

        record.price = 430_000;
        assert_eq!(score(&record, &config).price_score, 5.0);

        record.price = 500_000;
        assert_eq!(score(&record, &config).price_score, 0.0);
    }

    #[test]
    fn test_excellent_commute() {
        let config = ScoringConfig::default();
        let mut record = mock_record();
        record.commute_minutes = Some(25);

        assert_eq!(score(&record, &config).commute_score, 20.0);
    }

    #[test]
    fn test_commute_tiers_and_missing_commute() {
        let config = ScoringConfig::default();
        let mut record = mock_record();

        record.commute_minutes = Some(40);
        assert_eq!(score(&record, &config).commute_score, 15.0);

        record.commute_minutes = Some(75);
        assert_eq!(score(&record, &config).commute_score, 0.0);

        // Missing commute scores as the 60-minute sentinel
        record.commute_minutes = None;
        assert_eq!(score(&record, &config).commute_score, 5.0);
    }

    #[test]
    fn test_bedrooms_below_requirement_never_reach_top_tier() {
        let mut config = ScoringConfig::default();
        let mut record = mock_record();
        record.bedrooms = 2;

        let graded = score(&record, &config).bedroom_score;
        assert_eq!(graded, 5.0);

        config.bedroom_rule = BedroomRule::RelativeToMinimum;
        let relative = score(&record, &config).bedroom_score;
        assert_eq!(relative, 6.0);

        for points in [graded, relative] {
            assert!(points < 8.0);
        }
    }

    #[test]
    fn test_bedroom_graded_tiers() {
        let config = ScoringConfig::default();
        let mut record = mock_record();

        record.bedrooms = 4;
        assert_eq!(score(&record, &config).bedroom_score, 15.0);
        record.bedrooms = 3;
        assert_eq!(score(&record, &config).bedroom_score, 12.0);
        record.bedrooms = 1;
        assert_eq!(score(&record, &config).bedroom_score, 2.0);
        record.bedrooms = 0;
        assert_eq!(score(&record, &config).bedroom_score, 0.0);
    }

    #[test]
    fn test_type_table_first_match_wins() {
        let config = ScoringConfig::default();
        let mut record = mock_record();

        // "Semi-Detached House" contains both "semi-detached" and "detached";
        // the earlier table entry decides
        record.property_type = PropertyType::SemiDetached;
        assert_eq!(score(&record, &config).type_score, 12.0);

        record.property_type = PropertyType::Detached;
        assert_eq!(score(&record, &config).type_score, 15.0);

        record.property_type = PropertyType::Studio;
        assert_eq!(score(&record, &config).type_score, 2.0);

        // Plain "House" matches no keyword and takes the neutral default
        record.property_type = PropertyType::House;
        assert_eq!(score(&record, &config).type_score, 7.0);
    }

    #[test]
    fn test_outdoor_space_buckets() {
        let config = ScoringConfig::default();
        let mut record = mock_record();

        record.outdoor_space = Some("Large garden with patio".to_string());
        assert_eq!(score(&record, &config).outdoor_score, 10.0);

        record.outdoor_space = Some("Balcony".to_string());
        assert_eq!(score(&record, &config).outdoor_score, 4.0);

        record.outdoor_space = Some("None".to_string());
        assert_eq!(score(&record, &config).outdoor_score, 0.0);

        record.outdoor_space = None;
        assert_eq!(score(&record, &config).outdoor_score, 3.0);
    }

    #[test]
    fn test_school_and_grammar_points() {
        let config = ScoringConfig::default();
        let mut record = mock_record();

        record.nearest_school_ofsted = Some(OfstedRating::Outstanding);
        assert_eq!(score(&record, &config).school_score, 10.0);

        record.nearest_school_ofsted = None;
        assert_eq!(score(&record, &config).school_score, 6.0);

        record.grammar_school_proximity = Some(GrammarProximity::Possible);
        let possible = score(&record, &config).grammar_bonus;
        assert_eq!(possible, 5.0);

        record.grammar_school_proximity = Some(GrammarProximity::Yes);
        let yes = score(&record, &config).grammar_bonus;
        assert_eq!(yes, possible * 2.0);
    }

    #[test]
    fn test_total_is_exact_sum_of_subscores() {
        let config = ScoringConfig::default();
        let scores = score(&mock_record(), &config);

        let sum = scores.price_score
            + scores.commute_score
            + scores.type_score
            + scores.bedroom_score
            + scores.outdoor_score
            + scores.school_score
            + scores.grammar_bonus;
        assert_eq!(scores.total_score, sum);
    }

    #[test]
    fn test_subscores_bounded_for_outlandish_input() {
        let config = ScoringConfig::default();
        let mut record = mock_record();
        record.price = -1_000_000;
        record.bedrooms = 1000;
        record.commute_minutes = Some(100_000);
        record.outdoor_space = Some("garden garden garden garden".to_string());

        let scores = score(&record, &config);
        assert!(scores.price_score >= 0.0 && scores.price_score <= MAX_PRICE_POINTS);
        assert!(scores.commute_score >= 0.0 && scores.commute_score <= MAX_COMMUTE_POINTS);
        assert!(scores.bedroom_score >= 0.0 && scores.bedroom_score <= MAX_BEDROOM_POINTS);
        assert!(scores.outdoor_score >= 0.0 && scores.outdoor_score <= MAX_OUTDOOR_POINTS);
        assert!(scores.total_score >= 0.0 && scores.total_score <= 100.0);
    }

    #[test]
    fn test_overweighted_category_still_clamped() {
        let mut config = ScoringConfig::default();
        config.weights.price = 0.8; // four times the default importance

        let mut record = mock_record();
        record.price = 310_000; // raw 20 points

        let scores = score(&record, &config);
        assert_eq!(scores.price_score, MAX_PRICE_POINTS);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_budget_rejected() {
        let config = ScoringConfig::for_budget(500_000, 400_000, 3, 60);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BudgetRange { .. })
        ));
    }

    #[test]
    fn test_zero_weight_rejected() {
        let mut config = ScoringConfig::default();
        config.weights.schools = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveWeight { name: "schools", .. })
        ));
    }

    #[test]
    fn test_for_budget_reproduces_reference_bands() {
        let config = ScoringConfig::for_budget(300_000, 420_000, 3, 60);
        let ceilings: Vec<i64> = config.price_bands.iter().map(|b| b.ceiling).collect();
        assert_eq!(ceilings, vec![350_000, 380_000, 420_000, 450_000]);

        let commute: Vec<u32> = config
            .commute_bands
            .iter()
            .map(|b| b.ceiling_minutes)
            .collect();
        assert_eq!(commute, vec![30, 40, 50, 60]);
    }
}
