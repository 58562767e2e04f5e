//! Location lookup collaborator - commute, station, school, and grammar
//! catchment data for a postcode. This trait is the seam where real
//! geocoding/transit/schools APIs are substituted in.

use crate::analysis::error::LookupError;
use crate::analysis::types::{GrammarProximity, OfstedRating};
use crate::analysis::utils::{outward_code, parse_grammar_status, parse_ofsted_rating};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommuteInfo {
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationInfo {
    pub name: String,
    pub distance_km: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolInfo {
    pub name: String,
    pub rating: OfstedRating,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarInfo {
    pub status: GrammarProximity,
    pub schools: Vec<String>,
}

/// External lookup capability set consumed by the enricher
#[async_trait]
pub trait LocationLookup: Send + Sync {
    async fn commute(&self, postcode: &str, reference: &str) -> Result<CommuteInfo, LookupError>;
    async fn nearest_station(&self, postcode: &str) -> Result<StationInfo, LookupError>;
    async fn school(&self, postcode: &str) -> Result<SchoolInfo, LookupError>;
    async fn grammar(&self, postcode: &str) -> Result<GrammarInfo, LookupError>;
}

/// Deterministic in-process lookup keyed on the postcode outward code.
///
/// Known London areas come from a fixed table; anything else derives stable
/// values from the outward code's bytes, so repeated lookups for the same
/// postcode always agree. Useful for development and as a reproducible test
/// double.
#[derive(Debug, Default, Clone)]
pub struct StaticLookup;

struct AreaProfile {
    minutes_to_bridge: u32,
    station: &'static str,
    station_km_tenths: i64,
    school: &'static str,
    rating: OfstedRating,
    grammar: GrammarProximity,
    grammar_schools: &'static [&'static str],
}

fn known_area(outward: &str) -> Option<AreaProfile> {
    let profile = match outward {
        "SE1" => AreaProfile {
            minutes_to_bridge: 10,
            station: "London Bridge",
            station_km_tenths: 4,
            school: "Cathedral Primary",
            rating: OfstedRating::Good,
            grammar: GrammarProximity::No,
            grammar_schools: &[],
        },
        "SE9" => AreaProfile {
            minutes_to_bridge: 35,
            station: "Eltham",
            station_km_tenths: 9,
            school: "Eltham Hill",
            rating: OfstedRating::Good,
            grammar: GrammarProximity::Possible,
            grammar_schools: &["Bexley Grammar School"],
        },
        "SW4" => AreaProfile {
            minutes_to_bridge: 25,
            station: "Clapham Common",
            station_km_tenths: 6,
            school: "Macaulay Primary",
            rating: OfstedRating::Outstanding,
            grammar: GrammarProximity::No,
            grammar_schools: &[],
        },
        "BR1" => AreaProfile {
            minutes_to_bridge: 40,
            station: "Bromley South",
            station_km_tenths: 11,
            school: "Valley Primary",
            rating: OfstedRating::Good,
            grammar: GrammarProximity::Yes,
            grammar_schools: &["St Olave's Grammar School", "Newstead Wood School"],
        },
        "BR6" => AreaProfile {
            minutes_to_bridge: 50,
            station: "Orpington",
            station_km_tenths: 13,
            school: "Warren Road Primary",
            rating: OfstedRating::Outstanding,
            grammar: GrammarProximity::Yes,
            grammar_schools: &["St Olave's Grammar School"],
        },
        "KT6" => AreaProfile {
            minutes_to_bridge: 45,
            station: "Surbiton",
            station_km_tenths: 8,
            school: "Maple Infants",
            rating: OfstedRating::Good,
            grammar: GrammarProximity::Yes,
            grammar_schools: &["Tiffin School", "The Tiffin Girls' School"],
        },
        "N1" => AreaProfile {
            minutes_to_bridge: 30,
            station: "Highbury & Islington",
            station_km_tenths: 7,
            school: "Canonbury Primary",
            rating: OfstedRating::Good,
            grammar: GrammarProximity::No,
            grammar_schools: &[],
        },
        "E14" => AreaProfile {
            minutes_to_bridge: 20,
            station: "Canary Wharf",
            station_km_tenths: 5,
            school: "Cubitt Town Primary",
            rating: OfstedRating::RequiresImprovement,
            grammar: GrammarProximity::No,
            grammar_schools: &[],
        },
        _ => return None,
    };
    Some(profile)
}

/// Stable small hash of an outward code, for fallback value derivation
fn outward_seed(outward: &str) -> u32 {
    outward.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32))
}

#[async_trait]
impl LocationLookup for StaticLookup {
    async fn commute(&self, postcode: &str, reference: &str) -> Result<CommuteInfo, LookupError> {
        let outward = outward_code(postcode);
        if outward == outward_code(reference) {
            return Ok(CommuteInfo {
                duration_minutes: 5,
            });
        }

        let duration_minutes = match known_area(outward) {
            Some(area) => area.minutes_to_bridge,
            None => 35 + outward_seed(outward) % 21,
        };
        debug!("commute {} -> {}: {}min", postcode, reference, duration_minutes);
        Ok(CommuteInfo { duration_minutes })
    }

    async fn nearest_station(&self, postcode: &str) -> Result<StationInfo, LookupError> {
        let outward = outward_code(postcode);
        let info = match known_area(outward) {
            Some(area) => StationInfo {
                name: area.station.to_string(),
                distance_km: Decimal::new(area.station_km_tenths, 1),
            },
            None => StationInfo {
                name: format!("{outward} Station"),
                distance_km: Decimal::new(5 + (outward_seed(outward) % 16) as i64, 1),
            },
        };
        Ok(info)
    }

    async fn school(&self, postcode: &str) -> Result<SchoolInfo, LookupError> {
        let outward = outward_code(postcode);
        let info = match known_area(outward) {
            Some(area) => SchoolInfo {
                name: area.school.to_string(),
                rating: area.rating,
            },
            None => SchoolInfo {
                name: format!("{outward} Primary School"),
                // Skewed towards Good, like real inspection outcomes
                rating: match outward_seed(outward) % 10 {
                    0 | 1 => OfstedRating::Outstanding,
                    2..=6 => OfstedRating::Good,
                    7 | 8 => OfstedRating::RequiresImprovement,
                    _ => OfstedRating::Inadequate,
                },
            },
        };
        Ok(info)
    }

    async fn grammar(&self, postcode: &str) -> Result<GrammarInfo, LookupError> {
        let outward = outward_code(postcode);
        let info = match known_area(outward) {
            Some(area) => GrammarInfo {
                status: area.grammar,
                schools: area.grammar_schools.iter().map(|s| s.to_string()).collect(),
            },
            None => GrammarInfo {
                status: GrammarProximity::No,
                schools: Vec::new(),
            },
        };
        Ok(info)
    }
}

/// HTTP-backed lookup client with a bounded per-request timeout
pub struct HttpLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpLookup {
            client,
            base_url: base_url.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CommuteResponse {
    duration_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct StationResponse {
    name: String,
    distance_km: Decimal,
}

#[derive(Debug, Deserialize)]
struct SchoolResponse {
    name: String,
    rating: String,
}

#[derive(Debug, Deserialize)]
struct GrammarResponse {
    in_catchment: String,
    #[serde(default)]
    schools: Vec<String>,
}

#[async_trait]
impl LocationLookup for HttpLookup {
    async fn commute(&self, postcode: &str, reference: &str) -> Result<CommuteInfo, LookupError> {
        let response: CommuteResponse = self
            .client
            .get(format!("{}/commute", self.base_url))
            .query(&[("from", postcode), ("to", reference)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(CommuteInfo {
            duration_minutes: response.duration_minutes,
        })
    }

    async fn nearest_station(&self, postcode: &str) -> Result<StationInfo, LookupError> {
        let response: StationResponse = self
            .client
            .get(format!("{}/stations/nearest", self.base_url))
            .query(&[("postcode", postcode)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(StationInfo {
            name: response.name,
            distance_km: response.distance_km,
        })
    }

    async fn school(&self, postcode: &str) -> Result<SchoolInfo, LookupError> {
        let response: SchoolResponse = self
            .client
            .get(format!("{}/schools/nearest", self.base_url))
            .query(&[("postcode", postcode)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(SchoolInfo {
            name: response.name,
            rating: parse_ofsted_rating(&response.rating).unwrap_or(OfstedRating::Unknown),
        })
    }

    async fn grammar(&self, postcode: &str) -> Result<GrammarInfo, LookupError> {
        let response: GrammarResponse = self
            .client
            .get(format!("{}/grammar/catchment", self.base_url))
            .query(&[("postcode", postcode)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(GrammarInfo {
            status: parse_grammar_status(&response.in_catchment)
                .unwrap_or(GrammarProximity::No),
            schools: response.schools,
        })
    }
}
