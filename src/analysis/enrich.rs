//! Enrichment - fill missing derived fields from the location lookup
//! collaborator. Best-effort: lookup failures degrade to sentinel defaults
//! and never abort the pipeline.

use crate::analysis::error::LookupError;
use crate::analysis::lookup::LocationLookup;
use crate::analysis::types::{GrammarProximity, OfstedRating, PropertyRecord};
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Sentinel defaults used when a lookup fails or times out
pub const FALLBACK_COMMUTE_MINUTES: u32 = 60;
pub const FALLBACK_STATION_KM_TENTHS: i64 = 10; // 1.0 km
pub const FALLBACK_SCHOOL_RATING: OfstedRating = OfstedRating::Unknown;
pub const FALLBACK_GRAMMAR_STATUS: GrammarProximity = GrammarProximity::No;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Location commute times are measured against (home or workplace)
    pub reference_postcode: String,
    /// Bounded wait per lookup call; an expired wait counts as a failure
    pub timeout: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        EnrichOptions {
            reference_postcode: "SE1 9SP".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Fill in whichever derived fields are missing. Fields the caller already
/// supplied are never overwritten, so enrichment is idempotent and cheap to
/// re-run; a record with an empty postcode is returned unchanged.
pub async fn enrich(
    record: PropertyRecord,
    lookup: &dyn LocationLookup,
    opts: &EnrichOptions,
) -> PropertyRecord {
    if record.postcode.trim().is_empty() {
        debug!("skipping enrichment for {}: no postcode", record.property_id);
        return record;
    }

    let commute_minutes = match record.commute_minutes {
        Some(minutes) => Some(minutes),
        None => {
            let minutes = match bounded(
                opts.timeout,
                lookup.commute(&record.postcode, &opts.reference_postcode),
            )
            .await
            {
                Ok(info) => info.duration_minutes,
                Err(e) => {
                    warn!("commute lookup failed for {}: {}", record.postcode, e);
                    FALLBACK_COMMUTE_MINUTES
                }
            };
            Some(minutes)
        }
    };

    let distance_to_station_km = match record.distance_to_station_km {
        Some(distance) => Some(distance),
        None => {
            let distance = match bounded(opts.timeout, lookup.nearest_station(&record.postcode))
                .await
            {
                Ok(info) => info.distance_km,
                Err(e) => {
                    warn!("station lookup failed for {}: {}", record.postcode, e);
                    Decimal::new(FALLBACK_STATION_KM_TENTHS, 1)
                }
            };
            Some(distance)
        }
    };

    let nearest_school_ofsted = match record.nearest_school_ofsted {
        Some(rating) => Some(rating),
        None => {
            let rating = match bounded(opts.timeout, lookup.school(&record.postcode)).await {
                Ok(info) => info.rating,
                Err(e) => {
                    warn!("school lookup failed for {}: {}", record.postcode, e);
                    FALLBACK_SCHOOL_RATING
                }
            };
            Some(rating)
        }
    };

    let grammar_school_proximity = match record.grammar_school_proximity {
        Some(status) => Some(status),
        None => {
            let status = match bounded(opts.timeout, lookup.grammar(&record.postcode)).await {
                Ok(info) => info.status,
                Err(e) => {
                    warn!("grammar lookup failed for {}: {}", record.postcode, e);
                    FALLBACK_GRAMMAR_STATUS
                }
            };
            Some(status)
        }
    };

    PropertyRecord {
        commute_minutes,
        distance_to_station_km,
        nearest_school_ofsted,
        grammar_school_proximity,
        ..record
    }
}

async fn bounded<T>(
    wait: Duration,
    fut: impl Future<Output = Result<T, LookupError>>,
) -> Result<T, LookupError> {
    match tokio::time::timeout(wait, fut).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::Timeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::lookup::{CommuteInfo, GrammarInfo, SchoolInfo, StaticLookup, StationInfo};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::analysis::types::PropertyType;

    fn mock_record() -> PropertyRecord {
        PropertyRecord {
            property_id: "test-123".to_string(),
            postcode: "BR1 3QX".to_string(),
            price: 380_000,
            property_type: PropertyType::SemiDetached,
            bedrooms: 3,
            outdoor_space: Some("Garden".to_string()),
            tenure: None,
            agent_name: None,
            agent_phone: None,
            description: None,
            commute_minutes: None,
            distance_to_station_km: None,
            nearest_school_ofsted: None,
            grammar_school_proximity: None,
            added_at: Utc::now(),
        }
    }

    /// Counts calls so tests can assert enrichment skipped populated fields
    #[derive(Default)]
    struct CountingLookup {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LocationLookup for CountingLookup {
        async fn commute(&self, _: &str, _: &str) -> Result<CommuteInfo, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(CommuteInfo {
                duration_minutes: 25,
            })
        }

        async fn nearest_station(&self, _: &str) -> Result<StationInfo, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StationInfo {
                name: "Test".to_string(),
                distance_km: Decimal::new(8, 1),
            })
        }

        async fn school(&self, _: &str) -> Result<SchoolInfo, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SchoolInfo {
                name: "Test Primary".to_string(),
                rating: OfstedRating::Good,
            })
        }

        async fn grammar(&self, _: &str) -> Result<GrammarInfo, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GrammarInfo {
                status: GrammarProximity::Possible,
                schools: vec![],
            })
        }
    }

    /// Every capability fails
    struct FailingLookup;

    #[async_trait]
    impl LocationLookup for FailingLookup {
        async fn commute(&self, postcode: &str, _: &str) -> Result<CommuteInfo, LookupError> {
            Err(LookupError::NoData {
                postcode: postcode.to_string(),
            })
        }

        async fn nearest_station(&self, postcode: &str) -> Result<StationInfo, LookupError> {
            Err(LookupError::NoData {
                postcode: postcode.to_string(),
            })
        }

        async fn school(&self, postcode: &str) -> Result<SchoolInfo, LookupError> {
            Err(LookupError::NoData {
                postcode: postcode.to_string(),
            })
        }

        async fn grammar(&self, postcode: &str) -> Result<GrammarInfo, LookupError> {
            Err(LookupError::NoData {
                postcode: postcode.to_string(),
            })
        }
    }

    /// Hangs longer than any sane test timeout
    struct SlowLookup;

    #[async_trait]
    impl LocationLookup for SlowLookup {
        async fn commute(&self, _: &str, _: &str) -> Result<CommuteInfo, LookupError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CommuteInfo {
                duration_minutes: 1,
            })
        }

        async fn nearest_station(&self, _: &str) -> Result<StationInfo, LookupError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(StationInfo {
                name: "never".to_string(),
                distance_km: Decimal::ZERO,
            })
        }

        async fn school(&self, _: &str) -> Result<SchoolInfo, LookupError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(SchoolInfo {
                name: "never".to_string(),
                rating: OfstedRating::Good,
            })
        }

        async fn grammar(&self, _: &str) -> Result<GrammarInfo, LookupError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(GrammarInfo {
                status: GrammarProximity::Yes,
                schools: vec![],
            })
        }
    }

    #[tokio::test]
    async fn test_enrich_fills_missing_fields() {
        let record = mock_record();
        let enriched = enrich(record, &StaticLookup, &EnrichOptions::default()).await;

        assert_eq!(enriched.commute_minutes, Some(40)); // BR1 table entry
        assert!(enriched.distance_to_station_km.is_some());
        assert_eq!(enriched.nearest_school_ofsted, Some(OfstedRating::Good));
        assert_eq!(
            enriched.grammar_school_proximity,
            Some(GrammarProximity::Yes)
        );
    }

    #[tokio::test]
    async fn test_enrich_never_overwrites_supplied_fields() {
        let mut record = mock_record();
        record.commute_minutes = Some(12);
        record.nearest_school_ofsted = Some(OfstedRating::Inadequate);

        let enriched = enrich(record, &StaticLookup, &EnrichOptions::default()).await;

        assert_eq!(enriched.commute_minutes, Some(12));
        assert_eq!(
            enriched.nearest_school_ofsted,
            Some(OfstedRating::Inadequate)
        );
    }

    #[tokio::test]
    async fn test_enrich_fully_enriched_makes_no_calls() {
        let mut record = mock_record();
        record.commute_minutes = Some(30);
        record.distance_to_station_km = Some(Decimal::new(8, 1));
        record.nearest_school_ofsted = Some(OfstedRating::Good);
        record.grammar_school_proximity = Some(GrammarProximity::No);

        let lookup = CountingLookup::default();
        let enriched = enrich(record.clone(), &lookup, &EnrichOptions::default()).await;

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 0);
        assert_eq!(enriched, record);
    }

    #[tokio::test]
    async fn test_lookup_failure_degrades_to_sentinels() {
        let enriched = enrich(mock_record(), &FailingLookup, &EnrichOptions::default()).await;

        assert_eq!(enriched.commute_minutes, Some(FALLBACK_COMMUTE_MINUTES));
        assert_eq!(
            enriched.distance_to_station_km,
            Some(Decimal::new(FALLBACK_STATION_KM_TENTHS, 1))
        );
        assert_eq!(enriched.nearest_school_ofsted, Some(FALLBACK_SCHOOL_RATING));
        assert_eq!(
            enriched.grammar_school_proximity,
            Some(FALLBACK_GRAMMAR_STATUS)
        );
    }

    #[tokio::test]
    async fn test_expired_wait_treated_as_failure() {
        let opts = EnrichOptions {
            timeout: Duration::from_millis(20),
            ..EnrichOptions::default()
        };

        let enriched = enrich(mock_record(), &SlowLookup, &opts).await;

        assert_eq!(enriched.commute_minutes, Some(FALLBACK_COMMUTE_MINUTES));
        assert_eq!(enriched.grammar_school_proximity, Some(FALLBACK_GRAMMAR_STATUS));
    }
}
