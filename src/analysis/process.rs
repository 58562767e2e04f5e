//! Pipeline orchestration - validate, enrich, score, in that order, per
//! record. Batch mode applies the same sequence to many records with a
//! bounded worker pool; records never share mutable state.

use crate::analysis::enrich::{enrich, EnrichOptions};
use crate::analysis::error::ConfigError;
use crate::analysis::lookup::LocationLookup;
use crate::analysis::score::{score, ScoringConfig};
use crate::analysis::types::{ProcessOutcome, RawProperty, ScoredProperty};
use crate::analysis::validate::{validate, ValidatorLimits};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scoring: ScoringConfig,
    pub limits: ValidatorLimits,
    pub reference_postcode: String,
    /// Bounded wait per lookup call during enrichment
    pub lookup_timeout: Duration,
    /// Concurrent records in a batch - lookups are I/O-bound, so a small
    /// fixed pool is plenty
    pub max_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            scoring: ScoringConfig::default(),
            limits: ValidatorLimits::default(),
            reference_postcode: "SE1 9SP".to_string(),
            lookup_timeout: Duration::from_secs(10),
            max_workers: 3,
        }
    }
}

/// Stateless processing pipeline. Construction validates the configuration,
/// so a misconfigured scorer is rejected before any record is touched.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    enrich_opts: EnrichOptions,
    lookup: Arc<dyn LocationLookup>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        lookup: Arc<dyn LocationLookup>,
    ) -> Result<Self, ConfigError> {
        config.scoring.validate()?;
        if config.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if config.lookup_timeout.is_zero() {
            return Err(ConfigError::ZeroLookupTimeout);
        }

        let enrich_opts = EnrichOptions {
            reference_postcode: config.reference_postcode.clone(),
            timeout: config.lookup_timeout,
        };

        Ok(Pipeline {
            config,
            enrich_opts,
            lookup,
        })
    }

    pub fn scoring_config(&self) -> &ScoringConfig {
        &self.config.scoring
    }

    /// Run one record through validate -> enrich -> score. Validation
    /// failures come back as data with the score fields absent.
    pub async fn process(&self, raw: RawProperty) -> ProcessOutcome {
        let validation = validate(&raw, &self.config.limits);

        let record = match validation.record {
            Some(record) => record,
            None => {
                return ProcessOutcome::Invalid {
                    raw,
                    errors: validation.errors,
                    warnings: validation.warnings,
                };
            }
        };

        let record = enrich(record, self.lookup.as_ref(), &self.enrich_opts).await;
        let scores = score(&record, &self.config.scoring);

        ProcessOutcome::Scored(ScoredProperty {
            record,
            scores,
            warnings: validation.warnings,
            processed_at: Utc::now(),
        })
    }

    /// Process a batch. Records are independent, so they run concurrently up
    /// to `max_workers`; output order mirrors input order and one bad record
    /// never aborts the rest.
    pub async fn batch_process(&self, raws: Vec<RawProperty>) -> Vec<ProcessOutcome> {
        let total = raws.len();
        info!("processing batch of {} properties", total);

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let mut tasks = JoinSet::new();

        for (idx, raw) in raws.into_iter().enumerate() {
            let pipeline = self.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (idx, pipeline.process(raw).await)
            });
        }

        let mut outcomes: Vec<Option<ProcessOutcome>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                Err(e) => warn!("batch worker failed: {}", e),
            }
        }

        let outcomes: Vec<ProcessOutcome> = outcomes.into_iter().flatten().collect();
        info!(
            "batch complete: {} of {} records scored",
            outcomes.iter().filter(|o| o.is_scored()).count(),
            total
        );
        outcomes
    }
}
