//! Batch analysis orchestrator - imports listings, runs the scoring
//! pipeline, and exports ranked results

use anyhow::Result;
use property_analyzer_backend::analysis::lookup::{HttpLookup, LocationLookup, StaticLookup};
use property_analyzer_backend::analysis::process::{Pipeline, PipelineConfig};
use property_analyzer_backend::analysis::score::ScoringConfig;
use property_analyzer_backend::analysis::types::{BatchStats, ProcessOutcome};
use property_analyzer_backend::analysis::{export, import, rank};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();

    info!("Starting batch property analysis");

    let config = Config::from_env()?;
    info!("Configuration loaded");

    let lookup: Arc<dyn LocationLookup> = match &config.lookup_base_url {
        Some(base_url) => {
            info!("Using HTTP lookup at {}", base_url);
            Arc::new(HttpLookup::new(base_url.clone(), config.lookup_timeout)?)
        }
        None => {
            info!("Using deterministic in-process lookup");
            Arc::new(StaticLookup)
        }
    };

    let pipeline = Pipeline::new(config.pipeline_config(), lookup)?;

    // Step 1: Import raw listings
    info!("Step 1/4: Importing listings from {:?}...", config.input_path);
    let mut rows = read_input(&config.input_path)?;
    info!("✓ Imported {} rows", rows.len());

    // Limit to first N records for testing (optional)
    if config.limit_records > 0 && rows.len() > config.limit_records {
        warn!(
            "Limiting to first {} records (testing mode)",
            config.limit_records
        );
        rows.truncate(config.limit_records);
    }

    // Step 2: Validate, enrich, score
    info!("Step 2/4: Processing {} records...", rows.len());
    let outcomes = pipeline.batch_process(rows).await;
    let stats = BatchStats::summarize(&outcomes);
    info!("✓ Processing complete: {}", stats);

    report_failures(&outcomes);

    // Step 3: Rank scored records
    info!("Step 3/4: Ranking...");
    let scored: Vec<_> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            ProcessOutcome::Scored(scored) => Some(scored),
            ProcessOutcome::Invalid { .. } => None,
        })
        .collect();
    let limit = if config.top_n > 0 {
        config.top_n
    } else {
        scored.len()
    };
    let ranked = rank::top_n(scored, limit);
    info!("✓ Ranked {} records", ranked.len());

    // Step 4: Export
    info!("Step 4/4: Exporting to {:?}...", config.output_path);
    let file = fs::File::create(&config.output_path)?;
    let written = export::write_csv(file, &ranked)?;
    info!("✓ Exported {} rows", written);

    info!("Batch analysis complete: {}", stats);

    Ok(())
}

/// Pick the reader from the file extension
fn read_input(path: &PathBuf) -> Result<Vec<property_analyzer_backend::analysis::RawProperty>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => import::read_csv(fs::File::open(path)?),
        "xlsx" | "xls" => import::read_xlsx(&fs::read(path)?),
        other => Err(anyhow::anyhow!(
            "Unsupported input format '{}' (expected csv or xlsx)",
            other
        )),
    }
}

/// Name the record, the field, and the reason for every invalid row, so a
/// bulk import with one bad record does not lose the rest silently
fn report_failures(outcomes: &[ProcessOutcome]) {
    for (idx, outcome) in outcomes.iter().enumerate() {
        if let ProcessOutcome::Invalid { raw, errors, .. } = outcome {
            let id = raw.property_id.as_deref().unwrap_or("<no id>");
            for error in errors {
                warn!("✗ row {} ({}): {} - {}", idx + 1, id, error.field(), error);
            }
        }
    }
}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
struct Config {
    input_path: PathBuf,
    output_path: PathBuf,
    reference_postcode: String,
    budget_min: i64,
    budget_max: i64,
    min_bedrooms: u32,
    max_commute_minutes: u32,
    max_workers: usize,
    limit_records: usize, // 0 = no limit
    top_n: usize,         // 0 = keep everything
    lookup_base_url: Option<String>,
    lookup_timeout: Duration,
}

impl Config {
    fn from_env() -> Result<Self> {
        fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
            env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }

        Ok(Config {
            input_path: env::var("INPUT_PATH")
                .unwrap_or_else(|_| "properties.csv".to_string())
                .into(),

            output_path: env::var("OUTPUT_PATH")
                .unwrap_or_else(|_| "ranked_properties.csv".to_string())
                .into(),

            reference_postcode: env::var("REFERENCE_POSTCODE")
                .unwrap_or_else(|_| "SE1 9SP".to_string()),

            budget_min: parsed("BUDGET_MIN", 300_000),
            budget_max: parsed("BUDGET_MAX", 420_000),
            min_bedrooms: parsed("MIN_BEDROOMS", 3),
            max_commute_minutes: parsed("MAX_COMMUTE_MINUTES", 60),
            max_workers: parsed("MAX_WORKERS", 3),
            limit_records: parsed("LIMIT_RECORDS", 0),
            top_n: parsed("TOP_N", 0),

            lookup_base_url: env::var("LOOKUP_BASE_URL").ok(),
            lookup_timeout: Duration::from_secs(parsed("LOOKUP_TIMEOUT_SECS", 10)),
        })
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            scoring: ScoringConfig::for_budget(
                self.budget_min,
                self.budget_max,
                self.min_bedrooms,
                self.max_commute_minutes,
            ),
            reference_postcode: self.reference_postcode.clone(),
            lookup_timeout: self.lookup_timeout,
            max_workers: self.max_workers,
            ..PipelineConfig::default()
        }
    }
}
