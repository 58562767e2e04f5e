use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use property_analyzer_backend::analysis::lookup::{HttpLookup, LocationLookup, StaticLookup};
use property_analyzer_backend::analysis::process::{Pipeline, PipelineConfig};
use property_analyzer_backend::analysis::score::ScoringConfig;
use property_analyzer_backend::analysis::types::{
    BatchStats, ProcessOutcome, PropertyRecord, RawProperty, ScoreBreakdown,
};
use property_analyzer_backend::score_band;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

#[derive(Serialize, Deserialize)]
struct ApiResponse {
    message: String,
    status: String,
}

#[tokio::main]
async fn main() {
    println!("🏠 Starting Property Analyzer API server...");

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = pipeline_config_from_env();

    // Unset LOOKUP_BASE_URL selects the deterministic in-process lookup
    let lookup: Arc<dyn LocationLookup> = match std::env::var("LOOKUP_BASE_URL") {
        Ok(base_url) => {
            println!("📡 Using HTTP lookup at {}", base_url);
            Arc::new(
                HttpLookup::new(base_url, config.lookup_timeout)
                    .expect("Failed to build lookup client"),
            )
        }
        Err(_) => Arc::new(StaticLookup),
    };

    let pipeline = Pipeline::new(config, lookup).expect("Invalid pipeline configuration");
    println!("✅ Scoring configuration validated");

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };

    let app = Router::new()
        .route("/", get(health_check))
        .route("/api/health", get(health_check))
        .route("/api/properties/score", post(score_property))
        .route("/api/properties/batch", post(score_batch))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 3001));
    println!("🚀 Server running on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn pipeline_config_from_env() -> PipelineConfig {
    let env_i64 = |key: &str, default: i64| {
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    };
    let env_u32 = |key: &str, default: u32| {
        std::env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    };

    let scoring = ScoringConfig::for_budget(
        env_i64("BUDGET_MIN", 300_000),
        env_i64("BUDGET_MAX", 420_000),
        env_u32("MIN_BEDROOMS", 3),
        env_u32("MAX_COMMUTE_MINUTES", 60),
    );

    PipelineConfig {
        scoring,
        reference_postcode: std::env::var("REFERENCE_POSTCODE")
            .unwrap_or_else(|_| "SE1 9SP".to_string()),
        ..PipelineConfig::default()
    }
}

async fn health_check() -> Json<ApiResponse> {
    Json(ApiResponse {
        message: "Property Analyzer API is running!".to_string(),
        status: "ok".to_string(),
    })
}

async fn score_property(
    State(state): State<AppState>,
    Json(raw): Json<RawProperty>,
) -> Json<ScoreResponse> {
    let outcome = state.pipeline.process(raw).await;
    Json(ScoreResponse::from_outcome(outcome))
}

async fn score_batch(
    State(state): State<AppState>,
    Json(raws): Json<Vec<RawProperty>>,
) -> Json<BatchResponse> {
    let outcomes = state.pipeline.batch_process(raws).await;
    let stats = BatchStats::summarize(&outcomes);

    Json(BatchResponse {
        scored: stats.scored,
        invalid: stats.invalid,
        with_warnings: stats.with_warnings,
        results: outcomes
            .into_iter()
            .map(ScoreResponse::from_outcome)
            .collect(),
    })
}

#[derive(Serialize)]
struct ScoreResponse {
    property_id: Option<String>,
    valid: bool,
    band: Option<&'static str>,
    scores: Option<ScoreBreakdown>,
    record: Option<PropertyRecord>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ScoreResponse {
    fn from_outcome(outcome: ProcessOutcome) -> Self {
        match outcome {
            ProcessOutcome::Scored(scored) => ScoreResponse {
                property_id: Some(scored.record.property_id.clone()),
                valid: true,
                band: Some(score_band(scored.scores.total_score)),
                scores: Some(scored.scores),
                record: Some(scored.record),
                errors: vec![],
                warnings: scored.warnings,
            },
            ProcessOutcome::Invalid {
                raw,
                errors,
                warnings,
            } => ScoreResponse {
                property_id: raw.property_id,
                valid: false,
                band: None,
                scores: None,
                record: None,
                errors: errors.iter().map(|e| e.to_string()).collect(),
                warnings,
            },
        }
    }
}

#[derive(Serialize)]
struct BatchResponse {
    scored: usize,
    invalid: usize,
    with_warnings: usize,
    results: Vec<ScoreResponse>,
}
