use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use extract::{
    ApiError, ApiErrorKind, ConnectionCheck, ImageAnalysis, SeedAssistant, SeedQuery,
    SeedRecord, Strategy, VarietyList,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod metrics;

use config::AppConfig;
use metrics::{Metrics, MetricsSnapshot, TimedOperation};

const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

struct AppState {
    assistant: SeedAssistant,
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Count the outcome of one catalog call and turn its error into a response.
    fn track<T>(&self, result: Result<T, ApiError>, timer: TimedOperation) -> Result<T, AppError> {
        match result {
            Ok(value) => {
                self.metrics.record_completion(timer.elapsed());
                self.metrics.record_request(true);
                Ok(value)
            }
            Err(err) => {
                let kind = err.kind();
                if kind != ApiErrorKind::InvalidRequest {
                    self.metrics.record_completion(timer.elapsed());
                }
                self.metrics.record_request(false);
                self.metrics.record_error(kind);
                warn!(kind = kind.as_str(), error = %err, "catalog request failed");
                Err(AppError(err))
            }
        }
    }
}

struct AppError(ApiError);

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    error_type: ApiErrorKind,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = match kind {
            ApiErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
            ApiErrorKind::AuthError => StatusCode::UNAUTHORIZED,
            ApiErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ApiErrorKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };

        let body = ErrorBody {
            message: self.0.user_message(),
            error_type: kind,
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    configured: bool,
}

#[derive(Deserialize)]
struct VarietiesRequest {
    #[serde(default)]
    term: String,
}

#[derive(Serialize)]
struct VarietiesResponse {
    #[serde(flatten)]
    list: VarietyList,
    strategy: Strategy,
}

#[derive(Serialize)]
struct RecordResponse {
    record: SeedRecord,
    strategy: Strategy,
}

#[derive(Deserialize)]
struct PlantRequest {
    #[serde(default)]
    seed_name: String,
    variety: Option<String>,
}

#[derive(Serialize)]
struct DescriptionResponse {
    description: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    context: Option<String>,
    seed_context: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    text: String,
}

#[derive(Serialize)]
struct ImageResponse {
    #[serde(flatten)]
    analysis: ImageAnalysis,
    strategy: Strategy,
}

#[derive(Deserialize)]
struct TestConnectionRequest {
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to read configuration")?;
    init_tracing(&config);

    let assistant = SeedAssistant::from_config(config.gemini.clone())
        .context("Failed to build Gemini client")?;
    if !assistant.is_configured() {
        warn!("SEED_CATALOG_API_KEY is not set, completion endpoints will answer 503");
    }

    let state = Arc::new(AppState {
        assistant,
        metrics: Metrics::new(),
    });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;

    info!(
        addr = %config.bind_addr,
        model = %config.gemini.model,
        "Server listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    if config.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/varieties", post(search_varieties))
        .route("/seed-details", post(seed_details))
        .route("/growing-instructions", post(growing_instructions))
        .route("/care-instructions", post(care_instructions))
        .route("/description", post(describe_seed))
        .route("/search", post(search))
        .route(
            "/analyze-image",
            post(analyze_image).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
        .route("/test-connection", post(test_connection))
        .route("/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        configured: state.assistant.is_configured(),
    })
}

async fn search_varieties(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VarietiesRequest>,
) -> Result<Json<VarietiesResponse>, AppError> {
    let timer = TimedOperation::start();
    let result = state.assistant.search_varieties(&req.term).await;
    let extracted = state.track(result, timer)?;
    state.metrics.record_strategy(extracted.strategy);

    Ok(Json(VarietiesResponse {
        list: extracted.value,
        strategy: extracted.strategy,
    }))
}

async fn seed_details(
    State(state): State<Arc<AppState>>,
    Json(query): Json<SeedQuery>,
) -> Result<Json<RecordResponse>, AppError> {
    let timer = TimedOperation::start();
    let result = state.assistant.seed_details(&query).await;
    let extracted = state.track(result, timer)?;
    state.metrics.record_strategy(extracted.strategy);

    Ok(Json(RecordResponse {
        record: extracted.value,
        strategy: extracted.strategy,
    }))
}

async fn growing_instructions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlantRequest>,
) -> Result<Json<RecordResponse>, AppError> {
    let timer = TimedOperation::start();
    let result = state
        .assistant
        .growing_instructions(&req.seed_name, req.variety.as_deref())
        .await;
    let extracted = state.track(result, timer)?;
    state.metrics.record_strategy(extracted.strategy);

    Ok(Json(RecordResponse {
        record: extracted.value,
        strategy: extracted.strategy,
    }))
}

async fn care_instructions(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlantRequest>,
) -> Result<Json<RecordResponse>, AppError> {
    let timer = TimedOperation::start();
    let result = state
        .assistant
        .care_instructions(&req.seed_name, req.variety.as_deref())
        .await;
    let extracted = state.track(result, timer)?;
    state.metrics.record_strategy(extracted.strategy);

    Ok(Json(RecordResponse {
        record: extracted.value,
        strategy: extracted.strategy,
    }))
}

async fn describe_seed(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PlantRequest>,
) -> Result<Json<DescriptionResponse>, AppError> {
    let timer = TimedOperation::start();
    let result = state
        .assistant
        .description(&req.seed_name, req.variety.as_deref())
        .await;
    let description = state.track(result, timer)?;

    Ok(Json(DescriptionResponse { description }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let timer = TimedOperation::start();
    let result = state
        .assistant
        .search(&req.query, req.context.as_deref(), req.seed_context.as_deref())
        .await;
    let text = state.track(result, timer)?;

    Ok(Json(SearchResponse { text }))
}

async fn analyze_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ImageResponse>, AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    let timer = TimedOperation::start();
    let result = state.assistant.analyze_image(&body, content_type).await;
    let extracted = state.track(result, timer)?;
    state.metrics.record_strategy(extracted.strategy);

    Ok(Json(ImageResponse {
        analysis: extracted.value,
        strategy: extracted.strategy,
    }))
}

async fn test_connection(
    State(state): State<Arc<AppState>>,
    req: Option<Json<TestConnectionRequest>>,
) -> Json<ConnectionCheck> {
    let api_key = req.and_then(|Json(req)| req.api_key);

    let timer = TimedOperation::start();
    let check = state.assistant.test_connection(api_key.as_deref()).await;

    if check.error_type != Some(ApiErrorKind::NotConfigured) {
        state.metrics.record_completion(timer.elapsed());
    }
    state.metrics.record_request(check.ok);
    if let Some(kind) = check.error_type {
        state.metrics.record_error(kind);
    }

    Json(check)
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
