use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use multiboost_executor::{ExecutionOutcome, ExecutorError, FitExecutor, ParamsArtifact};
use multiboost_protocol::{FitVariant, TranslateError, Translator};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::datasets::{DatasetCatalog, DatasetEntry};

pub const SERVICE_NAME: &str = "multiboost-fit";
const INVALID_PAYLOAD: &str = "Invalid payload format. Expected 'x' parameter object.";

pub struct AppState {
    pub translator: Translator,
    pub executor: FitExecutor,
    pub catalog: DatasetCatalog,
    /// Directory for parameter files; the system temp dir when unset.
    pub artifact_dir: Option<PathBuf>,
    pub req_count: AtomicUsize,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(translator: Translator, executor: FitExecutor, catalog: DatasetCatalog) -> Self {
        Self {
            translator,
            executor,
            catalog,
            artifact_dir: None,
            req_count: AtomicUsize::new(0),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(
            Translator::new(config.translator_settings()),
            FitExecutor::new(config.executor_config()),
            config.dataset_catalog(),
        )
    }

    fn record_request(&self) -> u64 {
        self.req_count.fetch_add(1, Ordering::Relaxed) as u64 + 1
    }

    fn create_artifact(&self, contents: &Value) -> Result<ParamsArtifact, ExecutorError> {
        match &self.artifact_dir {
            Some(dir) => ParamsArtifact::create_in(dir, contents),
            None => ParamsArtifact::create(contents),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    success: bool,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    kind: Option<&'static str>,
    field: Option<String>,
}

impl ApiError {
    fn new<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self {
            status,
            message: message.into(),
            kind: None,
            field: None,
        }
    }

    fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<TranslateError> for ApiError {
    fn from(err: TranslateError) -> Self {
        Self {
            kind: Some(err.kind()),
            field: err.field().map(str::to_string),
            ..Self::bad_request(err.to_string())
        }
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        match err {
            ExecutorError::ExecutionTimeout { .. } => {
                Self::new(StatusCode::REQUEST_TIMEOUT, err.to_string())
            }
            other => Self::internal(format!("Internal server error: {other}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let payload = Json(ErrorResponse {
            error: self.message,
            kind: self.kind,
            field: self.field,
            success: false,
        });
        (self.status, payload).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct DatasetsResponse {
    datasets: Vec<DatasetEntry>,
}

pub async fn start_server(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(Arc::new(state));
    let listener = bind_listener(addr).await?;
    info!("MultiBoost fit service listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("fit service terminated unexpectedly")
}

async fn bind_listener(addr: &str) -> Result<tokio::net::TcpListener> {
    if let Ok(socket_addr) = addr.parse::<SocketAddr>() {
        tokio::net::TcpListener::bind(socket_addr)
            .await
            .with_context(|| format!("failed to bind fit service on {socket_addr}"))
    } else {
        tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind fit service on {addr}"))
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/regression-fit", post(handle_regression_fit))
        .route("/classification-fit", post(handle_classification_fit))
        .route("/available-datasets", get(handle_available_datasets))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: crate::VERSION,
    })
}

async fn handle_regression_fit(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExecutionOutcome>, ApiError> {
    run_fit(&state, FitVariant::Regression, payload).await.map(Json)
}

async fn handle_classification_fit(
    State(state): State<SharedState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ExecutionOutcome>, ApiError> {
    run_fit(&state, FitVariant::Classification, payload).await.map(Json)
}

async fn run_fit(
    state: &AppState,
    variant: FitVariant,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ExecutionOutcome, ApiError> {
    let request = state.record_request();
    info!(request, %variant, "fit request received");

    let Json(body) = payload.map_err(|rejection| {
        ApiError::bad_request(format!("Invalid JSON payload: {}", rejection.body_text()))
    })?;
    let config = body
        .get("x")
        .filter(|x| x.is_object())
        .ok_or_else(|| ApiError::bad_request(INVALID_PAYLOAD))?;

    let mut artifact = state.create_artifact(config)?;
    let translation = state.translator.translate(config, variant).map_err(|err| {
        warn!(request, %variant, kind = err.kind(), "rejected fit request: {}", err);
        ApiError::from(err)
    })?;
    artifact.overwrite(&translation.parameters.to_config_object())?;

    let outcome = state
        .executor
        .run(variant, &translation.invocation, Some(artifact.path()))
        .await?;
    info!(request, %variant, exit_code = outcome.exit_code, "fit request completed");
    Ok(outcome)
}

async fn handle_available_datasets(
    State(state): State<SharedState>,
) -> Result<Json<DatasetsResponse>, ApiError> {
    let datasets = state
        .catalog
        .list()
        .map_err(|err| ApiError::internal(format!("Error listing datasets: {err}")))?;
    Ok(Json(DatasetsResponse { datasets }))
}
