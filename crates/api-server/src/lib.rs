//! HTTP surface for the forecast service: submit forecast batches, browse
//! the chart gallery, delete charts, and serve the generated chart files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use chart_store::LocalChartStore;
use forecast_core::ModelConfig;
use forecast_orchestrator::{ForecastOrchestrator, OrchestratorConfig, PipelineVariant};
use yahoo_client::YahooClient;

pub mod chart_routes;
pub mod forecast_routes;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ForecastOrchestrator>,
}

/// Standard JSON envelope for API responses.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Anyhow-backed handler error surfacing as a 500 envelope.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::<()>::error(self.0.to_string())),
        )
            .into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        forecast_routes::generate_forecasts,
        chart_routes::list_charts,
        chart_routes::delete_chart,
    ),
    tags(
        (name = "Forecast", description = "Forecast generation"),
        (name = "Charts", description = "Chart gallery")
    )
)]
struct ApiDoc;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn orchestrator_config_from_env() -> OrchestratorConfig {
    let defaults = OrchestratorConfig::default();

    let variant = std::env::var("PIPELINE_VARIANT")
        .ok()
        .and_then(|v| v.parse::<PipelineVariant>().ok())
        .unwrap_or(defaults.variant);

    OrchestratorConfig {
        variant,
        neutral_sentiment: env_or("NEUTRAL_SENTIMENT", defaults.neutral_sentiment),
        data_timeout: Duration::from_secs(env_or(
            "DATA_TIMEOUT_SECS",
            defaults.data_timeout.as_secs(),
        )),
        fit_timeout: Duration::from_secs(env_or(
            "FIT_TIMEOUT_SECS",
            defaults.fit_timeout.as_secs(),
        )),
        request_deadline: Duration::from_secs(env_or(
            "REQUEST_DEADLINE_SECS",
            defaults.request_deadline.as_secs(),
        )),
        model: ModelConfig::default(),
    }
}

pub fn build_router(state: AppState, charts_dir: PathBuf) -> Router {
    Router::new()
        .merge(forecast_routes::forecast_routes())
        .merge(chart_routes::chart_routes())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/charts", ServeDir::new(charts_dir))
        .route("/", get(|| async { Redirect::temporary("/charts/index.html") }))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let charts_dir = PathBuf::from(
        std::env::var("CHARTS_DIR").unwrap_or_else(|_| "charts".to_string()),
    );
    let store = LocalChartStore::new(&charts_dir)
        .map_err(|e| anyhow::anyhow!("chart store init failed: {}", e))?;

    let orchestrator = ForecastOrchestrator::new(
        Arc::new(YahooClient::new()),
        Arc::new(store),
        orchestrator_config_from_env(),
    );

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    let app = build_router(state, charts_dir.clone());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        "Serving forecasts on http://{} (charts in {:?})",
        bind_addr,
        charts_dir
    );

    axum::serve(listener, app).await?;
    Ok(())
}
