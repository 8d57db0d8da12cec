//! Forecast Generation API Routes

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use forecast_core::ForecastRequest;

use crate::{AppError, AppState};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct GenerateRequest {
    pub symbols: Vec<String>,
    /// Years of historical data to fit on.
    pub years: f64,
    /// Forecast horizon in days.
    pub days: u32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GenerateResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub results: Vec<SymbolOutcome>,
}

pub fn forecast_routes() -> Router<AppState> {
    Router::new().route("/api/forecast", post(generate_forecasts))
}

/// Runs the forecast pipeline for a batch of symbols. A mixed batch reports
/// per-symbol outcomes with `success: true`; only a batch where every symbol
/// failed reports `success: false`.
#[utoipa::path(
    post,
    path = "/api/forecast",
    request_body = GenerateRequest,
    responses((status = 200, description = "Per-symbol forecast outcomes", body = GenerateResponse)),
    tag = "Forecast"
)]
pub async fn generate_forecasts(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let request = match ForecastRequest::new(payload.symbols, payload.years, payload.days) {
        Ok(request) => request,
        Err(e) => {
            return Ok(Json(GenerateResponse {
                success: false,
                error: Some(e.to_string()),
                results: Vec::new(),
            }))
        }
    };

    tracing::info!(
        symbols = ?request.symbols,
        years = request.years_history,
        days = request.horizon_days,
        "forecast batch requested"
    );

    let outcome = state.orchestrator.run(&request).await;

    let results = outcome
        .outcomes
        .iter()
        .map(|(symbol, result)| match result {
            Ok(forecast) => SymbolOutcome {
                symbol: symbol.clone(),
                status: "ok".to_string(),
                filename: Some(forecast.filename.clone()),
                error: None,
            },
            Err(e) => SymbolOutcome {
                symbol: symbol.clone(),
                status: e.kind().to_string(),
                filename: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    let success = !outcome.is_total_failure();
    Ok(Json(GenerateResponse {
        success,
        error: (!success).then(|| "no symbol could be forecast".to_string()),
        results,
    }))
}
