//! Chart Gallery API Routes
//!
//! Listing and deletion of stored forecast charts. The chart files
//! themselves are served statically under `/charts`.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChartListing {
    pub filename: String,
    pub symbol: String,
    pub generated_at: DateTime<Utc>,
    pub horizon_days: u32,
    pub years_history: f64,
    pub title: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct DeleteRequest {
    pub filename: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
}

pub fn chart_routes() -> Router<AppState> {
    Router::new()
        .route("/api/charts", get(list_charts))
        .route("/api/charts/delete", post(delete_chart))
}

#[utoipa::path(
    get,
    path = "/api/charts",
    responses((status = 200, description = "Stored charts with metadata")),
    tag = "Charts"
)]
pub async fn list_charts(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ChartListing>>>, AppError> {
    let entries = state
        .orchestrator
        .store()
        .list()
        .await
        .map_err(|e| anyhow::anyhow!("chart listing failed: {}", e))?;

    let listings = entries
        .into_iter()
        .map(|entry| ChartListing {
            filename: entry.filename,
            symbol: entry.metadata.symbol,
            generated_at: entry.metadata.generated_at,
            horizon_days: entry.metadata.horizon_days,
            years_history: entry.metadata.years_history,
            title: entry.metadata.title,
        })
        .collect();

    Ok(Json(ApiResponse::success(listings)))
}

/// Deletes a stored chart and its manifest. Unknown filenames report
/// `success: false` without an error status; malformed filenames are
/// rejected outright.
#[utoipa::path(
    post,
    path = "/api/charts/delete",
    request_body = DeleteRequest,
    responses((status = 200, description = "Deletion outcome", body = DeleteResponse)),
    tag = "Charts"
)]
pub async fn delete_chart(
    State(state): State<AppState>,
    Json(payload): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let deleted = state
        .orchestrator
        .store()
        .delete(&payload.filename)
        .await
        .map_err(|e| anyhow::anyhow!("chart deletion failed: {}", e))?;

    Ok(Json(DeleteResponse { success: deleted }))
}
