//! Heatmap query: scored storm-event points plus the ranked regional
//! damage summary.
//!
//! `GET /storm/heatmap?months=6&min_severity=minor` — both parameters are
//! optional with documented defaults; a malformed `min_severity` label is
//! a validation error, never a silent default. The severity filter is
//! applied at the event query, so excluded tiers never reach the scorer.

use axum::{extract::Query, extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{self, HeatmapSummary};
use crate::auth::Caller;
use crate::db;
use crate::error::ApiError;
use crate::models::ScoredPoint;
use crate::scoring;
use crate::severity::Severity;
use crate::AppState;

// ---

const DEFAULT_MONTHS: u32 = 6;

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/storm/heatmap", get(handler))
}

#[derive(Debug, Deserialize)]
struct HeatmapQuery {
    // ---
    months: Option<u32>,
    min_severity: Option<String>,
}

#[derive(Debug, Serialize)]
struct HeatmapResponse {
    // ---
    points: Vec<ScoredPoint>,
    summary: HeatmapSummary,
}

async fn handler(
    _caller: Caller,
    Query(params): Query<HeatmapQuery>,
    State(state): State<AppState>,
) -> Result<Json<HeatmapResponse>, ApiError> {
    // ---
    let (months, min_severity) = validate(&params)?;

    info!(
        "GET /storm/heatmap - months={} min_severity={}",
        months,
        min_severity.label()
    );

    let now = Utc::now();
    let lookback = scoring::lookback_duration(months);
    let events = db::events_since(&state.pool, now - lookback, min_severity).await?;

    // Events without resolved coordinates drop out here
    let points: Vec<ScoredPoint> = events
        .iter()
        .filter_map(|e| scoring::score_event(e, now, lookback))
        .collect();

    let summary = aggregate::summarize(&points);
    info!(
        "GET /storm/heatmap - {} points across {} regions",
        summary.total_events,
        summary.top_regions.len()
    );

    Ok(Json(HeatmapResponse { points, summary }))
}

fn validate(params: &HeatmapQuery) -> Result<(u32, Severity), ApiError> {
    // ---
    let months = params.months.unwrap_or(DEFAULT_MONTHS);
    if months == 0 {
        return Err(ApiError::Validation(
            "months must be a positive number of months".into(),
        ));
    }

    let min_severity = match params.min_severity.as_deref() {
        None => Severity::Minor,
        Some(label) => Severity::from_query_label(label).ok_or_else(|| {
            ApiError::Validation(format!(
                "unknown severity '{label}'; expected one of minor, moderate, severe, catastrophic"
            ))
        })?,
    };

    Ok((months, min_severity))
}
