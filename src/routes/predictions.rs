//! Predictions query: classified forward-looking storm outlooks, plus the
//! affected-customers lookup for one prediction.
//!
//! The predictive source is an external collaborator; this service only
//! classifies and filters what it reports. An unavailable source is a
//! server-side failure (502) with no retry at this layer.

use axum::{
    extract::Path, extract::Query, extract::State, routing::get, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::Caller;
use crate::db;
use crate::error::ApiError;
use crate::models::{Customer, RawPrediction, StormPrediction};
use crate::severity::PredictionTier;
use crate::AppState;

// ---

const DEFAULT_HOURS: i64 = 72;
const DEFAULT_CUSTOMER_LIMIT: i64 = 50;

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/storm/predictions", get(list_handler))
        .route("/storm/predictions/{id}/customers", get(customers_handler))
}

// ---

#[derive(Debug, Deserialize)]
struct PredictionsQuery {
    // ---
    state: Option<String>,
    hours: Option<i64>,
    summary: Option<bool>,
    min_severity: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictionsResponse {
    // ---
    predictions: Vec<StormPrediction>,
}

/// Condensed payload returned when `summary=true`.
#[derive(Debug, Serialize)]
struct PredictionsSummary {
    // ---
    count: usize,
    highest_severity: Option<&'static str>,
    states: Vec<String>,
}

async fn list_handler(
    _caller: Caller,
    Query(params): Query<PredictionsQuery>,
    State(app): State<AppState>,
) -> Result<axum::response::Response, ApiError> {
    // ---
    use axum::response::IntoResponse;

    let hours = params.hours.unwrap_or(DEFAULT_HOURS);
    if hours <= 0 {
        return Err(ApiError::Validation(
            "hours must be a positive number of hours".into(),
        ));
    }

    let min_tier = match params.min_severity.as_deref() {
        None => None,
        Some(label) => Some(PredictionTier::from_query_label(label).ok_or_else(|| {
            ApiError::Validation(format!(
                "unknown prediction severity '{label}'; expected one of marginal, slight, enhanced, moderate, high"
            ))
        })?),
    };

    info!(
        "GET /storm/predictions - state={:?} hours={} summary={:?}",
        params.state, hours, params.summary
    );

    let all = fetch_predictions(&app).await?;
    let filtered = filter_predictions(all, params.state.as_deref(), hours, min_tier);

    if params.summary.unwrap_or(false) {
        return Ok(Json(condense(&filtered)).into_response());
    }

    Ok(Json(PredictionsResponse { predictions: filtered }).into_response())
}

// ---

#[derive(Debug, Deserialize)]
struct AffectedCustomersQuery {
    // ---
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct AffectedCustomersResponse {
    // ---
    prediction_id: String,
    states: Vec<String>,
    customers: Vec<Customer>,
}

async fn customers_handler(
    _caller: Caller,
    Path(id): Path<String>,
    Query(params): Query<AffectedCustomersQuery>,
    State(app): State<AppState>,
) -> Result<Json<AffectedCustomersResponse>, ApiError> {
    // ---
    let limit = params.limit.unwrap_or(DEFAULT_CUSTOMER_LIMIT);
    if limit <= 0 {
        return Err(ApiError::Validation("limit must be positive".into()));
    }

    info!("GET /storm/predictions/{}/customers - limit={}", id, limit);

    let prediction = fetch_predictions(&app)
        .await?
        .into_iter()
        .find(|p| p.id == id)
        .ok_or_else(|| ApiError::NotFound("prediction".into()))?;

    let customers = db::customers_in_states(&app.pool, &prediction.states, limit).await?;

    Ok(Json(AffectedCustomersResponse {
        prediction_id: prediction.id,
        states: prediction.states,
        customers,
    }))
}

// ---

/// Pull the current outlook set from the predictive source. Individual
/// malformed records are skipped with a log line; a dead source is a 502.
async fn fetch_predictions(app: &AppState) -> Result<Vec<StormPrediction>, ApiError> {
    // ---
    let response: serde_json::Value = app
        .http
        .get(&app.config.prediction_api_url)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?
        .json()
        .await
        .map_err(|e| ApiError::Upstream(format!("malformed feed response: {e}")))?;

    let mut predictions = Vec::new();
    if let Some(items) = response.get("predictions").and_then(|p| p.as_array()) {
        for (i, item) in items.iter().enumerate() {
            match serde_json::from_value::<RawPrediction>(item.clone()) {
                Ok(raw) => predictions.push(raw.into_prediction()),
                Err(e) => {
                    debug!("skipping malformed prediction record {}: {}", i, e);
                }
            }
        }
    } else {
        debug!("prediction feed response missing 'predictions' array");
    }

    Ok(predictions)
}

fn filter_predictions(
    predictions: Vec<StormPrediction>,
    state: Option<&str>,
    hours: i64,
    min_tier: Option<PredictionTier>,
) -> Vec<StormPrediction> {
    // ---
    let state = state.map(str::to_ascii_uppercase);
    predictions
        .into_iter()
        .filter(|p| p.hours_until <= hours)
        .filter(|p| match &state {
            Some(code) => p.states.iter().any(|s| s.eq_ignore_ascii_case(code)),
            None => true,
        })
        .filter(|p| match min_tier {
            Some(min) => p.tier >= min,
            None => true,
        })
        .collect()
}

fn condense(predictions: &[StormPrediction]) -> PredictionsSummary {
    // ---
    let highest_severity = predictions.iter().map(|p| p.tier).max().map(|t| t.label());

    let mut states: Vec<String> = predictions
        .iter()
        .flat_map(|p| p.states.iter().cloned())
        .collect();
    states.sort();
    states.dedup();

    PredictionsSummary {
        count: predictions.len(),
        highest_severity,
        states,
    }
}
