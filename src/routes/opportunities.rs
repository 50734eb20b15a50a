//! Opportunities query: dollar-valued sales opportunities for one state.
//!
//! `GET /storm/opportunities?state=TX&months=6` — `state` is required and
//! must be a two-letter code; its absence is a client error, never a
//! default-to-all-states fallback. This engine intentionally does not
//! aggregate opportunities across multiple states in one call.

use axum::{extract::Query, extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::auth::Caller;
use crate::db;
use crate::error::ApiError;
use crate::opportunity::{self, OpportunityReport};
use crate::scoring;
use crate::AppState;

// ---

const DEFAULT_MONTHS: u32 = 6;

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/storm/opportunities", get(handler))
}

#[derive(Debug, Deserialize)]
struct OpportunitiesQuery {
    // ---
    state: Option<String>,
    months: Option<u32>,
}

async fn handler(
    _caller: Caller,
    Query(params): Query<OpportunitiesQuery>,
    State(app): State<AppState>,
) -> Result<Json<OpportunityReport>, ApiError> {
    // ---
    let (state_code, months) = validate(&params)?;

    info!("GET /storm/opportunities - state={} months={}", state_code, months);

    let since = Utc::now() - scoring::lookback_duration(months);
    let events = db::events_for_state(&app.pool, &state_code, since).await?;
    let report = opportunity::value_opportunities(&state_code, &events);

    info!(
        "GET /storm/opportunities - {} entries, total {}",
        report.opportunities.len(),
        report.total_value_short
    );

    Ok(Json(report))
}

fn validate(params: &OpportunitiesQuery) -> Result<(String, u32), ApiError> {
    // ---
    let state = params
        .state
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("missing required parameter: state".into()))?;

    if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::Validation(format!(
            "state must be a two-letter code, got '{state}'"
        )));
    }

    let months = params.months.unwrap_or(DEFAULT_MONTHS);
    if months == 0 {
        return Err(ApiError::Validation(
            "months must be a positive number of months".into(),
        ));
    }

    Ok((state.to_ascii_uppercase(), months))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn missing_state_is_a_client_error() {
        // ---
        let params = OpportunitiesQuery {
            state: None,
            months: None,
        };
        assert!(matches!(validate(&params), Err(ApiError::Validation(_))));

        let blank = OpportunitiesQuery {
            state: Some("   ".into()),
            months: None,
        };
        assert!(matches!(validate(&blank), Err(ApiError::Validation(_))));
    }

    #[test]
    fn state_must_be_two_letters() {
        // ---
        let long = OpportunitiesQuery {
            state: Some("Texas".into()),
            months: None,
        };
        assert!(matches!(validate(&long), Err(ApiError::Validation(_))));

        let digits = OpportunitiesQuery {
            state: Some("T1".into()),
            months: None,
        };
        assert!(matches!(validate(&digits), Err(ApiError::Validation(_))));
    }

    #[test]
    fn valid_state_is_normalized_uppercase() {
        // ---
        let params = OpportunitiesQuery {
            state: Some("tx".into()),
            months: Some(3),
        };
        let (state, months) = validate(&params).unwrap();
        assert_eq!(state, "TX");
        assert_eq!(months, 3);
    }
}
