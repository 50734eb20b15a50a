//! Notify command: classify a storm prediction and fan out push
//! notifications to the targeted subscriber set.
//!
//! `POST /storm/notify` — managers and admins only; the role gate runs
//! before any subscription is read. Explicit `user_ids` target exactly
//! those users; otherwise every subscription of an active user is
//! targeted. The response reports counts — partial delivery failure is
//! never an error at this level.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::Caller;
use crate::db;
use crate::dispatch::{self, HttpPushTransport, PushPayload};
use crate::error::ApiError;
use crate::severity::PredictionTier;
use crate::AppState;
use uuid::Uuid;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/storm/notify", post(handler))
}

#[derive(Debug, Deserialize)]
struct NotifyRequest {
    // ---
    prediction_id: String,
    title: String,
    body: String,
    severity: String,
    hours_until: i64,
    #[serde(default)]
    affected_states: Vec<String>,
    user_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
struct NotifyResponse {
    // ---
    notified: usize,
    total: usize,
}

/// Handle `POST /storm/notify`.
///
/// Target selection is literal: explicit `user_ids` target exactly those
/// users, so an explicitly empty list reaches nobody rather than falling
/// back to the all-active-users broadcast. Only an absent `user_ids`
/// broadcasts.
async fn handler(
    caller: Caller,
    State(app): State<AppState>,
    Json(req): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, ApiError> {
    // ---
    caller.require_dispatch_role()?;

    let tier = validate(&req)?;

    info!(
        "POST /storm/notify - caller={} prediction={} severity={} states={:?}",
        caller.user_id,
        req.prediction_id,
        tier.label(),
        req.affected_states
    );

    let targets = match req.user_ids.as_deref() {
        Some([]) => Vec::new(),
        Some(ids) => db::subscriptions_for_users(&app.pool, ids).await?,
        None => db::active_subscriptions(&app.pool).await?,
    };

    let payload = PushPayload::classify(
        tier,
        req.title,
        req.body,
        req.hours_until,
        req.affected_states.clone(),
    );

    let transport = HttpPushTransport::new(app.http.clone(), app.config.push_gateway_url.clone());
    let timeout = std::time::Duration::from_secs(u64::from(app.config.push_timeout_secs));

    let stats = dispatch::dispatch(&app.pool, &transport, targets, payload, timeout).await;

    info!(
        "POST /storm/notify - delivered {}/{} ({} pruned)",
        stats.delivered, stats.total, stats.pruned
    );

    // The audit record is best-effort; losing it never fails the dispatch
    if let Err(e) = db::record_dispatch_activity(
        &app.pool,
        tier.label(),
        &req.affected_states,
        stats.total as i64,
        stats.delivered as i64,
    )
    .await
    {
        warn!("failed to record dispatch activity: {}", e);
    }

    Ok(Json(NotifyResponse {
        notified: stats.delivered,
        total: stats.total,
    }))
}

fn validate(req: &NotifyRequest) -> Result<PredictionTier, ApiError> {
    // ---
    let tier = PredictionTier::from_query_label(&req.severity).ok_or_else(|| {
        ApiError::Validation(format!(
            "unknown prediction severity '{}'; expected one of marginal, slight, enhanced, moderate, high",
            req.severity
        ))
    })?;

    if req.hours_until <= 0 {
        return Err(ApiError::Validation(
            "hours_until must be a positive number of hours".into(),
        ));
    }

    Ok(tier)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn request(severity: &str, hours_until: i64) -> NotifyRequest {
        // ---
        NotifyRequest {
            prediction_id: "pred-1".into(),
            title: "Storm inbound".into(),
            body: "Large hail possible".into(),
            severity: severity.to_string(),
            hours_until,
            affected_states: vec!["TX".into()],
            user_ids: None,
        }
    }

    #[test]
    fn valid_request_classifies_to_its_tier() {
        // ---
        let tier = validate(&request("enhanced", 48)).unwrap();
        assert_eq!(tier, PredictionTier::Enhanced);
    }

    #[test]
    fn unknown_severity_is_a_validation_error() {
        // ---
        assert!(matches!(
            validate(&request("apocalyptic", 48)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn non_positive_hours_are_rejected() {
        // ---
        assert!(matches!(
            validate(&request("slight", 0)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            validate(&request("slight", -6)),
            Err(ApiError::Validation(_))
        ));
    }
}
