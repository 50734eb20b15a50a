//! Query layer over the record store.
//!
//! Everything here is read-only except `delete_subscription` and
//! `record_dispatch_activity`: pruning terminally-dead push endpoints
//! and writing the dispatch audit record are the only mutation rights
//! this service holds.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Customer, PushSubscription, WeatherEvent, WeatherEventRow};
use crate::severity::Severity;

// ---

/// Labels for a `severity = ANY(..)` predicate, or `None` when the
/// threshold is the floor. At `minor` every row qualifies, including
/// rows with an unrecognized severity label: those must reach the
/// lenient decoder and score at the lowest weight, not vanish at the
/// SQL layer.
fn severity_filter_labels(min_severity: Severity) -> Option<Vec<String>> {
    // ---
    if min_severity == Severity::Minor {
        return None;
    }
    Some(
        Severity::at_least(min_severity)
            .into_iter()
            .map(|s| s.label().to_string())
            .collect(),
    )
}

/// Events at or above `min_severity` that occurred since `since`.
/// The severity filter excludes lower tiers at the query, not by
/// down-weighting later.
pub async fn events_since(
    pool: &PgPool,
    since: DateTime<Utc>,
    min_severity: Severity,
) -> Result<Vec<WeatherEvent>, sqlx::Error> {
    // ---
    let rows = match severity_filter_labels(min_severity) {
        Some(labels) => {
            sqlx::query_as::<_, WeatherEventRow>(
                r#"
                SELECT id, event_type, severity, occurred_at,
                       latitude, longitude, hail_diameter_in, wind_speed_mph,
                       affected_customers, estimated_damage, city, county, state
                FROM weather_events
                WHERE occurred_at >= $1
                  AND severity = ANY($2)
                ORDER BY occurred_at DESC
                "#,
            )
            .bind(since)
            .bind(&labels)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, WeatherEventRow>(
                r#"
                SELECT id, event_type, severity, occurred_at,
                       latitude, longitude, hail_diameter_in, wind_speed_mph,
                       affected_customers, estimated_damage, city, county, state
                FROM weather_events
                WHERE occurred_at >= $1
                ORDER BY occurred_at DESC
                "#,
            )
            .bind(since)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows.into_iter().map(WeatherEventRow::into_event).collect())
}

/// All in-window events for one state code.
pub async fn events_for_state(
    pool: &PgPool,
    state: &str,
    since: DateTime<Utc>,
) -> Result<Vec<WeatherEvent>, sqlx::Error> {
    // ---
    let rows = sqlx::query_as::<_, WeatherEventRow>(
        r#"
        SELECT id, event_type, severity, occurred_at,
               latitude, longitude, hail_diameter_in, wind_speed_mph,
               affected_customers, estimated_damage, city, county, state
        FROM weather_events
        WHERE state = $1
          AND occurred_at >= $2
        ORDER BY occurred_at DESC
        "#,
    )
    .bind(state)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(WeatherEventRow::into_event).collect())
}

// ---

/// Subscriptions belonging to exactly the given users.
pub async fn subscriptions_for_users(
    pool: &PgPool,
    user_ids: &[Uuid],
) -> Result<Vec<PushSubscription>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, PushSubscription>(
        r#"
        SELECT id, user_id, endpoint, p256dh, auth
        FROM push_subscriptions
        WHERE user_id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await
}

/// Every subscription belonging to an active user. No geographic filter:
/// subscriptions are not state-tagged.
pub async fn active_subscriptions(pool: &PgPool) -> Result<Vec<PushSubscription>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, PushSubscription>(
        r#"
        SELECT s.id, s.user_id, s.endpoint, s.p256dh, s.auth
        FROM push_subscriptions s
        JOIN users u ON u.id = s.user_id
        WHERE u.is_active
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Delete one subscription row. Returns `false` when the row was already
/// gone, which callers treat as already-handled rather than an error.
pub async fn delete_subscription(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    // ---
    let result = sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// ---

/// Customers located in any of the given states, capped by `limit`.
pub async fn customers_in_states(
    pool: &PgPool,
    states: &[String],
    limit: i64,
) -> Result<Vec<Customer>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Customer>(
        r#"
        SELECT id, full_name, phone, city, state
        FROM customers
        WHERE state = ANY($1)
        ORDER BY state, full_name
        LIMIT $2
        "#,
    )
    .bind(states)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Audit record for one notify dispatch.
pub async fn record_dispatch_activity(
    pool: &PgPool,
    severity: &str,
    affected_states: &[String],
    attempted: i64,
    delivered: i64,
) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO storm_activity (severity, affected_states, attempted, delivered)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(severity)
    .bind(affected_states)
    .bind(attempted)
    .bind(delivered)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::scoring;
    use chrono::TimeZone;

    #[test]
    fn minor_threshold_applies_no_severity_predicate() {
        // ---
        // At the floor, rows with unrecognized labels must not be
        // filtered out before the lenient decoder sees them.
        assert_eq!(severity_filter_labels(Severity::Minor), None);
    }

    #[test]
    fn higher_thresholds_list_qualifying_labels() {
        // ---
        assert_eq!(
            severity_filter_labels(Severity::Severe),
            Some(vec!["severe".to_string(), "catastrophic".to_string()])
        );
        assert_eq!(
            severity_filter_labels(Severity::Catastrophic),
            Some(vec!["catastrophic".to_string()])
        );
    }

    #[test]
    fn unknown_label_survives_a_minor_query_and_scores_as_minor() {
        // ---
        // With no predicate at the minor threshold this row comes back
        // from the store; the lenient decoder must land it at the
        // lowest weight instead of dropping it.
        assert_eq!(severity_filter_labels(Severity::Minor), None);

        let occurred_at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let row = WeatherEventRow {
            id: Uuid::new_v4(),
            event_type: "hail".into(),
            severity: "unheard-of".into(),
            occurred_at,
            latitude: Some(36.15),
            longitude: Some(-95.99),
            hail_diameter_in: None,
            wind_speed_mph: None,
            affected_customers: 0,
            estimated_damage: 0.0,
            city: Some("Tulsa".into()),
            county: None,
            state: Some("OK".into()),
        };

        let event = row.into_event();
        assert_eq!(event.severity, Severity::Minor);

        let point =
            scoring::score_event(&event, occurred_at, scoring::lookback_duration(6)).unwrap();
        assert_eq!(point.intensity, Severity::Minor.weight());
    }
}
