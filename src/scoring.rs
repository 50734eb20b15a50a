//! Intensity scorer: converts one stored weather event into a normalized
//! heatmap intensity in [0, 1].
//!
//! The score is a weighted combination: the severity weight forms the base,
//! impact boosts (affected customers, reported dollar damage) add on top,
//! and a linear recency factor decays the sum toward half weight at the
//! edge of the caller's lookback window. Boosts are additive rather than
//! multiplicative: a catastrophic event with no recorded damage still
//! scores near 1.0 on severity alone, while a minor event with heavy
//! damage outranks a minor event with none.

use chrono::{DateTime, Duration, Utc};

use crate::models::{PointMetadata, ScoredPoint, WeatherEvent};

// ---

/// Affected-customer count at which the customer boost saturates.
const CUSTOMER_SATURATION: f64 = 50.0;
/// Maximum contribution of the customer boost.
const CUSTOMER_BOOST_WEIGHT: f64 = 0.3;

/// Reported damage (dollars) at which the damage boost saturates.
const DAMAGE_SATURATION: f64 = 500_000.0;
/// Maximum contribution of the damage boost.
const DAMAGE_BOOST_WEIGHT: f64 = 0.2;

/// Fraction of the score shed by an event at the far edge of the window.
const MAX_DECAY: f64 = 0.5;

/// Lookback window for a `months` query parameter. The decay formula needs
/// a fixed denominator, so a month is 30 days flat.
pub fn lookback_duration(months: u32) -> Duration {
    Duration::days(30 * i64::from(months))
}

/// Score one event against `now` and the caller's lookback window.
///
/// Returns `None` for events without resolved coordinates; those are
/// excluded from spatial outputs entirely rather than scored at a default
/// location.
pub fn score_event(
    event: &WeatherEvent,
    now: DateTime<Utc>,
    lookback: Duration,
) -> Option<ScoredPoint> {
    // ---
    let (lat, lng) = match (event.latitude, event.longitude) {
        (Some(lat), Some(lng)) => (lat, lng),
        _ => return None,
    };

    let severity_intensity = event.severity.weight();

    let customer_boost =
        (event.affected_customers as f64 / CUSTOMER_SATURATION).min(1.0) * CUSTOMER_BOOST_WEIGHT;
    let damage_boost = (event.estimated_damage / DAMAGE_SATURATION).min(1.0) * DAMAGE_BOOST_WEIGHT;

    // Callers filter the input set to the window, so age should never
    // exceed the lookback; clamp the ratio anyway to keep the range bounded.
    let age_ms = (now - event.occurred_at).num_milliseconds().max(0) as f64;
    let lookback_ms = lookback.num_milliseconds().max(1) as f64;
    let age_ratio = (age_ms / lookback_ms).min(1.0);
    let recency_factor = 1.0 - age_ratio * MAX_DECAY;

    let intensity = ((severity_intensity + customer_boost + damage_boost) * recency_factor).min(1.0);

    Some(ScoredPoint {
        lat,
        lng,
        intensity: round2(intensity),
        metadata: PointMetadata {
            id: event.id,
            event_type: event.event_type,
            severity: event.severity,
            occurred_at: event.occurred_at,
            region: event.region_label(),
            affected_customers: event.affected_customers,
            estimated_damage: event.estimated_damage,
        },
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
