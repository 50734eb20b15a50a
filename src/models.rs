//! Domain records and derived types for the storm intelligence engine.
//!
//! Stored records (`WeatherEvent`, `PushSubscription`, `Customer`) are owned
//! by the record store; this service reads them and only ever mutates
//! subscriptions, and only to prune terminally-dead endpoints. Severity and
//! event-type labels are stored as text, so each stored record has a raw row
//! struct that decodes through the severity model's lenient parser.
//!
//! Derived types (`ScoredPoint`, `RegionSummary`, `StormOpportunity`) are
//! computed per request and never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::severity::{PredictionTier, Severity};

// ---

/// Kind of meteorological event. Unknown labels decode as `General`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Hail,
    Wind,
    Tornado,
    Flood,
    Hurricane,
    General,
}

impl EventType {
    pub fn from_record_label(s: &str) -> EventType {
        // ---
        match s.to_ascii_lowercase().as_str() {
            "hail" => EventType::Hail,
            "wind" => EventType::Wind,
            "tornado" => EventType::Tornado,
            "flood" => EventType::Flood,
            "hurricane" => EventType::Hurricane,
            _ => EventType::General,
        }
    }
}

/// A stored meteorological event, immutable to this service.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherEvent {
    // ---
    pub id: Uuid,
    pub event_type: EventType,
    pub severity: Severity,
    pub occurred_at: DateTime<Utc>,
    /// Some events never get resolved coordinates; those are excluded
    /// from spatial outputs.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hail_diameter_in: Option<f64>,
    pub wind_speed_mph: Option<f64>,
    pub affected_customers: i64,
    pub estimated_damage: f64,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
}

/// Row shape as it comes out of `weather_events`; labels are plain text.
#[derive(Debug, sqlx::FromRow)]
pub struct WeatherEventRow {
    // ---
    pub id: Uuid,
    pub event_type: String,
    pub severity: String,
    pub occurred_at: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hail_diameter_in: Option<f64>,
    pub wind_speed_mph: Option<f64>,
    pub affected_customers: i64,
    pub estimated_damage: f64,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
}

impl WeatherEventRow {
    pub fn into_event(self) -> WeatherEvent {
        // ---
        WeatherEvent {
            id: self.id,
            event_type: EventType::from_record_label(&self.event_type),
            severity: Severity::from_record_label(&self.severity),
            occurred_at: self.occurred_at,
            latitude: self.latitude,
            longitude: self.longitude,
            hail_diameter_in: self.hail_diameter_in,
            wind_speed_mph: self.wind_speed_mph,
            affected_customers: self.affected_customers,
            estimated_damage: self.estimated_damage,
            city: self.city,
            county: self.county,
            state: self.state,
        }
    }
}

impl WeatherEvent {
    /// Human-readable region label: first non-empty of city, county and
    /// state joined with ", ", or "Unknown" when all three are absent.
    pub fn region_label(&self) -> String {
        // ---
        let parts: Vec<&str> = [&self.city, &self.county, &self.state]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect();

        if parts.is_empty() {
            "Unknown".to_string()
        } else {
            parts.join(", ")
        }
    }
}

// ---

/// Metadata snapshot carried alongside each heatmap point.
#[derive(Debug, Clone, Serialize)]
pub struct PointMetadata {
    // ---
    pub id: Uuid,
    pub event_type: EventType,
    pub severity: Severity,
    pub occurred_at: DateTime<Utc>,
    pub region: String,
    pub affected_customers: i64,
    pub estimated_damage: f64,
}

/// A weather event projected onto the heatmap. Derived, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPoint {
    // ---
    pub lat: f64,
    pub lng: f64,
    /// Normalized intensity in [0, 1], rounded to two decimals.
    pub intensity: f64,
    pub metadata: PointMetadata,
}

/// Per-region fold of scored points, ranked by total damage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    // ---
    pub region: String,
    pub event_count: usize,
    pub average_intensity: f64,
    pub total_customers: i64,
    pub total_damage: f64,
}

/// Estimated sales potential for one severity bucket in one state.
#[derive(Debug, Clone, Serialize)]
pub struct StormOpportunity {
    // ---
    pub state: String,
    pub severity: Severity,
    pub classification: &'static str,
    pub event_count: usize,
    pub estimated_homes: i64,
    pub estimated_value: i64,
}

// ---

/// A forward-looking storm prediction from the external predictive source.
#[derive(Debug, Clone, Serialize)]
pub struct StormPrediction {
    // ---
    pub id: String,
    pub tier: PredictionTier,
    pub hours_until: i64,
    pub states: Vec<String>,
    pub title: String,
    pub body: String,
}

/// Wire shape of a prediction as the upstream feed reports it.
#[derive(Debug, Deserialize)]
pub struct RawPrediction {
    // ---
    pub id: String,
    pub severity: String,
    pub hours_until: i64,
    #[serde(default)]
    pub states: Vec<String>,
    pub title: String,
    pub body: String,
}

impl RawPrediction {
    pub fn into_prediction(self) -> StormPrediction {
        // ---
        StormPrediction {
            id: self.id,
            tier: PredictionTier::from_record_label(&self.severity),
            hours_until: self.hours_until,
            states: self.states,
            title: self.title,
            body: self.body,
        }
    }
}

// ---

/// A push endpoint owned by one user. Read for targeting; deleted only
/// when the transport reports it permanently undeliverable.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PushSubscription {
    // ---
    pub id: Uuid,
    pub user_id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// Customer record, read-only, used by the affected-customers query.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    // ---
    pub id: Uuid,
    pub full_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: String,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn event_with_location(
        city: Option<&str>,
        county: Option<&str>,
        state: Option<&str>,
    ) -> WeatherEvent {
        // ---
        WeatherEvent {
            id: Uuid::new_v4(),
            event_type: EventType::Hail,
            severity: Severity::Moderate,
            occurred_at: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
            latitude: Some(32.78),
            longitude: Some(-96.80),
            hail_diameter_in: Some(1.75),
            wind_speed_mph: None,
            affected_customers: 12,
            estimated_damage: 40_000.0,
            city: city.map(String::from),
            county: county.map(String::from),
            state: state.map(String::from),
        }
    }

    #[test]
    fn region_label_joins_non_empty_parts() {
        // ---
        let full = event_with_location(Some("Dallas"), Some("Dallas County"), Some("TX"));
        assert_eq!(full.region_label(), "Dallas, Dallas County, TX");

        let no_county = event_with_location(Some("Dallas"), None, Some("TX"));
        assert_eq!(no_county.region_label(), "Dallas, TX");

        let blank_city = event_with_location(Some("  "), None, Some("TX"));
        assert_eq!(blank_city.region_label(), "TX");
    }

    #[test]
    fn region_label_defaults_to_unknown() {
        // ---
        let bare = event_with_location(None, None, None);
        assert_eq!(bare.region_label(), "Unknown");
    }

    #[test]
    fn row_conversion_is_lenient_on_labels() {
        // ---
        let row = WeatherEventRow {
            id: Uuid::new_v4(),
            event_type: "hailstorm?".into(),
            severity: "not-a-severity".into(),
            occurred_at: Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
            latitude: None,
            longitude: None,
            hail_diameter_in: None,
            wind_speed_mph: None,
            affected_customers: 0,
            estimated_damage: 0.0,
            city: None,
            county: None,
            state: None,
        };

        let event = row.into_event();
        assert_eq!(event.event_type, EventType::General);
        assert_eq!(event.severity, Severity::Minor);
    }

    #[test]
    fn raw_prediction_converts_tier() {
        // ---
        let raw = RawPrediction {
            id: "pred-1".into(),
            severity: "enhanced".into(),
            hours_until: 48,
            states: vec!["TX".into(), "OK".into()],
            title: "Large hail possible".into(),
            body: "Supercells expected Friday evening".into(),
        };

        let pred = raw.into_prediction();
        assert_eq!(pred.tier, PredictionTier::Enhanced);
        assert_eq!(pred.states.len(), 2);
    }
}
