//! Severity model for the storm intelligence engine.
//!
//! Two fixed ordinal scales live here: the historical event scale
//! (minor < moderate < severe < catastrophic) used by the scorer and
//! valuator, and the predictive outlook scale (marginal < slight <
//! enhanced < moderate < high) used by the classifier/notifier.
//!
//! Parsing is deliberately split in two:
//! - query parameters parse *strictly* — an unknown label is a caller
//!   error and must be reported, never defaulted;
//! - stored rows and upstream feed records parse *leniently* — an
//!   unrecognized label falls back to the lowest tier so downstream
//!   aggregation stays total. The fallback is a visible, logged branch.

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---

/// Ordinal severity of a historical weather event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Catastrophic,
}

impl Severity {
    /// All severities in ascending order.
    pub const ALL: [Severity; 4] = [
        Severity::Minor,
        Severity::Moderate,
        Severity::Severe,
        Severity::Catastrophic,
    ];

    /// Numeric weight in [0, 1], monotonically increasing across the scale.
    pub fn weight(self) -> f64 {
        // ---
        match self {
            Severity::Minor => 0.25,
            Severity::Moderate => 0.50,
            Severity::Severe => 0.75,
            Severity::Catastrophic => 1.0,
        }
    }

    /// Every severity at or above `min`, used to filter queries by a
    /// minimum-severity threshold.
    pub fn at_least(min: Severity) -> Vec<Severity> {
        Severity::ALL.iter().copied().filter(|s| *s >= min).collect()
    }

    pub fn label(self) -> &'static str {
        // ---
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Catastrophic => "catastrophic",
        }
    }

    /// Strict parse for caller-supplied labels. `None` means the caller
    /// sent something we don't recognize and should get a validation error.
    pub fn from_query_label(s: &str) -> Option<Severity> {
        // ---
        match s.to_ascii_lowercase().as_str() {
            "minor" => Some(Severity::Minor),
            "moderate" => Some(Severity::Moderate),
            "severe" => Some(Severity::Severe),
            "catastrophic" => Some(Severity::Catastrophic),
            _ => None,
        }
    }

    /// Lenient parse for labels coming out of the record store. Unknown
    /// labels fall back to the lowest weight so aggregation stays total.
    pub fn from_record_label(s: &str) -> Severity {
        // ---
        match Severity::from_query_label(s) {
            Some(sev) => sev,
            None => {
                warn!("unrecognized event severity '{}', treating as minor", s);
                Severity::Minor
            }
        }
    }
}

// ---

/// Ordinal tier of a forward-looking storm prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionTier {
    Marginal,
    Slight,
    Enhanced,
    Moderate,
    High,
}

impl PredictionTier {
    /// Presentation icon for notification payloads. Purely cosmetic;
    /// never used for routing decisions.
    pub fn icon(self) -> &'static str {
        // ---
        match self {
            PredictionTier::Marginal => "cloud-drizzle",
            PredictionTier::Slight => "cloud-rain",
            PredictionTier::Enhanced => "cloud-lightning",
            PredictionTier::Moderate => "storm-warning",
            PredictionTier::High => "tornado",
        }
    }

    pub fn label(self) -> &'static str {
        // ---
        match self {
            PredictionTier::Marginal => "marginal",
            PredictionTier::Slight => "slight",
            PredictionTier::Enhanced => "enhanced",
            PredictionTier::Moderate => "moderate",
            PredictionTier::High => "high",
        }
    }

    /// Strict parse for caller-supplied tier labels.
    pub fn from_query_label(s: &str) -> Option<PredictionTier> {
        // ---
        match s.to_ascii_lowercase().as_str() {
            "marginal" => Some(PredictionTier::Marginal),
            "slight" => Some(PredictionTier::Slight),
            "enhanced" => Some(PredictionTier::Enhanced),
            "moderate" => Some(PredictionTier::Moderate),
            "high" => Some(PredictionTier::High),
            _ => None,
        }
    }

    /// Lenient parse for tiers reported by the upstream predictive source.
    pub fn from_record_label(s: &str) -> PredictionTier {
        // ---
        match PredictionTier::from_query_label(s) {
            Some(tier) => tier,
            None => {
                warn!("unrecognized prediction tier '{}', treating as marginal", s);
                PredictionTier::Marginal
            }
        }
    }
}
