//! Opportunity valuator: turns one state's recent event volume and
//! severity mix into dollar-valued sales opportunities.
//!
//! One opportunity entry is produced per severity tier present in the
//! window, worst tier first. Estimates are deterministic for a given
//! input set, monotonically non-decreasing in event count and severity,
//! and summable: the reported total is exactly the sum of the entries.

use serde::Serialize;

use crate::models::{StormOpportunity, WeatherEvent};
use crate::severity::Severity;

// ---

/// Average roof job value in dollars, before severity weighting.
const AVG_JOB_VALUE: f64 = 12_000.0;

/// Homes assumed affected per event beyond the recorded customer count.
fn base_homes(severity: Severity) -> i64 {
    // ---
    match severity {
        Severity::Minor => 15,
        Severity::Moderate => 40,
        Severity::Severe => 90,
        Severity::Catastrophic => 200,
    }
}

/// Sales-facing classification; "critical" is reserved for the top tier.
fn classification(severity: Severity) -> &'static str {
    // ---
    match severity {
        Severity::Minor => "low",
        Severity::Moderate => "moderate",
        Severity::Severe => "high",
        Severity::Catastrophic => "critical",
    }
}

/// Per-state opportunity list plus pre-formatted totals.
#[derive(Debug, Serialize)]
pub struct OpportunityReport {
    // ---
    pub state: String,
    pub opportunities: Vec<StormOpportunity>,
    pub estimated_total_value: i64,
    pub total_value_short: String,
}

/// Value all in-window events for one state.
pub fn value_opportunities(state: &str, events: &[WeatherEvent]) -> OpportunityReport {
    // ---
    let mut opportunities = Vec::new();

    // Worst tier first so reps see the biggest jobs at the top
    for severity in Severity::ALL.iter().rev().copied() {
        let bucket: Vec<&WeatherEvent> =
            events.iter().filter(|e| e.severity == severity).collect();
        if bucket.is_empty() {
            continue;
        }

        let recorded_customers: i64 = bucket.iter().map(|e| e.affected_customers).sum();
        let estimated_homes = recorded_customers + bucket.len() as i64 * base_homes(severity);
        let estimated_value =
            (estimated_homes as f64 * AVG_JOB_VALUE * severity.weight()).round() as i64;

        opportunities.push(StormOpportunity {
            state: state.to_string(),
            severity,
            classification: classification(severity),
            event_count: bucket.len(),
            estimated_homes,
            estimated_value,
        });
    }

    let estimated_total_value: i64 = opportunities.iter().map(|o| o.estimated_value).sum();

    OpportunityReport {
        state: state.to_string(),
        opportunities,
        estimated_total_value,
        total_value_short: format_short_dollars(estimated_total_value),
    }
}

/// "$NNNK"-style short form used in dashboard summaries.
fn format_short_dollars(value: i64) -> String {
    format!("${}K", (value as f64 / 1_000.0).round() as i64)
}
