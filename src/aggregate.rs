//! Regional aggregator: folds scored heatmap points into per-region
//! summaries and ranks the hardest-hit regions by total reported damage.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{RegionSummary, ScoredPoint};

// ---

/// How many regions the ranked list is truncated to.
const TOP_REGIONS: usize = 10;

/// Overall roll-up returned alongside the heatmap points.
#[derive(Debug, Serialize)]
pub struct HeatmapSummary {
    // ---
    pub total_events: usize,
    pub average_intensity: f64,
    pub top_regions: Vec<RegionSummary>,
}

struct RegionAccum {
    // ---
    event_count: usize,
    intensity_sum: f64,
    total_customers: i64,
    total_damage: f64,
}

/// Fold all scored points into the per-region top-10 plus overall stats.
///
/// Regions rank by total damage descending; ties break on the region label
/// ascending so the ordering is deterministic regardless of traversal order.
pub fn summarize(points: &[ScoredPoint]) -> HeatmapSummary {
    // ---
    let mut regions: HashMap<String, RegionAccum> = HashMap::new();

    for point in points {
        let entry = regions
            .entry(point.metadata.region.clone())
            .or_insert(RegionAccum {
                event_count: 0,
                intensity_sum: 0.0,
                total_customers: 0,
                total_damage: 0.0,
            });
        entry.event_count += 1;
        entry.intensity_sum += point.intensity;
        entry.total_customers += point.metadata.affected_customers;
        entry.total_damage += point.metadata.estimated_damage;
    }

    let mut ranked: Vec<RegionSummary> = regions
        .into_iter()
        .map(|(region, acc)| RegionSummary {
            region,
            event_count: acc.event_count,
            average_intensity: round2(acc.intensity_sum / acc.event_count as f64),
            total_customers: acc.total_customers,
            total_damage: acc.total_damage,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.total_damage
            .partial_cmp(&a.total_damage)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.region.cmp(&b.region))
    });
    ranked.truncate(TOP_REGIONS);

    let average_intensity = if points.is_empty() {
        0.0
    } else {
        round2(points.iter().map(|p| p.intensity).sum::<f64>() / points.len() as f64)
    };

    HeatmapSummary {
        total_events: points.len(),
        average_intensity,
        top_regions: ranked,
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{EventType, PointMetadata};
    use crate::severity::Severity;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn point(region: &str, intensity: f64, customers: i64, damage: f64) -> ScoredPoint {
        // ---
        ScoredPoint {
            lat: 35.0,
            lng: -97.0,
            intensity,
            metadata: PointMetadata {
                id: Uuid::new_v4(),
                event_type: EventType::Wind,
                severity: Severity::Moderate,
                occurred_at: Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap(),
                region: region.to_string(),
                affected_customers: customers,
                estimated_damage: damage,
            },
        }
    }

    #[test]
    fn sums_and_average_are_sound() {
        // ---
        let points = vec![
            point("Tulsa, OK", 0.8, 10, 100_000.0),
            point("Tulsa, OK", 0.4, 5, 50_000.0),
            point("Moore, OK", 0.9, 20, 300_000.0),
        ];

        let summary = summarize(&points);
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.average_intensity, 0.7);

        let tulsa = summary
            .top_regions
            .iter()
            .find(|r| r.region == "Tulsa, OK")
            .unwrap();
        assert_eq!(tulsa.event_count, 2);
        assert_eq!(tulsa.total_damage, 150_000.0);
        assert_eq!(tulsa.total_customers, 15);
        assert_eq!(tulsa.average_intensity, 0.6);
    }

    #[test]
    fn regions_rank_by_damage_descending() {
        // ---
        let points = vec![
            point("A", 0.5, 0, 10_000.0),
            point("B", 0.5, 0, 90_000.0),
            point("C", 0.5, 0, 40_000.0),
        ];

        let regions = summarize(&points).top_regions;
        let order: Vec<&str> = regions.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(order, vec!["B", "C", "A"]);
    }

    #[test]
    fn equal_damage_ties_break_on_label() {
        // ---
        let points = vec![
            point("Wichita, KS", 0.5, 0, 25_000.0),
            point("Ada, OK", 0.5, 0, 25_000.0),
        ];

        let regions = summarize(&points).top_regions;
        assert_eq!(regions[0].region, "Ada, OK");
        assert_eq!(regions[1].region, "Wichita, KS");
    }

    #[test]
    fn list_truncates_to_top_ten_by_damage() {
        // ---
        let points: Vec<ScoredPoint> = (0..15)
            .map(|i| point(&format!("Region-{i:02}"), 0.5, 0, f64::from(i) * 1_000.0))
            .collect();

        let regions = summarize(&points).top_regions;
        assert_eq!(regions.len(), 10);
        // The five lowest-damage regions (00..04) fall outside the cut
        for r in &regions {
            let idx: u32 = r.region[7..].parse().unwrap();
            assert!(idx >= 5, "region {} should be outside the top 10", r.region);
        }
    }

    #[test]
    fn empty_input_yields_empty_summary() {
        // ---
        let summary = summarize(&[]);
        assert_eq!(summary.total_events, 0);
        assert_eq!(summary.average_intensity, 0.0);
        assert!(summary.top_regions.is_empty());
    }
}
