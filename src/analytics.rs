//! In-memory traffic analytics.
//!
//! Entries and exits are bucketed by hour and by day through epoch
//! coarsening, with per-bucket and session-wide peak occupancy. The chart
//! series render to CSV with the `Time,Entries,Exits,Peak Count` header.
//! Nothing persists; the aggregator lives and dies with the process.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{epoch_seconds, TimeBucket};

const HOUR_S: u32 = 3_600;
const DAY_S: u32 = 86_400;

// Epoch day zero was a Thursday.
const WEEKDAYS: [&str; 7] = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"];

/// One chart point: a labelled bucket of traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrafficPoint {
    pub label: String,
    pub entries: u64,
    pub exits: u64,
    pub peak: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct BucketTotals {
    entries: u64,
    exits: u64,
    peak: u32,
}

#[derive(Debug, Default)]
pub struct TrafficAggregator {
    hourly: BTreeMap<u64, BucketTotals>,
    daily: BTreeMap<u64, BucketTotals>,
    session_peak: u32,
}

impl TrafficAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one entry together with the occupancy reached after it.
    pub fn record_entry(&mut self, occupancy: u32) {
        self.record_entry_at(epoch_seconds(), occupancy);
    }

    /// Record one exit together with the occupancy reached after it.
    pub fn record_exit(&mut self, occupancy: u32) {
        self.record_exit_at(epoch_seconds(), occupancy);
    }

    fn record_entry_at(&mut self, epoch_s: u64, occupancy: u32) {
        self.touch(epoch_s, occupancy, |totals| totals.entries += 1);
    }

    fn record_exit_at(&mut self, epoch_s: u64, occupancy: u32) {
        self.touch(epoch_s, occupancy, |totals| totals.exits += 1);
    }

    fn touch<F>(&mut self, epoch_s: u64, occupancy: u32, bump: F)
    where
        F: Fn(&mut BucketTotals),
    {
        let hour = TimeBucket::from_epoch_s(epoch_s, HOUR_S);
        let day = hour.coarsen_to(DAY_S);
        for (map, bucket) in [(&mut self.hourly, hour), (&mut self.daily, day)] {
            let totals = map.entry(bucket.start_epoch_s).or_default();
            bump(totals);
            totals.peak = totals.peak.max(occupancy);
        }
        self.session_peak = self.session_peak.max(occupancy);
    }

    /// Hourly series in time order, labelled `HH:00`.
    pub fn hourly(&self) -> Vec<TrafficPoint> {
        self.hourly
            .iter()
            .map(|(&start, totals)| TrafficPoint {
                label: format!("{:02}:00", (start % u64::from(DAY_S)) / u64::from(HOUR_S)),
                entries: totals.entries,
                exits: totals.exits,
                peak: totals.peak,
            })
            .collect()
    }

    /// Daily series in time order, labelled by weekday.
    pub fn daily(&self) -> Vec<TrafficPoint> {
        self.daily
            .iter()
            .map(|(&start, totals)| TrafficPoint {
                label: WEEKDAYS[((start / u64::from(DAY_S)) % 7) as usize].to_string(),
                entries: totals.entries,
                exits: totals.exits,
                peak: totals.peak,
            })
            .collect()
    }

    /// Highest occupancy observed since the aggregator was created.
    pub fn session_peak(&self) -> u32 {
        self.session_peak
    }
}

/// Render a chart series as CSV: a header row plus one comma-joined line
/// per point, no trailing newline.
pub fn to_csv(points: &[TrafficPoint]) -> String {
    let mut lines = Vec::with_capacity(points.len() + 1);
    lines.push("Time,Entries,Exits,Peak Count".to_string());
    for point in points {
        lines.push(format!(
            "{},{},{},{}",
            point.label, point.entries, point.exits, point.peak
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1970-01-02 09:xx UTC, a Friday.
    const FRIDAY_9AM: u64 = DAY_S as u64 + 9 * HOUR_S as u64 + 120;

    #[test]
    fn records_land_in_hour_and_day_buckets() {
        let mut traffic = TrafficAggregator::new();
        traffic.record_entry_at(FRIDAY_9AM, 1);
        traffic.record_entry_at(FRIDAY_9AM + 30, 2);
        traffic.record_exit_at(FRIDAY_9AM + 60, 1);

        let hourly = traffic.hourly();
        assert_eq!(hourly.len(), 1);
        assert_eq!(hourly[0].label, "09:00");
        assert_eq!(hourly[0].entries, 2);
        assert_eq!(hourly[0].exits, 1);
        assert_eq!(hourly[0].peak, 2);

        let daily = traffic.daily();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].label, "Fri");
        assert_eq!(daily[0].entries, 2);
    }

    #[test]
    fn hour_boundary_splits_the_series() {
        let mut traffic = TrafficAggregator::new();
        traffic.record_entry_at(FRIDAY_9AM, 1);
        traffic.record_entry_at(FRIDAY_9AM + u64::from(HOUR_S), 2);

        let hourly = traffic.hourly();
        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[0].label, "09:00");
        assert_eq!(hourly[1].label, "10:00");

        // Same day, so the daily series stays combined.
        let daily = traffic.daily();
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].entries, 2);
    }

    #[test]
    fn peak_tracks_the_highest_occupancy_seen() {
        let mut traffic = TrafficAggregator::new();
        traffic.record_entry_at(FRIDAY_9AM, 4);
        traffic.record_exit_at(FRIDAY_9AM + 10, 3);
        traffic.record_entry_at(FRIDAY_9AM + 20, 4);

        assert_eq!(traffic.hourly()[0].peak, 4);
        assert_eq!(traffic.session_peak(), 4);
    }

    #[test]
    fn csv_matches_the_export_shape() {
        let points = vec![
            TrafficPoint {
                label: "09:00".into(),
                entries: 3,
                exits: 1,
                peak: 4,
            },
            TrafficPoint {
                label: "10:00".into(),
                entries: 0,
                exits: 2,
                peak: 2,
            },
        ];
        assert_eq!(
            to_csv(&points),
            "Time,Entries,Exits,Peak Count\n09:00,3,1,4\n10:00,0,2,2"
        );
    }

    #[test]
    fn empty_series_renders_only_the_header() {
        assert_eq!(to_csv(&[]), "Time,Entries,Exits,Peak Count");
    }
}
