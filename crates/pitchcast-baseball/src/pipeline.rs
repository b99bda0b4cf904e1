// Season pipeline: raw pitches in arrival order -> season feature table.
//
// One linear pass per season drives the sequential engine and the rate
// aggregator side by side. The aggregator outlives a single season, so
// feeding several seasons in order through one pipeline carries each
// pitcher's rates across them; the engine and the per-season pitch index
// start fresh every season.

use crate::rates::RateAggregator;
use crate::record::{drop_malformed, RawPitch};
use crate::sequence::SequenceEngine;
use crate::table::FeatureRow;
use std::collections::HashMap;
use tracing::info;

/// Summary of one `process_season` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeasonReport {
    pub raw_records: usize,
    pub dropped_malformed: usize,
    pub rows: usize,
    pub at_bats: usize,
    pub boundary_anomalies: usize,
    pub rows_with_rates: usize,
}

#[derive(Debug)]
pub struct SeasonPipeline {
    rates: RateAggregator,
}

impl SeasonPipeline {
    pub fn new(min_pitches: u32) -> Self {
        SeasonPipeline {
            rates: RateAggregator::new(min_pitches),
        }
    }

    pub fn min_pitches(&self) -> u32 {
        self.rates.min_pitches()
    }

    /// Build the feature table for one season's raw pitches, in arrival order.
    pub fn process_season(&mut self, season: &str, raw: Vec<RawPitch>) -> (Vec<FeatureRow>, SeasonReport) {
        let raw_records = raw.len();
        let (events, dropped_malformed) = drop_malformed(raw);

        let mut engine = SequenceEngine::new();
        let mut season_counts: HashMap<u64, u32> = HashMap::new();
        let mut rows = Vec::with_capacity(events.len());

        for event in events {
            let features = engine.next(&event);
            let observation = self.rates.observe(event.pitcher_id, event.pitch_type);
            let nth_season_pitch = {
                let n = season_counts.entry(event.pitcher_id).or_insert(0);
                *n += 1;
                *n
            };
            rows.push(FeatureRow {
                event,
                features,
                nth_pitch: observation.nth_pitch,
                nth_season_pitch,
                rates: observation.rates,
            });
        }

        let stats = engine.stats();
        let report = SeasonReport {
            raw_records,
            dropped_malformed,
            rows: rows.len(),
            at_bats: stats.at_bats,
            boundary_anomalies: stats.boundary_anomalies,
            rows_with_rates: rows.iter().filter(|r| r.rates.is_some()).count(),
        };
        info!(
            season,
            raw = report.raw_records,
            dropped = report.dropped_malformed,
            rows = report.rows,
            at_bats = report.at_bats,
            anomalies = report.boundary_anomalies,
            with_rates = report.rows_with_rates,
            pitchers = season_counts.len(),
            "season feature table built"
        );
        (rows, report)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
