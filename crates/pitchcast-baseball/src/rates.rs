// Per-pitcher cumulative pitch-type rates.
//
// A pitcher's rate vector at a pitch is the share of each type among the
// pitches thrown strictly before it. Tallies are keyed by pitcher only, so
// they carry across games and, when one aggregator is fed several seasons in
// order, across seasons.

use crate::pitch::{PitchType, PitchTypeCounts};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// RateVector
// ---------------------------------------------------------------------------

/// Fraction of prior pitches per canonical type, in column order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateVector([f64; PitchType::COUNT]);

impl RateVector {
    /// Rates from a tally. `None` for an empty tally.
    pub fn from_counts(counts: &PitchTypeCounts) -> Option<RateVector> {
        let total = counts.total();
        if total == 0 {
            return None;
        }
        let total = f64::from(total);
        let mut rates = [0.0; PitchType::COUNT];
        for (t, n) in counts.iter() {
            rates[t.index()] = f64::from(n) / total;
        }
        Some(RateVector(rates))
    }

    /// Rates read back from a table, in column order.
    pub fn from_array(rates: [f64; PitchType::COUNT]) -> RateVector {
        RateVector(rates)
    }

    pub fn get(&self, pitch_type: PitchType) -> f64 {
        self.0[pitch_type.index()]
    }

    pub fn as_array(&self) -> &[f64; PitchType::COUNT] {
        &self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

// ---------------------------------------------------------------------------
// RateAggregator
// ---------------------------------------------------------------------------

/// Rate state emitted for one pitch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateObservation {
    /// 1-based position of this pitch among everything the pitcher has thrown.
    pub nth_pitch: u32,
    /// `None` until the pitcher has `min_pitches` prior pitches.
    pub rates: Option<RateVector>,
}

#[derive(Debug, Clone)]
pub struct RateAggregator {
    min_pitches: u32,
    tallies: HashMap<u64, PitchTypeCounts>,
}

impl RateAggregator {
    pub fn new(min_pitches: u32) -> Self {
        RateAggregator {
            // A zero gate would divide by zero on a pitcher's first pitch.
            min_pitches: min_pitches.max(1),
            tallies: HashMap::new(),
        }
    }

    pub fn min_pitches(&self) -> u32 {
        self.min_pitches
    }

    /// Emit the rate state before this pitch, then count it.
    pub fn observe(&mut self, pitcher_id: u64, pitch_type: PitchType) -> RateObservation {
        let tally = self.tallies.entry(pitcher_id).or_default();
        let prior = tally.total();
        let rates = if prior >= self.min_pitches {
            RateVector::from_counts(tally)
        } else {
            None
        };
        tally.increment(pitch_type);
        RateObservation {
            nth_pitch: prior + 1,
            rates,
        }
    }

    /// Pitches seen so far for a pitcher.
    pub fn pitches_seen(&self, pitcher_id: u64) -> u32 {
        self.tallies.get(&pitcher_id).map_or(0, PitchTypeCounts::total)
    }

    pub fn num_pitchers(&self) -> usize {
        self.tallies.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
