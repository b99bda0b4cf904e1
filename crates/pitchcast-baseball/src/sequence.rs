// Sequential feature engine: running counts and at-bat history derived from
// the pitches that came before each one.
//
// Events are consumed in arrival order. For every event the engine first
// reads the state of each scope the event belongs to, emits it, and only then
// folds the event into that state, so every emitted value describes the
// situation before the pitch.
//
// Scopes:
//   pitch_count         (game, pitcher)
//   inning_pitch_count  (game, inning, pitcher)
//   at-bat history      (game, at-bat index, batter), contiguous run only

use crate::encoding::{AtBatHistory, PitchCounts, LAG_DEPTH};
use crate::pitch::{Count, PitchType, PitchTypeCounts};
use crate::record::PitchEvent;
use std::collections::{HashMap, VecDeque};
use tracing::warn;

/// Order-dependent features of one pitch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequentialFeatures {
    pub pitch_counts: PitchCounts,
    pub history: AtBatHistory,
}

/// Bookkeeping from one pass, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceStats {
    pub events: usize,
    pub at_bats: usize,
    /// Boundaries where at-bat index and batter disagreed.
    pub boundary_anomalies: usize,
}

// ---------------------------------------------------------------------------
// Scope keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GamePitcherKey {
    game_id: u64,
    pitcher_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InningPitcherKey {
    game_id: u64,
    inning: u8,
    pitcher_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AtBatKey {
    game_id: u64,
    at_bat_index: u32,
    batter_id: u64,
}

impl AtBatKey {
    fn of(event: &PitchEvent) -> Self {
        AtBatKey {
            game_id: event.game_id,
            at_bat_index: event.at_bat_index,
            batter_id: event.batter_id,
        }
    }

    /// Same game, but only one of index/batter changed.
    fn disagrees_with(&self, next: &AtBatKey) -> bool {
        self.game_id == next.game_id
            && (self.at_bat_index == next.at_bat_index) != (self.batter_id == next.batter_id)
    }
}

// ---------------------------------------------------------------------------
// At-bat state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct PriorPitch {
    pitch_type: PitchType,
    count: Count,
}

#[derive(Debug, Clone)]
struct AtBatState {
    key: AtBatKey,
    /// Most recent first, at most `LAG_DEPTH` entries.
    recent: VecDeque<PriorPitch>,
    type_counts: PitchTypeCounts,
    pitches: u32,
}

impl AtBatState {
    fn new(key: AtBatKey) -> Self {
        AtBatState {
            key,
            recent: VecDeque::with_capacity(LAG_DEPTH),
            type_counts: PitchTypeCounts::default(),
            pitches: 0,
        }
    }

    fn history(&self, count: Count) -> AtBatHistory {
        let mut ball_increases = [false; LAG_DEPTH];
        let mut strike_increases = [false; LAG_DEPTH];
        for (k, prior) in self.recent.iter().enumerate() {
            ball_increases[k] = count.balls() > prior.count.balls();
            strike_increases[k] = count.strikes() > prior.count.strikes();
        }
        AtBatHistory {
            lag_1: self.recent.front().map(|p| p.pitch_type),
            lag_2: self.recent.get(1).map(|p| p.pitch_type),
            ball_increases,
            strike_increases,
            type_counts: self.type_counts,
        }
    }

    fn record(&mut self, event: &PitchEvent) {
        if self.recent.len() == LAG_DEPTH {
            self.recent.pop_back();
        }
        self.recent.push_front(PriorPitch {
            pitch_type: event.pitch_type,
            count: event.count,
        });
        self.type_counts.increment(event.pitch_type);
        self.pitches += 1;
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct SequenceEngine {
    game_counts: HashMap<GamePitcherKey, u32>,
    inning_counts: HashMap<InningPitcherKey, u32>,
    at_bat: Option<AtBatState>,
    stats: SequenceStats,
}

/// Read a scope counter, then bump it.
fn take_and_increment<K: std::hash::Hash + Eq>(counts: &mut HashMap<K, u32>, key: K) -> u32 {
    let slot = counts.entry(key).or_insert(0);
    let prior = *slot;
    *slot += 1;
    prior
}

impl SequenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive features for a whole ordered sequence with a fresh engine.
    pub fn derive_all(events: &[PitchEvent]) -> (Vec<SequentialFeatures>, SequenceStats) {
        let mut engine = SequenceEngine::new();
        let features = events.iter().map(|e| engine.next(e)).collect();
        (features, engine.stats())
    }

    pub fn stats(&self) -> SequenceStats {
        self.stats
    }

    /// Features for the next event in arrival order.
    pub fn next(&mut self, event: &PitchEvent) -> SequentialFeatures {
        self.stats.events += 1;

        let game = take_and_increment(
            &mut self.game_counts,
            GamePitcherKey {
                game_id: event.game_id,
                pitcher_id: event.pitcher_id,
            },
        );
        let inning = take_and_increment(
            &mut self.inning_counts,
            InningPitcherKey {
                game_id: event.game_id,
                inning: event.game.inning,
                pitcher_id: event.pitcher_id,
            },
        );

        let at_bat = self.enter_at_bat(event);
        let features = SequentialFeatures {
            pitch_counts: PitchCounts {
                game,
                inning,
                at_bat: at_bat.pitches,
            },
            history: at_bat.history(event.count),
        };
        at_bat.record(event);
        features
    }

    /// The at-bat state for `event`, starting a new at-bat when the game,
    /// at-bat index, or batter differs from the previous event.
    fn enter_at_bat(&mut self, event: &PitchEvent) -> &mut AtBatState {
        let key = AtBatKey::of(event);
        let continues = match &self.at_bat {
            Some(current) if current.key == key => true,
            Some(current) => {
                if current.key.disagrees_with(&key) {
                    warn!(
                        game_id = key.game_id,
                        previous_at_bat = current.key.at_bat_index,
                        at_bat = key.at_bat_index,
                        previous_batter = current.key.batter_id,
                        batter = key.batter_id,
                        "at-bat index and batter disagree about a boundary; starting a new at-bat"
                    );
                    self.stats.boundary_anomalies += 1;
                }
                false
            }
            None => false,
        };
        if !continues {
            self.stats.at_bats += 1;
            self.at_bat = Some(AtBatState::new(key));
        }
        self.at_bat.get_or_insert_with(|| AtBatState::new(key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
