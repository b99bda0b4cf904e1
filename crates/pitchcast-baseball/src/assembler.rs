// Inference-time feature assembly.
//
// Turns a pitcher's snapshot plus caller-supplied live inputs into the same
// vector a training row with those inputs encodes to. Contract violations
// fail before anything is encoded.

use crate::encoding::{self, AtBatHistory, FeatureEncoding, FeatureVector, GameState, ModelInputs, PitchCounts};
use crate::pitch::{Count, InvalidCount};
use crate::snapshot::SnapshotTable;
use pitchcast_core::config::InputLimits;
use tracing::debug;

/// Live situation for one prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveInputs {
    pub game: GameState,
    pub pitch_counts: PitchCounts,
    pub batter_lefty: bool,
    pub balls: u8,
    pub strikes: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    #[error("no snapshot for pitcher '{0}'")]
    UnknownPitcher(String),

    #[error(transparent)]
    InvalidCount(#[from] InvalidCount),

    #[error("{field} = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("failed to encode features: {0}")]
    Encode(#[from] encoding::EncodeError),
}

/// Builds feature vectors against a read-only snapshot table.
///
/// Holds no mutable state, so one assembler can serve any number of
/// requests, including from several threads.
#[derive(Debug, Clone, Copy)]
pub struct InferenceAssembler<'a> {
    snapshots: &'a SnapshotTable,
    limits: InputLimits,
}

impl<'a> InferenceAssembler<'a> {
    pub fn new(snapshots: &'a SnapshotTable, limits: InputLimits) -> Self {
        InferenceAssembler { snapshots, limits }
    }

    pub fn limits(&self) -> &InputLimits {
        &self.limits
    }

    /// Simplified vector: direct fields, snapshot rates, count one-hot.
    pub fn assemble(&self, pitcher_name: &str, live: &LiveInputs) -> Result<FeatureVector, AssemblyError> {
        self.build(pitcher_name, live, None, FeatureEncoding::Simplified)
    }

    /// Full vector, for callers that can also supply the current at-bat's history.
    pub fn assemble_with_history(
        &self,
        pitcher_name: &str,
        live: &LiveInputs,
        history: &AtBatHistory,
    ) -> Result<FeatureVector, AssemblyError> {
        self.build(pitcher_name, live, Some(history), FeatureEncoding::Full)
    }

    fn build(
        &self,
        pitcher_name: &str,
        live: &LiveInputs,
        history: Option<&AtBatHistory>,
        encoding: FeatureEncoding,
    ) -> Result<FeatureVector, AssemblyError> {
        let snapshot = self
            .snapshots
            .find(pitcher_name)
            .ok_or_else(|| AssemblyError::UnknownPitcher(pitcher_name.to_string()))?;
        let count = Count::new(live.balls, live.strikes)?;
        self.check_ranges(live)?;
        if let Some(history) = history {
            check_range("ab_pitch_count", history.type_counts.total(), 0, live.pitch_counts.at_bat)?;
        }

        let inputs = ModelInputs {
            game: live.game,
            pitch_counts: live.pitch_counts,
            pitcher_lefty: snapshot.pitcher_lefty,
            batter_lefty: live.batter_lefty,
            rates: &snapshot.rates,
            count,
            history,
        };
        let vector = encoding::encode(&inputs, encoding)?;
        debug!("assembled {} vector for {}", encoding, pitcher_name);
        Ok(vector)
    }

    fn check_ranges(&self, live: &LiveInputs) -> Result<(), AssemblyError> {
        let game = &live.game;
        let counts = &live.pitch_counts;
        check_range("inning", u32::from(game.inning), 1, u32::from(u8::MAX))?;
        check_range("outs", u32::from(game.outs), 0, 2)?;
        check_range("pitch_count", counts.game, 0, self.limits.max_pitch_count)?;
        check_range(
            "inning_pitch_count",
            counts.inning,
            0,
            self.limits.max_inning_pitch_count.min(counts.game),
        )?;
        // The at-bat count spans pitching changes, so it is not nested in the
        // pitcher's inning count.
        check_range("ab_pitch_count", counts.at_bat, 0, self.limits.max_ab_pitch_count)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), AssemblyError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(AssemblyError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
