// Feature encodings: the one declaration of model column order, and the one
// function that turns model inputs into a numeric vector.
//
// Training export and the inference assembler both go through `encode`, so
// a row and a live request with the same inputs produce identical vectors.

use crate::pitch::{Count, PitchType, PitchTypeCounts, NO_LAG};
use crate::rates::RateVector;
use serde::ser::{Serialize, SerializeStruct, Serializer};

pub use pitchcast_core::config::FeatureEncoding;

// ---------------------------------------------------------------------------
// Column declaration
// ---------------------------------------------------------------------------

/// Direct (un-transformed) model inputs, in column order.
pub const DIRECT_COLUMNS: [&str; 13] = [
    "inning",
    "top",
    "outs",
    "runner_1",
    "runner_2",
    "runner_3",
    "home_score",
    "away_score",
    "pitch_count",
    "inning_pitch_count",
    "ab_pitch_count",
    "pitcher_lefty",
    "batter_lefty",
];

/// How many earlier pitches the ball/strike lag features look back.
pub const LAG_DEPTH: usize = 3;

/// Column names of the one-hot encoding of a lagged pitch type.
fn lag_dummy_columns(lag: usize) -> impl Iterator<Item = String> {
    std::iter::once(format!("pitch_type_lag_{lag}_{NO_LAG}")).chain(
        PitchType::ALL
            .into_iter()
            .map(move |t| format!("pitch_type_lag_{lag}_{}", t.as_str())),
    )
}

/// Names of the ball/strike lag columns: `lag_1_ball, lag_1_strike, ...`.
pub fn lag_count_columns() -> Vec<String> {
    (1..=LAG_DEPTH)
        .flat_map(|k| [format!("lag_{k}_ball"), format!("lag_{k}_strike")])
        .collect()
}

/// Ordered column names for an encoding.
pub fn columns(encoding: FeatureEncoding) -> Vec<String> {
    let mut cols: Vec<String> = DIRECT_COLUMNS.iter().map(|c| c.to_string()).collect();
    cols.extend(PitchType::ALL.iter().map(|t| t.rate_column()));
    cols.extend(Count::ALL.iter().map(|c| c.dummy_column()));
    if encoding == FeatureEncoding::Full {
        cols.extend(lag_dummy_columns(1));
        cols.extend(lag_dummy_columns(2));
        cols.extend(lag_count_columns());
        cols.extend(PitchType::ALL.iter().map(|t| t.ab_count_column()));
    }
    cols
}

/// Number of columns in an encoding.
pub fn width(encoding: FeatureEncoding) -> usize {
    let simplified = DIRECT_COLUMNS.len() + PitchType::COUNT + Count::DOMAIN_SIZE;
    match encoding {
        FeatureEncoding::Simplified => simplified,
        FeatureEncoding::Full => {
            simplified + 2 * (PitchType::COUNT + 1) + 2 * LAG_DEPTH + PitchType::COUNT
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Game situation before a pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameState {
    pub inning: u8,
    pub top: bool,
    pub outs: u8,
    /// Occupancy of first, second and third base.
    pub runners: [bool; 3],
    pub home_score: u16,
    pub away_score: u16,
}

/// Pitches already thrown before the current one, per scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PitchCounts {
    /// By this pitcher this game.
    pub game: u32,
    /// By this pitcher this inning.
    pub inning: u32,
    /// In the current at-bat.
    pub at_bat: u32,
}

/// What has already happened in the current at-bat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtBatHistory {
    pub lag_1: Option<PitchType>,
    pub lag_2: Option<PitchType>,
    /// `ball_increases[k-1]`: balls went up since the pitch k positions back.
    pub ball_increases: [bool; LAG_DEPTH],
    pub strike_increases: [bool; LAG_DEPTH],
    pub type_counts: PitchTypeCounts,
}

/// Everything the model consumes for one prediction.
#[derive(Debug, Clone, Copy)]
pub struct ModelInputs<'a> {
    pub game: GameState,
    pub pitch_counts: PitchCounts,
    pub pitcher_lefty: bool,
    pub batter_lefty: bool,
    pub rates: &'a RateVector,
    pub count: Count,
    /// Required by the full encoding only.
    pub history: Option<&'a AtBatHistory>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("pitcher rate vector is undefined (fewer than the minimum prior pitches)")]
    UndefinedRate,

    #[error("the full encoding needs the at-bat history")]
    MissingHistory,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A fixed-width numeric vector in the column order of its encoding.
///
/// Serializes as `{ "encoding", "columns", "values" }` so a consumer can
/// check the order it receives against the order it was trained with.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    encoding: FeatureEncoding,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn encoding(&self) -> FeatureEncoding {
        self.encoding
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn columns(&self) -> Vec<String> {
        columns(self.encoding)
    }

    /// Value of a named column, if the encoding has it.
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns()
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FeatureVector", 3)?;
        state.serialize_field("encoding", &self.encoding)?;
        state.serialize_field("columns", &self.columns())?;
        state.serialize_field("values", &self.values)?;
        state.end()
    }
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn push_lag_dummies(values: &mut Vec<f64>, lag: Option<PitchType>) {
    values.push(flag(lag.is_none()));
    values.extend(PitchType::ALL.iter().map(|t| flag(lag == Some(*t))));
}

/// Encode model inputs in the column order of `encoding`.
pub fn encode(inputs: &ModelInputs<'_>, encoding: FeatureEncoding) -> Result<FeatureVector, EncodeError> {
    let history = match (encoding, inputs.history) {
        (FeatureEncoding::Full, None) => return Err(EncodeError::MissingHistory),
        (_, history) => history,
    };

    let mut values = Vec::with_capacity(width(encoding));
    let game = &inputs.game;
    values.push(f64::from(game.inning));
    values.push(flag(game.top));
    values.push(f64::from(game.outs));
    values.extend(game.runners.iter().map(|r| flag(*r)));
    values.push(f64::from(game.home_score));
    values.push(f64::from(game.away_score));
    values.push(f64::from(inputs.pitch_counts.game));
    values.push(f64::from(inputs.pitch_counts.inning));
    values.push(f64::from(inputs.pitch_counts.at_bat));
    values.push(flag(inputs.pitcher_lefty));
    values.push(flag(inputs.batter_lefty));

    values.extend(PitchType::ALL.iter().map(|t| inputs.rates.get(*t)));

    let hot = inputs.count.index();
    values.extend((0..Count::DOMAIN_SIZE).map(|i| flag(i == hot)));

    if encoding == FeatureEncoding::Full {
        if let Some(history) = history {
            push_lag_dummies(&mut values, history.lag_1);
            push_lag_dummies(&mut values, history.lag_2);
            for k in 0..LAG_DEPTH {
                values.push(flag(history.ball_increases[k]));
                values.push(flag(history.strike_increases[k]));
            }
            values.extend(history.type_counts.iter().map(|(_, n)| f64::from(n)));
        }
    }

    debug_assert_eq!(values.len(), width(encoding));
    Ok(FeatureVector { encoding, values })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn game() -> GameState {
        GameState {
            inning: 7,
            top: true,
            outs: 2,
            runners: [true, false, true],
            home_score: 3,
            away_score: 4,
        }
    }

    fn rates() -> RateVector {
        RateVector::from_counts(&PitchTypeCounts::from_array([50, 10, 10, 5, 5, 10, 5, 0, 5]))
            .unwrap()
    }

    fn inputs<'a>(rates: &'a RateVector, history: Option<&'a AtBatHistory>) -> ModelInputs<'a> {
        ModelInputs {
            game: game(),
            pitch_counts: PitchCounts {
                game: 88,
                inning: 12,
                at_bat: 4,
            },
            pitcher_lefty: true,
            batter_lefty: false,
            rates,
            count: Count::new(2, 1).unwrap(),
            history,
        }
    }

    #[test]
    fn column_counts_match_width() {
        assert_eq!(columns(FeatureEncoding::Simplified).len(), 34);
        assert_eq!(width(FeatureEncoding::Simplified), 34);
        assert_eq!(columns(FeatureEncoding::Full).len(), 69);
        assert_eq!(width(FeatureEncoding::Full), 69);
    }

    #[test]
    fn simplified_column_order() {
        let cols = columns(FeatureEncoding::Simplified);
        assert_eq!(cols[0], "inning");
        assert_eq!(cols[12], "batter_lefty");
        assert_eq!(cols[13], "fastball_rate");
        assert_eq!(cols[14], "curveball_rate");
        assert_eq!(cols[21], "other_rate");
        assert_eq!(cols[22], "count_(0, 0)");
        assert_eq!(cols[33], "count_(3, 2)");
    }

    #[test]
    fn full_extends_simplified() {
        let simple = columns(FeatureEncoding::Simplified);
        let full = columns(FeatureEncoding::Full);
        assert_eq!(&full[..simple.len()], &simple[..]);
        assert_eq!(full[34], "pitch_type_lag_1_none");
        assert_eq!(full[35], "pitch_type_lag_1_fastball");
        assert_eq!(full[44], "pitch_type_lag_2_none");
        assert_eq!(full[54], "lag_1_ball");
        assert_eq!(full[59], "lag_3_strike");
        assert_eq!(full[60], "ab_fastball_count");
        assert_eq!(full[68], "ab_other_count");
    }

    #[test]
    fn count_one_hot_has_single_hot_entry() {
        let rates = rates();
        let v = encode(&inputs(&rates, None), FeatureEncoding::Simplified).unwrap();
        let dummies = &v.values()[22..34];
        assert_eq!(dummies.iter().filter(|x| **x == 1.0).count(), 1);
        assert_eq!(dummies.iter().filter(|x| **x == 0.0).count(), 11);
        assert_eq!(v.get("count_(2, 1)"), Some(1.0));
        assert_eq!(v.get("count_(1, 2)"), Some(0.0));
    }

    #[test]
    fn direct_fields_and_rates_encoded() {
        let rates = rates();
        let v = encode(&inputs(&rates, None), FeatureEncoding::Simplified).unwrap();
        assert_eq!(
            &v.values()[..13],
            &[7.0, 1.0, 2.0, 1.0, 0.0, 1.0, 3.0, 4.0, 88.0, 12.0, 4.0, 1.0, 0.0]
        );
        assert_eq!(v.get("fastball_rate"), Some(0.5));
        assert_eq!(v.get("knuckle_curve_rate"), Some(0.0));
    }

    #[test]
    fn full_encoding_requires_history() {
        let rates = rates();
        assert_eq!(
            encode(&inputs(&rates, None), FeatureEncoding::Full),
            Err(EncodeError::MissingHistory)
        );
    }

    #[test]
    fn full_encoding_lag_and_ab_columns() {
        let rates = rates();
        let mut type_counts = PitchTypeCounts::default();
        type_counts.increment(PitchType::Fastball);
        type_counts.increment(PitchType::Slider);
        let history = AtBatHistory {
            lag_1: Some(PitchType::Slider),
            lag_2: None,
            ball_increases: [true, false, false],
            strike_increases: [false, true, false],
            type_counts,
        };
        let v = encode(&inputs(&rates, Some(&history)), FeatureEncoding::Full).unwrap();
        assert_eq!(v.values().len(), 69);
        assert_eq!(v.get("pitch_type_lag_1_slider"), Some(1.0));
        assert_eq!(v.get("pitch_type_lag_1_none"), Some(0.0));
        assert_eq!(v.get("pitch_type_lag_2_none"), Some(1.0));
        assert_eq!(v.get("lag_1_ball"), Some(1.0));
        assert_eq!(v.get("lag_2_strike"), Some(1.0));
        assert_eq!(v.get("ab_fastball_count"), Some(1.0));
        assert_eq!(v.get("ab_slider_count"), Some(1.0));
        assert_eq!(v.get("ab_cutter_count"), Some(0.0));
    }

    #[test]
    fn simplified_ignores_history_when_given() {
        let rates = rates();
        let history = AtBatHistory::default();
        let with = encode(&inputs(&rates, Some(&history)), FeatureEncoding::Simplified).unwrap();
        let without = encode(&inputs(&rates, None), FeatureEncoding::Simplified).unwrap();
        assert_eq!(with, without);
    }
}
