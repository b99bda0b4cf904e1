// Pitch catalog: canonical pitch types, the ball/strike count domain, and a
// per-type counter. Everything that lays out per-type or per-count columns
// iterates these declarations; nothing else lists them.

use std::fmt;

// ---------------------------------------------------------------------------
// PitchType
// ---------------------------------------------------------------------------

/// One of the nine canonical pitch categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchType {
    Fastball,
    Curveball,
    Sinker,
    Cutter,
    Changeup,
    Slider,
    Splitter,
    KnuckleCurve,
    Other,
}

impl PitchType {
    pub const COUNT: usize = 9;

    /// All pitch types in model column order.
    pub const ALL: [PitchType; PitchType::COUNT] = [
        PitchType::Fastball,
        PitchType::Curveball,
        PitchType::Sinker,
        PitchType::Cutter,
        PitchType::Changeup,
        PitchType::Slider,
        PitchType::Splitter,
        PitchType::KnuckleCurve,
        PitchType::Other,
    ];

    /// Position of this type in [`PitchType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PitchType::Fastball => "fastball",
            PitchType::Curveball => "curveball",
            PitchType::Sinker => "sinker",
            PitchType::Cutter => "cutter",
            PitchType::Changeup => "changeup",
            PitchType::Slider => "slider",
            PitchType::Splitter => "splitter",
            PitchType::KnuckleCurve => "knuckle_curve",
            PitchType::Other => "other",
        }
    }

    /// Map a raw provider label onto a canonical type.
    ///
    /// Labels are trimmed, lower-cased, and have spaces/hyphens turned into
    /// underscores, so "Four-Seam Fastball" and "four_seam_fastball" agree.
    /// Missing, empty, and non-whitelisted labels all become `Other`.
    pub fn normalize(raw: Option<&str>) -> PitchType {
        let Some(raw) = raw else {
            return PitchType::Other;
        };
        let label: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        match label.as_str() {
            "four_seam_fastball" => PitchType::Fastball,
            other => PitchType::from_label(other).unwrap_or(PitchType::Other),
        }
    }

    /// Parse an already-canonical label (as written to the feature table).
    pub fn from_label(label: &str) -> Option<PitchType> {
        PitchType::ALL.into_iter().find(|t| t.as_str() == label)
    }

    /// Column name of this type's cumulative rate.
    pub fn rate_column(self) -> String {
        format!("{}_rate", self.as_str())
    }

    /// Column name of this type's running count within the at-bat.
    pub fn ab_count_column(self) -> String {
        format!("ab_{}_count", self.as_str())
    }
}

impl fmt::Display for PitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label for a lagged pitch type; `"none"` when there is no such pitch.
pub fn lag_label(lag: Option<PitchType>) -> &'static str {
    lag.map_or(NO_LAG, PitchType::as_str)
}

/// Parse a lag label written by [`lag_label`].
pub fn parse_lag_label(label: &str) -> Option<Option<PitchType>> {
    if label == NO_LAG {
        Some(None)
    } else {
        PitchType::from_label(label).map(Some)
    }
}

pub const NO_LAG: &str = "none";

// ---------------------------------------------------------------------------
// PitchTypeCounts
// ---------------------------------------------------------------------------

/// Running count of pitches per canonical type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PitchTypeCounts([u32; PitchType::COUNT]);

impl PitchTypeCounts {
    pub fn from_array(counts: [u32; PitchType::COUNT]) -> Self {
        PitchTypeCounts(counts)
    }

    pub fn get(&self, pitch_type: PitchType) -> u32 {
        self.0[pitch_type.index()]
    }

    pub fn increment(&mut self, pitch_type: PitchType) {
        self.0[pitch_type.index()] += 1;
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Counts paired with their type, in column order.
    pub fn iter(&self) -> impl Iterator<Item = (PitchType, u32)> + '_ {
        PitchType::ALL.into_iter().map(|t| (t, self.get(t)))
    }
}

// ---------------------------------------------------------------------------
// Count
// ---------------------------------------------------------------------------

/// A ball/strike count before a pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Count {
    balls: u8,
    strikes: u8,
}

/// A `(balls, strikes)` pair outside the twelve legal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid count ({balls},{strikes}): balls must be 0-3 and strikes 0-2")]
pub struct InvalidCount {
    pub balls: u8,
    pub strikes: u8,
}

impl Count {
    pub const MAX_BALLS: u8 = 3;
    pub const MAX_STRIKES: u8 = 2;
    pub const DOMAIN_SIZE: usize = 12;

    /// The legal counts in dummy-column order: (0,0), (0,1), ... (3,2).
    pub const ALL: [Count; Count::DOMAIN_SIZE] = [
        Count { balls: 0, strikes: 0 },
        Count { balls: 0, strikes: 1 },
        Count { balls: 0, strikes: 2 },
        Count { balls: 1, strikes: 0 },
        Count { balls: 1, strikes: 1 },
        Count { balls: 1, strikes: 2 },
        Count { balls: 2, strikes: 0 },
        Count { balls: 2, strikes: 1 },
        Count { balls: 2, strikes: 2 },
        Count { balls: 3, strikes: 0 },
        Count { balls: 3, strikes: 1 },
        Count { balls: 3, strikes: 2 },
    ];

    pub fn new(balls: u8, strikes: u8) -> Result<Count, InvalidCount> {
        if balls > Count::MAX_BALLS || strikes > Count::MAX_STRIKES {
            return Err(InvalidCount { balls, strikes });
        }
        Ok(Count { balls, strikes })
    }

    pub fn balls(self) -> u8 {
        self.balls
    }

    pub fn strikes(self) -> u8 {
        self.strikes
    }

    /// Position of this count in [`Count::ALL`].
    pub fn index(self) -> usize {
        usize::from(self.balls) * (usize::from(Count::MAX_STRIKES) + 1) + usize::from(self.strikes)
    }

    /// Name of this count's one-hot column.
    pub fn dummy_column(self) -> String {
        format!("count_({}, {})", self.balls, self.strikes)
    }

    /// Compact label stored in the feature table, e.g. `(2,1)`.
    pub fn label(self) -> String {
        format!("({},{})", self.balls, self.strikes)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
