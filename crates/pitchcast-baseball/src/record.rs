// Per-pitch event records: the raw rows handed over by the data-acquisition
// side, and the validated events the feature pipeline consumes.
//
// Raw files carry one row per pitch in arrival order. Rows whose count is
// outside the legal domain are data-entry errors and are dropped here,
// before any sequential feature is derived.

use crate::encoding::GameState;
use crate::pitch::{Count, InvalidCount, PitchType};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One pitch as read from a raw season file, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawPitch {
    pub game_id: u64,
    pub at_bat_index: u32,
    pub inning: u8,
    #[serde(deserialize_with = "deserialize_flag")]
    pub top: bool,
    pub outs: u8,
    pub home_score: u16,
    pub away_score: u16,
    pub pitcher_id: u64,
    #[serde(default)]
    pub pitcher_name: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub pitcher_lefty: bool,
    pub batter_id: u64,
    #[serde(default)]
    pub batter_name: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub batter_lefty: bool,
    #[serde(default, deserialize_with = "deserialize_runner")]
    pub runner_1: bool,
    #[serde(default, deserialize_with = "deserialize_runner")]
    pub runner_2: bool,
    #[serde(default, deserialize_with = "deserialize_runner")]
    pub runner_3: bool,
    pub balls: u8,
    pub strikes: u8,
    #[serde(default)]
    pub pitch_type: Option<String>,
}

/// A validated pitch: legal count, canonical pitch type, trimmed names.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEvent {
    pub game_id: u64,
    pub at_bat_index: u32,
    pub game: GameState,
    pub pitcher_id: u64,
    pub pitcher_name: String,
    pub pitcher_lefty: bool,
    pub batter_id: u64,
    pub batter_name: String,
    pub batter_lefty: bool,
    pub count: Count,
    pub raw_pitch_type: Option<String>,
    pub pitch_type: PitchType,
}

impl PitchEvent {
    /// Score margin from the pitching team's point of view.
    pub fn pitching_lead(&self) -> i32 {
        let home = i32::from(self.game.home_score);
        let away = i32::from(self.game.away_score);
        if self.game.top {
            home - away
        } else {
            away - home
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A raw record whose count is outside the legal domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("malformed record in game {game_id}, at-bat {at_bat_index}: {source}")]
pub struct MalformedRecord {
    pub game_id: u64,
    pub at_bat_index: u32,
    pub source: InvalidCount,
}

#[derive(Debug, thiserror::Error)]
pub enum RawDataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl RawPitch {
    pub fn validate(self) -> Result<PitchEvent, MalformedRecord> {
        let count = Count::new(self.balls, self.strikes).map_err(|source| MalformedRecord {
            game_id: self.game_id,
            at_bat_index: self.at_bat_index,
            source,
        })?;
        let raw_pitch_type = self
            .pitch_type
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let pitch_type = PitchType::normalize(raw_pitch_type.as_deref());
        Ok(PitchEvent {
            game_id: self.game_id,
            at_bat_index: self.at_bat_index,
            game: GameState {
                inning: self.inning,
                top: self.top,
                outs: self.outs,
                runners: [self.runner_1, self.runner_2, self.runner_3],
                home_score: self.home_score,
                away_score: self.away_score,
            },
            pitcher_id: self.pitcher_id,
            pitcher_name: self.pitcher_name.trim().to_string(),
            pitcher_lefty: self.pitcher_lefty,
            batter_id: self.batter_id,
            batter_name: self.batter_name.trim().to_string(),
            batter_lefty: self.batter_lefty,
            count,
            raw_pitch_type,
            pitch_type,
        })
    }
}

/// Validate raw rows in order, dropping those with an illegal count.
///
/// Returns the surviving events (arrival order preserved) and how many rows
/// were dropped.
pub fn drop_malformed(raw: Vec<RawPitch>) -> (Vec<PitchEvent>, usize) {
    let mut events = Vec::with_capacity(raw.len());
    let mut dropped = 0;
    for row in raw {
        match row.validate() {
            Ok(event) => events.push(event),
            Err(e) => {
                debug!("dropping {}", e);
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!("dropped {} malformed records with out-of-range counts", dropped);
    }
    (events, dropped)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read raw pitches from any CSV source. Rows that fail to parse are skipped
/// with a warning; only a broken header is an error.
pub fn read_raw_pitches<R: Read>(rdr: R) -> Result<Vec<RawPitch>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    reader.headers()?;
    let mut pitches = Vec::new();
    for result in reader.deserialize::<RawPitch>() {
        match result {
            Ok(raw) => pitches.push(raw),
            Err(e) => {
                warn!("skipping malformed raw pitch row: {}", e);
            }
        }
    }
    Ok(pitches)
}

/// Load a raw season file.
pub fn load_raw_pitches(path: &Path) -> Result<Vec<RawPitch>, RawDataError> {
    let file = std::fs::File::open(path).map_err(|e| RawDataError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let pitches = read_raw_pitches(file).map_err(|e| RawDataError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    debug!("read {} raw pitches from {}", pitches.len(), path.display());
    Ok(pitches)
}

// ---------------------------------------------------------------------------
// Boolean cells
// ---------------------------------------------------------------------------

/// Parse a boolean cell as written by either this crate or a dataframe
/// export (`true`/`True`/`1`).
pub(crate) fn parse_flag(s: &str) -> Option<bool> {
    match s.trim() {
        "true" | "True" | "TRUE" | "1" => Some(true),
        "false" | "False" | "FALSE" | "0" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse_flag(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid boolean '{s}'")))
}

/// Runner occupancy may be absent from older exports; an empty cell means
/// nobody on base.
fn deserialize_runner<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let s = String::deserialize(deserializer)?;
    if s.trim().is_empty() {
        return Ok(false);
    }
    parse_flag(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid boolean '{s}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
