// Pitcher snapshots: each qualifying pitcher's latest handedness and rate
// vector, reduced from a season feature table and used at inference time as
// the stand-in for current form.

use crate::pitch::PitchType;
use crate::rates::RateVector;
use crate::record::parse_flag;
use crate::table::FeatureRow;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PitcherSnapshot {
    pub pitcher_lefty: bool,
    pub rates: RateVector,
}

/// Snapshots keyed by pitcher name. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotTable {
    pitchers: BTreeMap<String, PitcherSnapshot>,
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("no snapshot for pitcher '{0}'")]
    UnknownPitcher(String),

    #[error("failed to access file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("snapshot table is missing column `{0}`")]
    MissingColumn(String),

    #[error("row {row}: invalid value {value:?} in column `{column}`")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

impl SnapshotTable {
    /// Reduce a season table to the last qualifying row per pitcher.
    ///
    /// A row qualifies when the pitcher has `min_pitches` pitches this season
    /// and the rate vector is defined. Pitchers with no qualifying row are
    /// left out.
    pub fn build(rows: &[FeatureRow], min_pitches: u32) -> SnapshotTable {
        let mut pitchers = BTreeMap::new();
        let mut ids: BTreeMap<&str, u64> = BTreeMap::new();
        for row in rows {
            let name = row.event.pitcher_name.as_str();
            if let Some(previous) = ids.insert(name, row.event.pitcher_id) {
                if previous != row.event.pitcher_id {
                    warn!(
                        "pitcher name '{}' used by ids {} and {}; keeping the later",
                        name, previous, row.event.pitcher_id
                    );
                }
            }
            if row.nth_season_pitch < min_pitches {
                continue;
            }
            let Some(rates) = row.rates else {
                continue;
            };
            pitchers.insert(
                name.to_string(),
                PitcherSnapshot {
                    pitcher_lefty: row.event.pitcher_lefty,
                    rates,
                },
            );
        }
        debug!(
            "built snapshots for {} of {} pitchers",
            pitchers.len(),
            ids.len()
        );
        SnapshotTable { pitchers }
    }

    pub fn find(&self, pitcher_name: &str) -> Option<&PitcherSnapshot> {
        self.pitchers.get(pitcher_name)
    }

    pub fn get(&self, pitcher_name: &str) -> Result<&PitcherSnapshot, SnapshotError> {
        self.find(pitcher_name)
            .ok_or_else(|| SnapshotError::UnknownPitcher(pitcher_name.to_string()))
    }

    pub fn contains(&self, pitcher_name: &str) -> bool {
        self.pitchers.contains_key(pitcher_name)
    }

    /// Pitcher names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pitchers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pitchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitchers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

fn header() -> Vec<String> {
    let mut cols = vec!["pitcher_name".to_string(), "pitcher_lefty".to_string()];
    cols.extend(PitchType::ALL.iter().map(|t| t.rate_column()));
    cols
}

pub fn write_snapshots<W: Write>(wtr: W, table: &SnapshotTable) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record(header())?;
    for (name, snapshot) in &table.pitchers {
        let mut rec = vec![name.clone(), snapshot.pitcher_lefty.to_string()];
        rec.extend(snapshot.rates.as_array().iter().map(|r| r.to_string()));
        writer.write_record(rec)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_snapshots<R: Read>(rdr: R) -> Result<SnapshotTable, SnapshotError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers = reader.headers()?.clone();
    let position = |column: &str| {
        headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| SnapshotError::MissingColumn(column.to_string()))
    };
    let name_col = position("pitcher_name")?;
    let lefty_col = position("pitcher_lefty")?;
    let rate_cols = PitchType::ALL
        .iter()
        .map(|t| position(t.rate_column().as_str()))
        .collect::<Result<Vec<_>, _>>()?;

    let mut pitchers = BTreeMap::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let cell = |col: usize| record.get(col).unwrap_or("");
        let invalid = |col: usize| SnapshotError::InvalidValue {
            row: i + 1,
            column: headers.get(col).unwrap_or("").to_string(),
            value: cell(col).to_string(),
        };

        let pitcher_lefty = parse_flag(cell(lefty_col)).ok_or_else(|| invalid(lefty_col))?;
        let mut rates = [0.0; PitchType::COUNT];
        for (slot, &col) in rates.iter_mut().zip(&rate_cols) {
            *slot = cell(col).trim().parse().map_err(|_| invalid(col))?;
        }
        pitchers.insert(
            cell(name_col).trim().to_string(),
            PitcherSnapshot {
                pitcher_lefty,
                rates: RateVector::from_array(rates),
            },
        );
    }
    Ok(SnapshotTable { pitchers })
}

pub fn save_snapshots(path: &Path, table: &SnapshotTable) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SnapshotError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    let file = std::fs::File::create(path).map_err(|e| SnapshotError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_snapshots(file, table)?;
    Ok(())
}

pub fn load_snapshots(path: &Path) -> Result<SnapshotTable, SnapshotError> {
    let file = std::fs::File::open(path).map_err(|e| SnapshotError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let table = read_snapshots(file)?;
    debug!("loaded {} pitcher snapshots from {}", table.len(), path.display());
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SeasonPipeline;
    use crate::record::RawPitch;

    fn raw(pitcher_id: u64, name: &str, lefty: bool, at_bat_index: u32, pitch_type: &str) -> RawPitch {
        RawPitch {
            game_id: 1,
            at_bat_index,
            inning: 1,
            top: true,
            outs: 0,
            home_score: 0,
            away_score: 0,
            pitcher_id,
            pitcher_name: name.into(),
            pitcher_lefty: lefty,
            batter_id: 900 + u64::from(at_bat_index),
            batter_name: "Batter".into(),
            batter_lefty: false,
            runner_1: false,
            runner_2: false,
            runner_3: false,
            balls: 0,
            strikes: 0,
            pitch_type: Some(pitch_type.into()),
        }
    }

    /// Ace throws five pitches, Rookie two.
    fn season_rows(min_pitches: u32) -> Vec<FeatureRow> {
        let raw = vec![
            raw(1, "Ace", true, 0, "Fastball"),
            raw(1, "Ace", true, 1, "Fastball"),
            raw(2, "Rookie", false, 2, "Slider"),
            raw(1, "Ace", true, 3, "Slider"),
            raw(1, "Ace", true, 4, "Changeup"),
            raw(2, "Rookie", false, 5, "Slider"),
            raw(1, "Ace", true, 6, "Fastball"),
        ];
        SeasonPipeline::new(min_pitches).process_season("2022", raw).0
    }

    #[test]
    fn takes_last_qualifying_row() {
        let table = SnapshotTable::build(&season_rows(3), 3);
        assert_eq!(table.len(), 1);
        let ace = table.get("Ace").unwrap();
        assert!(ace.pitcher_lefty);
        // Last row: four prior pitches, two fastballs.
        assert_eq!(ace.rates.get(PitchType::Fastball), 0.5);
        assert_eq!(ace.rates.get(PitchType::Slider), 0.25);
        assert_eq!(ace.rates.get(PitchType::Changeup), 0.25);
    }

    #[test]
    fn pitchers_below_threshold_excluded() {
        let table = SnapshotTable::build(&season_rows(3), 3);
        assert!(!table.contains("Rookie"));
        match table.get("Rookie") {
            Err(SnapshotError::UnknownPitcher(name)) => assert_eq!(name, "Rookie"),
            other => panic!("expected UnknownPitcher, got {other:?}"),
        }
    }

    #[test]
    fn unknown_pitcher_is_an_error() {
        let table = SnapshotTable::build(&season_rows(1), 1);
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["Ace", "Rookie"]);
        assert!(matches!(
            table.get("Nobody"),
            Err(SnapshotError::UnknownPitcher(_))
        ));
    }

    #[test]
    fn snapshots_survive_write_and_read() {
        let table = SnapshotTable::build(&season_rows(1), 1);
        let mut buf = Vec::new();
        write_snapshots(&mut buf, &table).unwrap();
        let back = read_snapshots(buf.as_slice()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn snapshot_file_columns() {
        let table = SnapshotTable::build(&season_rows(1), 1);
        let mut buf = Vec::new();
        write_snapshots(&mut buf, &table).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with(
            "pitcher_name,pitcher_lefty,fastball_rate,curveball_rate,sinker_rate,cutter_rate,\
             changeup_rate,slider_rate,splitter_rate,knuckle_curve_rate,other_rate\n"
        ));
    }

    #[test]
    fn invalid_rate_cell_rejected() {
        let csv_data = "\
pitcher_name,pitcher_lefty,fastball_rate,curveball_rate,sinker_rate,cutter_rate,changeup_rate,slider_rate,splitter_rate,knuckle_curve_rate,other_rate
Ace,true,0.5,x,0,0,0.25,0.25,0,0,0";
        match read_snapshots(csv_data.as_bytes()) {
            Err(SnapshotError::InvalidValue { column, .. }) => assert_eq!(column, "curveball_rate"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
