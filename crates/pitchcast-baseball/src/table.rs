// Season feature table: one row per pitch with its context, sequential
// features, and pitcher rates, persisted as CSV.
//
// The header is generated from the pitch catalog, so the schema is the same
// for every season and tables can be concatenated for multi-season training.
// Undefined rates are written as empty cells and read back as `None`.

use crate::encoding::{
    lag_count_columns, AtBatHistory, EncodeError, FeatureEncoding, FeatureVector, GameState,
    ModelInputs, PitchCounts, LAG_DEPTH,
};
use crate::pitch::{lag_label, parse_lag_label, Count, PitchType, PitchTypeCounts};
use crate::rates::RateVector;
use crate::record::{parse_flag, PitchEvent};
use crate::sequence::SequentialFeatures;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One pitch of the season feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub event: PitchEvent,
    pub features: SequentialFeatures,
    /// 1-based index among all pitches the rate aggregator has seen for this pitcher.
    pub nth_pitch: u32,
    /// 1-based index among this pitcher's pitches this season.
    pub nth_season_pitch: u32,
    pub rates: Option<RateVector>,
}

impl FeatureRow {
    /// Model inputs for this row; `None` while the pitcher's rates are undefined.
    pub fn model_inputs(&self) -> Option<ModelInputs<'_>> {
        let rates = self.rates.as_ref()?;
        Some(ModelInputs {
            game: self.event.game,
            pitch_counts: self.features.pitch_counts,
            pitcher_lefty: self.event.pitcher_lefty,
            batter_lefty: self.event.batter_lefty,
            rates,
            count: self.event.count,
            history: Some(&self.features.history),
        })
    }

    /// Encode this row as a training sample.
    pub fn encode(&self, encoding: FeatureEncoding) -> Result<FeatureVector, EncodeError> {
        let inputs = self.model_inputs().ok_or(EncodeError::UndefinedRate)?;
        crate::encoding::encode(&inputs, encoding)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to access file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("feature table is missing column `{0}`")]
    MissingColumn(String),

    #[error("row {row}: invalid value {value:?} in column `{column}`")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const CONTEXT_COLUMNS: [&str; 20] = [
    "game_id",
    "at_bat_index",
    "inning",
    "top",
    "outs",
    "home_score",
    "away_score",
    "pitching_lead",
    "runner_1",
    "runner_2",
    "runner_3",
    "pitcher_id",
    "pitcher_name",
    "pitcher_lefty",
    "batter_id",
    "batter_name",
    "batter_lefty",
    "balls",
    "strikes",
    "count",
];

/// Column names of a season feature table, in file order.
pub fn header() -> Vec<String> {
    let mut cols: Vec<String> = CONTEXT_COLUMNS.iter().map(|c| c.to_string()).collect();
    cols.extend(
        ["raw_pitch_type", "pitch_type", "pitch_type_lag_1", "pitch_type_lag_2"]
            .iter()
            .map(|c| c.to_string()),
    );
    cols.extend(lag_count_columns());
    cols.extend(
        ["pitch_count", "inning_pitch_count", "ab_pitch_count"]
            .iter()
            .map(|c| c.to_string()),
    );
    cols.extend(PitchType::ALL.iter().map(|t| t.ab_count_column()));
    cols.push("nth_pitch".into());
    cols.push("nth_season_pitch".into());
    cols.extend(PitchType::ALL.iter().map(|t| t.rate_column()));
    cols
}

fn row_to_record(row: &FeatureRow) -> Vec<String> {
    let e = &row.event;
    let f = &row.features;
    let mut rec = vec![
        e.game_id.to_string(),
        e.at_bat_index.to_string(),
        e.game.inning.to_string(),
        e.game.top.to_string(),
        e.game.outs.to_string(),
        e.game.home_score.to_string(),
        e.game.away_score.to_string(),
        e.pitching_lead().to_string(),
        e.game.runners[0].to_string(),
        e.game.runners[1].to_string(),
        e.game.runners[2].to_string(),
        e.pitcher_id.to_string(),
        e.pitcher_name.clone(),
        e.pitcher_lefty.to_string(),
        e.batter_id.to_string(),
        e.batter_name.clone(),
        e.batter_lefty.to_string(),
        e.count.balls().to_string(),
        e.count.strikes().to_string(),
        e.count.label(),
        e.raw_pitch_type.clone().unwrap_or_default(),
        e.pitch_type.to_string(),
        lag_label(f.history.lag_1).to_string(),
        lag_label(f.history.lag_2).to_string(),
    ];
    for k in 0..LAG_DEPTH {
        rec.push(f.history.ball_increases[k].to_string());
        rec.push(f.history.strike_increases[k].to_string());
    }
    rec.push(f.pitch_counts.game.to_string());
    rec.push(f.pitch_counts.inning.to_string());
    rec.push(f.pitch_counts.at_bat.to_string());
    rec.extend(f.history.type_counts.iter().map(|(_, n)| n.to_string()));
    rec.push(row.nth_pitch.to_string());
    rec.push(row.nth_season_pitch.to_string());
    match &row.rates {
        Some(rates) => rec.extend(rates.as_array().iter().map(|r| r.to_string())),
        None => rec.extend(std::iter::repeat(String::new()).take(PitchType::COUNT)),
    }
    rec
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

pub fn write_rows<W: Write>(wtr: W, rows: &[FeatureRow]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record(header())?;
    for row in rows {
        writer.write_record(row_to_record(row))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a season table, creating the parent directory if needed.
pub fn save_table(path: &Path, rows: &[FeatureRow]) -> Result<(), TableError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TableError::Io {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    let file = std::fs::File::create(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_rows(file, rows)?;
    debug!("wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Column lookup for one record, with row-numbered errors.
struct Cells<'a> {
    index: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
    row: usize,
}

impl Cells<'_> {
    fn raw(&self, column: &str) -> Result<&str, TableError> {
        let i = self
            .index
            .get(column)
            .ok_or_else(|| TableError::MissingColumn(column.to_string()))?;
        Ok(self.record.get(*i).unwrap_or(""))
    }

    fn invalid(&self, column: &str, value: &str) -> TableError {
        TableError::InvalidValue {
            row: self.row,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn parse<T: std::str::FromStr>(&self, column: &str) -> Result<T, TableError> {
        let value = self.raw(column)?;
        value.trim().parse().map_err(|_| self.invalid(column, value))
    }

    fn flag(&self, column: &str) -> Result<bool, TableError> {
        let value = self.raw(column)?;
        parse_flag(value).ok_or_else(|| self.invalid(column, value))
    }

    fn lag(&self, column: &str) -> Result<Option<PitchType>, TableError> {
        let value = self.raw(column)?;
        parse_lag_label(value.trim()).ok_or_else(|| self.invalid(column, value))
    }

    fn rates(&self) -> Result<Option<RateVector>, TableError> {
        let mut rates = [0.0; PitchType::COUNT];
        let mut missing = 0;
        for t in PitchType::ALL {
            let column = t.rate_column();
            let value = self.raw(&column)?;
            if value.trim().is_empty() {
                missing += 1;
            } else {
                rates[t.index()] = value
                    .trim()
                    .parse()
                    .map_err(|_| self.invalid(&column, value))?;
            }
        }
        match missing {
            0 => Ok(Some(RateVector::from_array(rates))),
            n if n == PitchType::COUNT => Ok(None),
            _ => Err(self.invalid("rates", "partially missing")),
        }
    }
}

fn record_to_row(cells: &Cells<'_>) -> Result<FeatureRow, TableError> {
    let balls: u8 = cells.parse("balls")?;
    let strikes: u8 = cells.parse("strikes")?;
    let count = Count::new(balls, strikes)
        .map_err(|_| cells.invalid("count", &format!("({balls},{strikes})")))?;

    let pitch_type_label = cells.raw("pitch_type")?;
    let pitch_type = PitchType::from_label(pitch_type_label.trim())
        .ok_or_else(|| cells.invalid("pitch_type", pitch_type_label))?;
    let raw_pitch_type = Some(cells.raw("raw_pitch_type")?.to_string()).filter(|s| !s.is_empty());

    let mut ball_increases = [false; LAG_DEPTH];
    let mut strike_increases = [false; LAG_DEPTH];
    for k in 0..LAG_DEPTH {
        ball_increases[k] = cells.flag(&format!("lag_{}_ball", k + 1))?;
        strike_increases[k] = cells.flag(&format!("lag_{}_strike", k + 1))?;
    }
    let mut type_counts = [0u32; PitchType::COUNT];
    for t in PitchType::ALL {
        type_counts[t.index()] = cells.parse(&t.ab_count_column())?;
    }

    Ok(FeatureRow {
        event: PitchEvent {
            game_id: cells.parse("game_id")?,
            at_bat_index: cells.parse("at_bat_index")?,
            game: GameState {
                inning: cells.parse("inning")?,
                top: cells.flag("top")?,
                outs: cells.parse("outs")?,
                runners: [
                    cells.flag("runner_1")?,
                    cells.flag("runner_2")?,
                    cells.flag("runner_3")?,
                ],
                home_score: cells.parse("home_score")?,
                away_score: cells.parse("away_score")?,
            },
            pitcher_id: cells.parse("pitcher_id")?,
            pitcher_name: cells.raw("pitcher_name")?.to_string(),
            pitcher_lefty: cells.flag("pitcher_lefty")?,
            batter_id: cells.parse("batter_id")?,
            batter_name: cells.raw("batter_name")?.to_string(),
            batter_lefty: cells.flag("batter_lefty")?,
            count,
            raw_pitch_type,
            pitch_type,
        },
        features: SequentialFeatures {
            pitch_counts: PitchCounts {
                game: cells.parse("pitch_count")?,
                inning: cells.parse("inning_pitch_count")?,
                at_bat: cells.parse("ab_pitch_count")?,
            },
            history: AtBatHistory {
                lag_1: cells.lag("pitch_type_lag_1")?,
                lag_2: cells.lag("pitch_type_lag_2")?,
                ball_increases,
                strike_increases,
                type_counts: PitchTypeCounts::from_array(type_counts),
            },
        },
        nth_pitch: cells.parse("nth_pitch")?,
        nth_season_pitch: cells.parse("nth_season_pitch")?,
        rates: cells.rates()?,
    })
}

/// Read a feature table from any CSV source. Unlike raw input, a table row
/// that does not parse is an error: these files are written by this crate.
pub fn read_rows<R: Read>(rdr: R) -> Result<Vec<FeatureRow>, TableError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let index: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();
    for column in header() {
        if !index.contains_key(&column) {
            return Err(TableError::MissingColumn(column));
        }
    }

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let cells = Cells {
            index: &index,
            record: &record,
            row: i + 1,
        };
        rows.push(record_to_row(&cells)?);
    }
    Ok(rows)
}

pub fn load_table(path: &Path) -> Result<Vec<FeatureRow>, TableError> {
    let file = std::fs::File::open(path).map_err(|e| TableError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let rows = read_rows(file)?;
    debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(rates: Option<RateVector>) -> FeatureRow {
        let mut type_counts = PitchTypeCounts::default();
        type_counts.increment(PitchType::Fastball);
        type_counts.increment(PitchType::KnuckleCurve);
        FeatureRow {
            event: PitchEvent {
                game_id: 661_032,
                at_bat_index: 14,
                game: GameState {
                    inning: 3,
                    top: false,
                    outs: 1,
                    runners: [true, false, false],
                    home_score: 2,
                    away_score: 5,
                },
                pitcher_id: 543_037,
                pitcher_name: "Gerrit Cole".into(),
                pitcher_lefty: false,
                batter_id: 605_141,
                batter_name: "Mookie Betts, Jr.".into(),
                batter_lefty: false,
                count: Count::new(1, 1).unwrap(),
                raw_pitch_type: Some("Knuckle Curve".into()),
                pitch_type: PitchType::KnuckleCurve,
            },
            features: SequentialFeatures {
                pitch_counts: PitchCounts {
                    game: 41,
                    inning: 9,
                    at_bat: 2,
                },
                history: AtBatHistory {
                    lag_1: Some(PitchType::KnuckleCurve),
                    lag_2: Some(PitchType::Fastball),
                    ball_increases: [true, true, false],
                    strike_increases: [false, true, false],
                    type_counts,
                },
            },
            nth_pitch: 1_812,
            nth_season_pitch: 412,
            rates,
        }
    }

    fn awkward_rates() -> RateVector {
        RateVector::from_counts(&PitchTypeCounts::from_array([7, 3, 0, 1, 2, 0, 0, 0, 1])).unwrap()
    }

    #[test]
    fn header_has_every_feature_column() {
        let cols = header();
        assert_eq!(cols[0], "game_id");
        assert!(cols.contains(&"pitching_lead".to_string()));
        assert!(cols.contains(&"ab_knuckle_curve_count".to_string()));
        assert!(cols.contains(&"lag_3_strike".to_string()));
        assert_eq!(cols.last().map(String::as_str), Some("other_rate"));
        assert_eq!(cols.len(), 20 + 4 + 6 + 3 + 9 + 2 + 9);
    }

    #[test]
    fn rows_survive_write_and_read() {
        let rows = vec![sample_row(Some(awkward_rates())), sample_row(None)];
        let mut buf = Vec::new();
        write_rows(&mut buf, &rows).unwrap();
        let back = read_rows(buf.as_slice()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn undefined_rates_written_as_empty_cells() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &[sample_row(None)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let data_line = text.lines().nth(1).unwrap();
        assert!(data_line.ends_with(",412,,,,,,,,,"));
    }

    #[test]
    fn pitching_lead_written_from_pitching_side() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &[sample_row(None)]).unwrap();
        let mut reader = csv::Reader::from_reader(buf.as_slice());
        let lead_col = reader
            .headers()
            .unwrap()
            .iter()
            .position(|h| h == "pitching_lead")
            .unwrap();
        let record = reader.records().next().unwrap().unwrap();
        // Bottom half: the away team pitches, up 5-2.
        assert_eq!(&record[lead_col], "3");
    }

    #[test]
    fn missing_column_rejected() {
        let csv_data = "game_id,at_bat_index\n1,2";
        match read_rows(csv_data.as_bytes()) {
            Err(TableError::MissingColumn(col)) => assert_eq!(col, "inning"),
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn invalid_cell_reports_row_and_column() {
        let mut buf = Vec::new();
        write_rows(&mut buf, &[sample_row(None)]).unwrap();
        let text = String::from_utf8(buf)
            .unwrap()
            .replace("knuckle_curve,knuckle_curve,fastball", "knuckle_curve,sweeper,fastball");
        match read_rows(text.as_bytes()) {
            Err(TableError::InvalidValue { row, column, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "pitch_type_lag_1");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn encode_requires_defined_rates() {
        assert_eq!(
            sample_row(None).encode(FeatureEncoding::Simplified),
            Err(EncodeError::UndefinedRate)
        );
        let v = sample_row(Some(awkward_rates()))
            .encode(FeatureEncoding::Full)
            .unwrap();
        assert_eq!(v.get("pitch_type_lag_1_knuckle_curve"), Some(1.0));
        assert_eq!(v.get("ab_pitch_count"), Some(2.0));
    }
}
