// Integration tests for the pitchcast-baseball pipeline.
//
// These run a small raw season file through the public API: feature
// derivation, table persistence, snapshots, inference assembly and training
// export.

use pitchcast_baseball::assembler::{AssemblyError, InferenceAssembler, LiveInputs};
use pitchcast_baseball::encoding::{FeatureEncoding, PitchCounts};
use pitchcast_baseball::pipeline::{SeasonPipeline, SeasonReport};
use pitchcast_baseball::pitch::PitchType;
use pitchcast_baseball::record::{load_raw_pitches, RawPitch};
use pitchcast_baseball::snapshot::{read_snapshots, write_snapshots, SnapshotTable};
use pitchcast_baseball::table::{read_rows, write_rows, FeatureRow};
use pitchcast_baseball::training::{TrainingMatrix, TrainingSkips};
use pitchcast_core::config::InputLimits;
use std::path::Path;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory, relative to the crate root (the cwd for `cargo test`).
const FIXTURES: &str = "tests/fixtures";

const MIN_PITCHES: u32 = 3;

fn sample_raw() -> Vec<RawPitch> {
    load_raw_pitches(&Path::new(FIXTURES).join("sample_pitches.csv")).unwrap()
}

fn sample_season() -> (Vec<FeatureRow>, SeasonReport) {
    SeasonPipeline::new(MIN_PITCHES).process_season("sample", sample_raw())
}

fn live_from(row: &FeatureRow) -> LiveInputs {
    LiveInputs {
        game: row.event.game,
        pitch_counts: row.features.pitch_counts,
        batter_lefty: row.event.batter_lefty,
        balls: row.event.count.balls(),
        strikes: row.event.count.strikes(),
    }
}

// ===========================================================================
// Season pipeline
// ===========================================================================

#[test]
fn sample_season_report() {
    let (rows, report) = sample_season();
    assert_eq!(
        report,
        SeasonReport {
            raw_records: 14,
            dropped_malformed: 1,
            rows: 13,
            at_bats: 7,
            boundary_anomalies: 1,
            rows_with_rates: 7,
        }
    );
    assert_eq!(rows.len(), 13);
}

#[test]
fn lags_and_at_bat_counts_within_first_at_bat() {
    let (rows, _) = sample_season();
    // Fastball, slider, fastball to the lead-off hitter.
    let third = &rows[2].features;
    assert_eq!(third.history.lag_1, Some(PitchType::Slider));
    assert_eq!(third.history.lag_2, Some(PitchType::Fastball));
    assert_eq!(third.history.type_counts.get(PitchType::Fastball), 1);
    assert_eq!(third.history.type_counts.get(PitchType::Slider), 1);
    assert_eq!(third.pitch_counts.at_bat, 2);
    // Count went (0,1) -> (1,1): one more ball than the previous pitch.
    assert!(third.history.ball_increases[0]);
    assert!(!third.history.strike_increases[0]);
}

#[test]
fn first_pitch_of_every_at_bat_has_empty_history() {
    let (rows, _) = sample_season();
    let mut previous: Option<(u64, u32, u64)> = None;
    for row in &rows {
        let key = (row.event.game_id, row.event.at_bat_index, row.event.batter_id);
        if previous != Some(key) {
            assert_eq!(row.features.pitch_counts.at_bat, 0);
            assert_eq!(row.features.history.type_counts.total(), 0);
            assert_eq!(row.features.history.lag_1, None);
            assert_eq!(row.features.history.lag_2, None);
        }
        previous = Some(key);
    }
}

#[test]
fn scoped_pitch_counts() {
    let (rows, _) = sample_season();
    // Second pitch of the second inning, after the malformed row was dropped.
    let row = &rows[9];
    assert_eq!(row.event.pitch_type, PitchType::Other);
    assert_eq!(row.event.raw_pitch_type, None);
    assert_eq!(
        row.features.pitch_counts,
        PitchCounts {
            game: 6,
            inning: 1,
            at_bat: 1,
        }
    );
    // First pitch of game two starts the game count over.
    assert_eq!(rows[10].features.pitch_counts.game, 0);
    assert_eq!(rows[11].features.pitch_counts.game, 1);
}

#[test]
fn repeated_batter_with_new_index_is_a_new_at_bat() {
    let (rows, _) = sample_season();
    let last = &rows[12];
    assert_eq!(last.event.batter_id, rows[11].event.batter_id);
    assert_eq!(last.features.pitch_counts.at_bat, 0);
    assert_eq!(last.features.history.lag_1, None);
    assert_eq!(last.features.history.ball_increases, [false; 3]);
}

#[test]
fn rates_gate_and_sum() {
    let (rows, _) = sample_season();
    for row in &rows {
        match row.rates {
            Some(rates) => {
                assert!(row.nth_pitch > MIN_PITCHES);
                assert!((rates.sum() - 1.0).abs() < 1e-9);
            }
            None => assert!(row.nth_pitch <= MIN_PITCHES),
        }
    }
    // The sinkerballer throws only three pitches: never enough history.
    assert!(rows
        .iter()
        .filter(|r| r.event.pitcher_id == 202)
        .all(|r| r.rates.is_none()));
}

#[test]
fn second_season_continues_rates() {
    let mut pipeline = SeasonPipeline::new(MIN_PITCHES);
    pipeline.process_season("first", sample_raw());
    let (rows, _) = pipeline.process_season("second", sample_raw());

    assert_eq!(rows[0].nth_pitch, 11);
    assert_eq!(rows[0].nth_season_pitch, 1);
    let rates = rows[0].rates.unwrap();
    assert!((rates.get(PitchType::Fastball) - 0.4).abs() < 1e-9);
    // Pitcher 202 clears the gate on the first pitch of the second season.
    assert!(rows[5].rates.is_some());
}

#[test]
fn processing_is_deterministic() {
    let (a, _) = sample_season();
    let (b, _) = sample_season();
    assert_eq!(a, b);
}

// ===========================================================================
// Snapshots
// ===========================================================================

#[test]
fn snapshot_from_reread_table_matches_in_memory() {
    let (rows, _) = sample_season();
    let direct = SnapshotTable::build(&rows, MIN_PITCHES);

    let mut buf = Vec::new();
    write_rows(&mut buf, &rows).unwrap();
    let reread = read_rows(buf.as_slice()).unwrap();
    assert_eq!(reread, rows);
    assert_eq!(SnapshotTable::build(&reread, MIN_PITCHES), direct);
}

#[test]
fn snapshot_holds_latest_rates() {
    let (rows, _) = sample_season();
    let table = SnapshotTable::build(&rows, MIN_PITCHES);
    assert_eq!(table.names().collect::<Vec<_>>(), vec!["Ace Arm"]);

    let ace = table.get("Ace Arm").unwrap();
    assert!(ace.pitcher_lefty);
    // Nine prior pitches: four fastballs, two sliders, one each of the rest.
    assert!((ace.rates.get(PitchType::Fastball) - 4.0 / 9.0).abs() < 1e-12);
    assert!((ace.rates.get(PitchType::Slider) - 2.0 / 9.0).abs() < 1e-12);
    assert!((ace.rates.get(PitchType::Other) - 1.0 / 9.0).abs() < 1e-12);
    assert_eq!(ace.rates.get(PitchType::KnuckleCurve), 0.0);

    let mut buf = Vec::new();
    write_snapshots(&mut buf, &table).unwrap();
    assert_eq!(read_snapshots(buf.as_slice()).unwrap(), table);
}

// ===========================================================================
// Inference
// ===========================================================================

#[test]
fn assembler_reproduces_training_encoding() {
    let (rows, _) = sample_season();
    let table = SnapshotTable::build(&rows, MIN_PITCHES);
    let assembler = InferenceAssembler::new(&table, InputLimits::default());
    let last = &rows[12];

    let live = live_from(last);
    assert_eq!(
        assembler.assemble("Ace Arm", &live).unwrap(),
        last.encode(FeatureEncoding::Simplified).unwrap()
    );
    assert_eq!(
        assembler
            .assemble_with_history("Ace Arm", &live, &last.features.history)
            .unwrap(),
        last.encode(FeatureEncoding::Full).unwrap()
    );
}

#[test]
fn assembler_rejects_pitcher_without_snapshot() {
    let (rows, _) = sample_season();
    let table = SnapshotTable::build(&rows, MIN_PITCHES);
    let assembler = InferenceAssembler::new(&table, InputLimits::default());
    let live = live_from(&rows[5]);
    assert!(matches!(
        assembler.assemble("Sinker Baller", &live),
        Err(AssemblyError::UnknownPitcher(_))
    ));
}

// ===========================================================================
// Training export
// ===========================================================================

#[test]
fn training_matrix_from_sample() {
    let (rows, _) = sample_season();
    let matrix = TrainingMatrix::build(&rows, FeatureEncoding::Simplified, true);
    assert_eq!(matrix.len(), 6);
    assert_eq!(
        matrix.skipped(),
        TrainingSkips {
            undefined_rates: 6,
            other_labels: 1,
        }
    );
    assert!(matrix.samples().iter().all(|s| s.values.len() == 34));
    assert_eq!(matrix.samples()[5].label, PitchType::KnuckleCurve);
}
