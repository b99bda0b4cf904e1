use std::path::{Path, PathBuf};

use anyhow::Context;
use pitchcast_baseball::assembler::{InferenceAssembler, LiveInputs};
use pitchcast_baseball::encoding::{GameState, PitchCounts};
use pitchcast_baseball::snapshot::load_snapshots;
use pitchcast_core::config::Config;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct PredictArg {
    /// Pitcher name as it appears in the snapshot table
    #[arg(long)]
    pitcher: String,
    /// Snapshot table to read; defaults to the configured path
    #[arg(long)]
    snapshots: Option<PathBuf>,
    #[arg(long, default_value_t = 1)]
    inning: u8,
    /// Top half of the inning (home team pitching)
    #[arg(long)]
    top: bool,
    #[arg(long, default_value_t = 0)]
    outs: u8,
    #[arg(long, default_value_t = 0)]
    home_score: u16,
    #[arg(long, default_value_t = 0)]
    away_score: u16,
    #[arg(long)]
    runner_1: bool,
    #[arg(long)]
    runner_2: bool,
    #[arg(long)]
    runner_3: bool,
    /// Pitches already thrown by the pitcher this game
    #[arg(long, default_value_t = 0)]
    pitch_count: u32,
    /// Pitches already thrown by the pitcher this inning
    #[arg(long, default_value_t = 0)]
    inning_pitch_count: u32,
    /// Pitches already thrown in this at-bat
    #[arg(long, default_value_t = 0)]
    ab_pitch_count: u32,
    #[arg(long)]
    batter_lefty: bool,
    #[arg(long, default_value_t = 0)]
    balls: u8,
    #[arg(long, default_value_t = 0)]
    strikes: u8,
}

impl PredictArg {
    fn live_inputs(&self) -> LiveInputs {
        LiveInputs {
            game: GameState {
                inning: self.inning,
                top: self.top,
                outs: self.outs,
                runners: [self.runner_1, self.runner_2, self.runner_3],
                home_score: self.home_score,
                away_score: self.away_score,
            },
            pitch_counts: PitchCounts {
                game: self.pitch_count,
                inning: self.inning_pitch_count,
                at_bat: self.ab_pitch_count,
            },
            batter_lefty: self.batter_lefty,
            balls: self.balls,
            strikes: self.strikes,
        }
    }
}

pub(crate) fn run(arg: &PredictArg, config: &Config) -> anyhow::Result<()> {
    let path = arg
        .snapshots
        .as_deref()
        .unwrap_or_else(|| Path::new(&config.data.snapshot_path));
    let snapshots = load_snapshots(path)
        .with_context(|| format!("failed to load snapshots from {}", path.display()))?;

    let assembler = InferenceAssembler::new(&snapshots, config.limits);
    let vector = assembler
        .assemble(&arg.pitcher, &arg.live_inputs())
        .with_context(|| format!("cannot assemble features for {}", arg.pitcher))?;

    println!("{}", serde_json::to_string_pretty(&vector)?);
    Ok(())
}
