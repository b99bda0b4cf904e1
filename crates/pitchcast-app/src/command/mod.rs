use clap::{Parser, Subcommand};
use pitchcast_core::config::Config;

use self::{
    columns::ColumnsArg, features::FeaturesArg, predict::PredictArg, snapshot::SnapshotArg,
    training_matrix::TrainingMatrixArg,
};

mod columns;
mod features;
mod predict;
mod snapshot;
mod training_matrix;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Build season feature tables from raw pitch files
    Features(#[clap(flatten)] FeaturesArg),
    /// Reduce a season feature table to per-pitcher snapshots
    Snapshot(#[clap(flatten)] SnapshotArg),
    /// Print the model column order of an encoding
    Columns(#[clap(flatten)] ColumnsArg),
    /// Export encoded rows and labels for model training
    TrainingMatrix(#[clap(flatten)] TrainingMatrixArg),
    /// Assemble the feature vector for one live pitch
    Predict(#[clap(flatten)] PredictArg),
}

pub fn run(args: CommandArgs, config: &Config) -> anyhow::Result<()> {
    match args.mode {
        Mode::Features(arg) => features::run(&arg, config)?,
        Mode::Snapshot(arg) => snapshot::run(&arg, config)?,
        Mode::Columns(arg) => columns::run(&arg, config)?,
        Mode::TrainingMatrix(arg) => training_matrix::run(&arg, config)?,
        Mode::Predict(arg) => predict::run(&arg, config)?,
    }
    Ok(())
}
