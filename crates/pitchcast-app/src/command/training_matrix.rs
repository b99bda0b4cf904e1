use std::path::PathBuf;

use anyhow::Context;
use pitchcast_baseball::encoding::FeatureEncoding;
use pitchcast_baseball::table::load_table;
use pitchcast_baseball::training::TrainingMatrix;
use pitchcast_core::config::Config;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TrainingMatrixArg {
    /// Season feature table to include; repeat to concatenate seasons
    #[arg(long = "season", required = true)]
    seasons: Vec<String>,
    /// Encoding to export; defaults to the configured one
    #[arg(long)]
    encoding: Option<FeatureEncoding>,
    /// Output file path
    #[arg(long)]
    output: PathBuf,
}

pub(crate) fn run(arg: &TrainingMatrixArg, config: &Config) -> anyhow::Result<()> {
    let TrainingMatrixArg {
        seasons,
        encoding,
        output,
    } = arg;
    let encoding = encoding.unwrap_or(config.training.encoding);

    let mut rows = Vec::new();
    for season in seasons {
        let path = config.data.season_table(season);
        let table =
            load_table(&path).with_context(|| format!("failed to load {}", path.display()))?;
        rows.extend(table);
    }

    let matrix = TrainingMatrix::build(&rows, encoding, config.training.drop_other_labels);
    matrix
        .save(output)
        .with_context(|| format!("failed to write training matrix to {}", output.display()))?;

    let skipped = matrix.skipped();
    println!(
        "{} samples, {encoding} encoding ({} without rates, {} `other` labels skipped) -> {}",
        matrix.len(),
        skipped.undefined_rates,
        skipped.other_labels,
        output.display()
    );
    Ok(())
}
