use std::path::Path;

use anyhow::Context;
use pitchcast_baseball::snapshot::{save_snapshots, SnapshotTable};
use pitchcast_baseball::table::load_table;
use pitchcast_core::config::Config;
use tracing::info;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct SnapshotArg {
    /// Season whose feature table the snapshots are taken from
    #[arg(long)]
    season: String,
}

pub(crate) fn run(arg: &SnapshotArg, config: &Config) -> anyhow::Result<()> {
    let input = config.data.season_table(&arg.season);
    let rows = load_table(&input)
        .with_context(|| format!("failed to load feature table {}", input.display()))?;

    let table = SnapshotTable::build(&rows, config.pipeline.min_pitches);
    let output = Path::new(&config.data.snapshot_path);
    save_snapshots(output, &table)
        .with_context(|| format!("failed to write snapshots to {}", output.display()))?;
    info!(
        "{} pitcher snapshots from season {} written to {}",
        table.len(),
        arg.season,
        output.display()
    );

    println!("{} pitchers -> {}", table.len(), output.display());
    Ok(())
}
