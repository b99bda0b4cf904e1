use anyhow::{bail, Context};
use pitchcast_baseball::pipeline::SeasonPipeline;
use pitchcast_baseball::record::load_raw_pitches;
use pitchcast_baseball::table::save_table;
use pitchcast_core::config::Config;
use tracing::info;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct FeaturesArg {
    /// Season to process; repeat in chronological order to carry rates across seasons
    #[arg(long = "season", required = true)]
    seasons: Vec<String>,
    /// Replace season tables that already exist
    #[arg(long)]
    overwrite: bool,
}

pub(crate) fn run(arg: &FeaturesArg, config: &Config) -> anyhow::Result<()> {
    let FeaturesArg { seasons, overwrite } = arg;

    // Refuse before any work: a season skipped midway would break rate carry-over.
    if !overwrite {
        for season in seasons {
            let output = config.data.season_table(season);
            if output.exists() {
                bail!(
                    "{} already exists; pass --overwrite to replace it",
                    output.display()
                );
            }
        }
    }

    let mut pipeline = SeasonPipeline::new(config.pipeline.min_pitches);
    for season in seasons {
        let input = config.data.raw_season(season);
        let raw = load_raw_pitches(&input)
            .with_context(|| format!("failed to load raw pitches for season {season}"))?;
        let (rows, report) = pipeline.process_season(season, raw);

        let output = config.data.season_table(season);
        save_table(&output, &rows)
            .with_context(|| format!("failed to write feature table for season {season}"))?;
        info!("season {} written to {}", season, output.display());

        println!(
            "{season}: {} rows ({} malformed dropped, {} at-bats, {} with rates) -> {}",
            report.rows,
            report.dropped_malformed,
            report.at_bats,
            report.rows_with_rates,
            output.display()
        );
    }
    Ok(())
}
