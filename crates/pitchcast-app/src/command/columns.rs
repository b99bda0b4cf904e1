use pitchcast_baseball::encoding::{self, FeatureEncoding};
use pitchcast_core::config::Config;

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ColumnsArg {
    /// Encoding to list (`full` or `simplified`); defaults to the configured one
    #[arg(long)]
    encoding: Option<FeatureEncoding>,
}

pub(crate) fn run(arg: &ColumnsArg, config: &Config) -> anyhow::Result<()> {
    let encoding = arg.encoding.unwrap_or(config.training.encoding);
    for (i, column) in encoding::columns(encoding).iter().enumerate() {
        println!("{i:>3}  {column}");
    }
    Ok(())
}
