use anyhow::Result;

use crate::cli::Cli;
use crate::config::Config;
use crate::datasources::hydrosheds;

pub fn extract_river(cli: &Cli) -> Result<()> {
    let cfg = Config::from_env()?;
    let path = hydrosheds::extract_niger_river(&cfg, cli.verbose)?;
    println!("Niger main stem -> {}", path.display());
    Ok(())
}
