use anyhow::Result;

use crate::cli::Cli;
use crate::config::Config;
use crate::datasources::worldpop;

pub fn aggregate(cli: &Cli) -> Result<()> {
    let cfg = Config::from_env()?;
    let path = worldpop::aggregate_to_adm2(&cfg, cli.verbose)?;
    println!("WorldPop admin-2 totals -> {}", path.display());
    Ok(())
}
