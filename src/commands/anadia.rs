use anyhow::Result;

use crate::cli::Cli;
use crate::config::Config;
use crate::datasources::anadia;

pub fn process(cli: &Cli) -> Result<()> {
    let cfg = Config::from_env()?;
    let path = anadia::process(&cfg, cli.verbose)?;
    println!("Processed ANADIA survey -> {}", path.display());
    Ok(())
}
