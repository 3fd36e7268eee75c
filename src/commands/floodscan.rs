use anyhow::Result;

use crate::cli::Cli;
use crate::config::Config;
use crate::datasources::floodscan;

pub fn clip(cli: &Cli) -> Result<()> {
    let cfg = Config::from_env()?;
    let path = floodscan::clip_floodscan(&cfg, cli.verbose)?;
    println!("Clipped FloodScan -> {}", path.display());
    Ok(())
}

pub fn stats(cli: &Cli) -> Result<()> {
    let cfg = Config::from_env()?;
    let path = floodscan::run_floodscan_stats(&cfg, cli.verbose)?;
    println!("FloodScan statistics -> {}", path.display());
    Ok(())
}

pub fn exposure(cli: &Cli) -> Result<()> {
    let cfg = Config::from_env()?;
    let path = floodscan::calc_daily_exposure(&cfg, cli.verbose)?;
    println!("Daily exposure -> {}", path.display());
    Ok(())
}
