use anyhow::Result;

use crate::cli::{Cli, DownloadCodabArgs};
use crate::config::Config;
use crate::datasources::codab;

pub fn download(cli: &Cli, args: &DownloadCodabArgs) -> Result<()> {
    let cfg = Config::from_env()?;
    codab::download_codab(&cfg, args.force, cli.verbose)?;
    println!("Downloaded COD-AB -> {}", cfg.codab_raw_path().display());
    Ok(())
}
