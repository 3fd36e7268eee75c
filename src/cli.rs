use clap::{Args, Parser, Subcommand};

/// Niger flood anticipatory-action data pipeline (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "ner-flooding", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the COD-AB admin boundaries
    DownloadCodab(DownloadCodabArgs),

    /// Clip the global FloodScan stack to Niger
    ClipFloodscan,

    /// Zonal FloodScan statistics over the AOI communes
    FloodscanStats,

    /// Daily flooded-population exposure per commune
    Exposure,

    /// Aggregate WorldPop to admin-2 population totals
    AggregateWorldpop,

    /// Clean the ANADIA flood-impact survey
    ProcessAnadia,

    /// Extract the Niger main stem from HydroRIVERS
    ExtractRiver,
}

#[derive(Args, Debug)]
pub struct DownloadCodabArgs {
    /// Re-download even if the archive already exists
    #[arg(long)]
    pub force: bool,
}
