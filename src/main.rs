use anyhow::Result;
use clap::Parser;

use ner_flooding::cli::{Cli, Commands};
use ner_flooding::commands::{anadia, codab, floodscan, hydrosheds, worldpop};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match &cli.command {
        Commands::DownloadCodab(args) => codab::download(&cli, args),
        Commands::ClipFloodscan => floodscan::clip(&cli),
        Commands::FloodscanStats => floodscan::stats(&cli),
        Commands::Exposure => floodscan::exposure(&cli),
        Commands::AggregateWorldpop => worldpop::aggregate(&cli),
        Commands::ProcessAnadia => anadia::process(&cli),
        Commands::ExtractRiver => hydrosheds::extract_river(&cli),
    }
}
