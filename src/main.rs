use anyhow::Result;
use clap::Parser;
use foldersync::{
    cli::{self, Args},
    config::Config,
    logging,
};

fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;
    logging::init(Some(&args.folder), config.log_level());

    cli::run(&args, &config)
}
