mod apply;
mod cli;
mod plan;
mod show;
mod web;

use clap::Parser;
use eyre::Result;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let Cli { verbose, command } = Cli::parse();
    packdown_core::logger::init(verbose);

    match command {
        Commands::Plan(args) => plan::run_plan(&args)?,
        Commands::Apply(args) => apply::run_apply(&args)?,
        Commands::Show(args) => show::run_show(&args)?,
        Commands::Web(args) => web::run_web(&args).await?,
    }

    Ok(())
}
