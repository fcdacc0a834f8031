mod api;
mod app;
mod cli;
mod domain;
mod infra;
mod sync;
mod usecases;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    app::run(cli)
}
