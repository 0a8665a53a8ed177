// src/bin/cli.rs
use std::{path::Path, process::ExitCode};

use clap::Parser;
use rad_scrape::{cli, config::consts::STORE_DIR, log};

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    log::init(Path::new(STORE_DIR));
    cli::run(cli::Cli::parse())
}
