//! Anywhere credentials CLI entry point.

use anyhow::Result;
use anywhere_core::log;
use clap::Parser;
use colored::Colorize;

mod cli;
mod commands;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    match cli.execute().await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_logging(debug: bool) {
    let result = if debug {
        log::init_with_directives("anywhere=debug")
    } else {
        log::init_default()
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Warning:".yellow().bold(), e);
    }
}
