mod cli;
mod commands;
mod db;
mod model;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import(args) => commands::import::run(args),
        Commands::Transform(args) => commands::transform::run(args),
        Commands::Event(args) => commands::compose::run_event(args),
        Commands::Round(args) => commands::compose::run_round(args),
        Commands::Slot(args) => commands::compose::run_slot(args),
        Commands::UserQuestion(args) => commands::compose::run_user_question(args),
        Commands::View(args) => commands::compose::run_view(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::Validate(args) => commands::validate::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
