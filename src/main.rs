use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    booktop::logging::init().context("init logging")?;

    let cli = booktop::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        booktop::cli::Command::Harvest(args) => {
            booktop::harvest::run(args).context("harvest")?;
        }
        booktop::cli::Command::Graph(args) => {
            booktop::graph::run(args).context("graph")?;
        }
    }

    Ok(())
}
