use clap::{Args, Parser, Subcommand};

use crate::config::{Category, Window};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Harvest(HarvestArgs),
    Graph(GraphArgs),
}

#[derive(Debug, Args)]
pub struct HarvestArgs {
    /// Ranking language category.
    #[arg(long, value_enum)]
    pub category: Category,

    /// Ranking time window in days.
    #[arg(long, value_enum)]
    pub window: Window,

    /// Site description file (JSON). Defaults to the built-in site.
    #[arg(long)]
    pub config: Option<String>,

    /// Keep only the first N records.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Also write the records to a CSV file at this path.
    #[arg(long)]
    pub csv: Option<String>,
}

#[derive(Debug, Args)]
pub struct GraphArgs {
    /// Ranking language category.
    #[arg(long, value_enum)]
    pub category: Category,

    /// Ranking time window in days.
    #[arg(long, value_enum)]
    pub window: Window,

    /// Site description file (JSON). Defaults to the built-in site.
    #[arg(long)]
    pub config: Option<String>,

    /// Output path for the rendered SVG (default: a unique temp file).
    #[arg(long)]
    pub out: Option<String>,
}
