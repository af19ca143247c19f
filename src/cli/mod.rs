//! Command-line parsing for the macro chart book renderer.
//!
//! Parsing is kept separate from dispatch (`app`) and from the pipeline so the
//! argument surface can be tested without touching a provider.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mc", version, about = "Macro series chart book renderer (Macrobond-based)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the charts in the book.
    List(BookArgs),
    /// Fetch, transform and render charts to SVG.
    Render(RenderArgs),
    /// Print the native frequency of one or more series.
    Frequency(FrequencyArgs),
    /// Chart book utilities.
    #[command(subcommand)]
    Book(BookCommand),
}

#[derive(Debug, Subcommand)]
pub enum BookCommand {
    /// Write the built-in chart book as JSON.
    Export {
        /// Destination file.
        path: PathBuf,
    },
}

#[derive(Debug, Args, Clone)]
pub struct BookArgs {
    /// Chart book JSON to use instead of the built-in Brazil book.
    #[arg(long, value_name = "JSON")]
    pub book: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ProviderArgs {
    /// Read series from a fixture JSON file instead of the Macrobond Web API.
    #[arg(long, value_name = "JSON")]
    pub fixtures: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Chart keys to render (see `mc list`).
    #[arg(value_name = "KEY", required_unless_present = "all", conflicts_with = "all")]
    pub keys: Vec<String>,

    /// Render every chart in the book.
    #[arg(long)]
    pub all: bool,

    /// Directory for `<key>.svg` files.
    #[arg(long, value_name = "DIR", default_value = "charts")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub book: BookArgs,

    #[command(flatten)]
    pub provider: ProviderArgs,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = 1500)]
    pub width: u32,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = 1000)]
    pub height: u32,

    /// Also write `<key>.csv` with the filtered table.
    #[arg(long)]
    pub export_csv: bool,
}

#[derive(Debug, Args, Clone)]
pub struct FrequencyArgs {
    /// Series identifiers.
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}
