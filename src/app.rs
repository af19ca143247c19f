//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - picks the series provider (Macrobond or fixtures)
//! - runs chart pipelines and writes their outputs
//! - prints reports

use std::path::Path;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::chart::{ChartSpec, RenderOptions};
use crate::cli::{BookArgs, BookCommand, Command, FrequencyArgs, ProviderArgs, RenderArgs};
use crate::data::{FixtureProvider, MacrobondClient, SeriesProvider};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `mc` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    init_logging();

    match cli.command {
        Command::List(args) => handle_list(&args),
        Command::Render(args) => handle_render(&args),
        Command::Frequency(args) => handle_frequency(&args),
        Command::Book(BookCommand::Export { path }) => handle_book_export(&path),
    }
}

/// Logs go to stderr so stdout only carries reports.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Keep an already installed subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_list(args: &BookArgs) -> Result<(), AppError> {
    let book = load_book(args)?;
    print!("{}", crate::report::format_chart_list(&book));
    Ok(())
}

fn handle_render(args: &RenderArgs) -> Result<(), AppError> {
    let book = load_book(&args.book)?;
    let charts = select_charts(&book, &args.keys, args.all)?;
    let provider = open_provider(&args.provider)?;
    let options = RenderOptions {
        width: args.width,
        height: args.height,
    };

    info!(
        charts = charts.len(),
        provider = provider.name(),
        out_dir = %args.out_dir.display(),
        "rendering"
    );
    let summary = pipeline::run_batch(provider.as_ref(), charts, &options, |run| {
        crate::io::write_svg(&args.out_dir, &run.key, &run.svg)?;
        if args.export_csv {
            let path = crate::io::chart_path(&args.out_dir, &run.key, "csv");
            crate::io::write_table_csv(&path, &run.table)?;
        }
        Ok(())
    });

    print!("{}", crate::report::format_batch_summary(&summary, &args.out_dir));
    match summary.last_error() {
        Some(err) => Err(AppError::new(
            err.kind(),
            format!(
                "{} of {} chart(s) failed.",
                summary.failed.len(),
                summary.failed.len() + summary.rendered.len()
            ),
        )),
        None => Ok(()),
    }
}

fn handle_frequency(args: &FrequencyArgs) -> Result<(), AppError> {
    let provider = open_provider(&args.provider)?;
    let metadata = args
        .names
        .iter()
        .map(|name| provider.fetch_metadata(name))
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", crate::report::format_frequencies(&metadata));
    Ok(())
}

fn handle_book_export(path: &Path) -> Result<(), AppError> {
    let book = crate::catalog::brazil();
    crate::io::write_book_json(path, &book)?;
    info!(charts = book.len(), path = %path.display(), "wrote chart book");
    Ok(())
}

fn load_book(args: &BookArgs) -> Result<Vec<ChartSpec>, AppError> {
    match &args.book {
        Some(path) => crate::io::read_book_json(path),
        None => Ok(crate::catalog::brazil()),
    }
}

/// Charts to render, in book order for `--all` and argument order otherwise.
fn select_charts<'a>(book: &'a [ChartSpec], keys: &[String], all: bool) -> Result<Vec<&'a ChartSpec>, AppError> {
    if all {
        return Ok(book.iter().collect());
    }
    keys.iter().map(|key| crate::catalog::find(book, key)).collect()
}

fn open_provider(args: &ProviderArgs) -> Result<Box<dyn SeriesProvider>, AppError> {
    let provider: Box<dyn SeriesProvider> = match &args.fixtures {
        Some(path) => Box::new(FixtureProvider::from_path(path)?),
        None => Box::new(MacrobondClient::from_env()?),
    };
    Ok(provider)
}
