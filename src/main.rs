mod config;

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ical2vdir_core::ics::parse_document;
use ical2vdir_core::{SyncOptions, SyncProgress, Synchronizer, Vdir};
use log::LevelFilter;

use crate::config::Settings;

/// Split an iCalendar document read from stdin into one .ics file per event
/// or task. Files are only rewritten when their item changed.
#[derive(Parser, Debug)]
#[command(name = "ical2vdir", version)]
struct Cli {
    /// Directory to write the items to (defaults to the configured directory, else the current one)
    #[arg(short = 'o', long = "output", visible_alias = "output-dir", value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Remove .ics files from the output directory that are not in the input
    #[arg(long)]
    delete: bool,

    /// Only log warnings and errors
    #[arg(short, long, visible_short_alias = 'q', visible_alias = "quiet")]
    silent: bool,

    /// Log unchanged items and other details
    #[arg(short, long)]
    verbose: bool,

    /// Read settings from this file instead of ~/.config/ical2vdir/config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.silent {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }
}

fn init_logger(level: LevelFilter) {
    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.log_level());

    let settings = Settings::load(cli.config.as_deref())?;
    let output_dir = cli
        .output_dir
        .clone()
        .or_else(|| settings.output_dir())
        .unwrap_or_else(|| PathBuf::from("."));
    let options = SyncOptions {
        delete: cli.delete || settings.delete,
    };

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("Failed to read calendar from stdin")?;
    let document = parse_document(&input).context("Failed to parse calendar from stdin")?;

    let synchronizer = Synchronizer::new(Vdir::new(&output_dir), options);
    let mut progress = SyncProgress::new();
    let report = synchronizer
        .sync(&document, &mut progress)
        .with_context(|| format!("Failed to sync into {}", output_dir.display()))?;

    log::debug!("{}", report);

    Ok(())
}
