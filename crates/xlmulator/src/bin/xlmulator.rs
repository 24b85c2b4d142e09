use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use xlmulator::{EvalConfig, SheetSeed, emulate};

#[derive(Parser, Debug)]
#[command(
    name = "xlmulator",
    version,
    about = "Emulate an XLM macro sheet and report the actions it would take"
)]
struct Cli {
    /// JSON seed: {"sheet": "Macro1", "cells": {"A1": "=CHAR(65)", "B1": 42}}
    seed: PathBuf,

    /// Print the full report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Log at debug level (RUST_LOG takes precedence when set).
    #[arg(short, long)]
    verbose: bool,

    /// Evaluator recursion ceiling.
    #[arg(long, default_value_t = EvalConfig::default().max_depth)]
    max_depth: usize,

    /// Ceiling on formula cells written during the pass that get evaluated.
    #[arg(long, default_value_t = EvalConfig::default().max_dynamic_cells)]
    max_dynamic_cells: usize,

    /// Evaluate every formula cell even when its text repeats.
    #[arg(long)]
    no_dedupe: bool,
}

impl Cli {
    fn config(&self) -> EvalConfig {
        EvalConfig::default()
            .with_max_depth(self.max_depth)
            .with_max_dynamic_cells(self.max_dynamic_cells)
            .with_dedupe_by_text(!self.no_dedupe)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let raw = fs::read_to_string(&cli.seed)
        .with_context(|| format!("reading seed file {}", cli.seed.display()))?;
    let seed: SheetSeed = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", cli.seed.display()))?;
    let report = emulate(&seed, cli.config()).context("loading seed into a sheet")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("[{}] formulas", report.sheet);
    print!("{}", report.formulas);
    println!();
    println!("actions");
    for action in &report.actions {
        println!("{action}");
    }
    if !report.failures.is_empty() {
        println!();
        println!("failures");
        for f in &report.failures {
            println!("{}\t{}\t{}", f.cell, f.category, f.message);
        }
    }
    Ok(())
}
