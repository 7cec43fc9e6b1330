mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use fluxforge::{dump, warp};
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fluxforge=trace,fluxforge_container=debug,fluxforge_common=debug".to_string()
        } else {
            "fluxforge=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Warp {
            output,
            input,
            no_warp,
            e_min,
            e_max,
        } => run_warp(&output, &input, no_warp, e_min, e_max),
        Commands::Dump { file, entries } => run_dump(&file, entries),
        Commands::Meta { file, json } => run_meta(&file, json),
        Commands::Version => {
            println!("fluxforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_warp(output: &Path, input: &Path, no_warp: bool, e_min: f64, e_max: f64) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }
    if !(e_min > 0.0 && e_max > e_min) {
        anyhow::bail!(
            "Invalid energy range [{}, {}]: need 0 < e_min < e_max",
            e_min,
            e_max
        );
    }

    println!("Creating:    {}", output.display());
    println!("Input file:  {}", input.display());
    if no_warp {
        println!("++++++++ NO ACTUAL WARP APPLIED");
    }

    let started = Instant::now();
    let summary = if no_warp {
        warp::Rewriter::new(warp::NoWarp).process(input, output)
    } else {
        warp::Rewriter::new(warp::EnergyWarp::new(e_min, e_max)).process(input, output)
    }
    .with_context(|| format!("Failed to rewrite {:?}", input))?;

    println!(
        "Rewrote {} entries in {} segments ({:.6e} POTs) in {:.2?}",
        summary.entries,
        summary.segments,
        summary.total_pots,
        started.elapsed()
    );
    Ok(())
}

fn run_dump(file: &Path, entries: Option<u64>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let stdout = std::io::stdout();
    dump::dump_entries(file, entries, &mut stdout.lock())?;
    Ok(())
}

fn run_meta(file: &Path, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }
    let stdout = std::io::stdout();
    dump::dump_meta(file, json, &mut stdout.lock())?;
    Ok(())
}
