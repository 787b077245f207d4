//! CORA CLI binary.
//!
//! Runs the configured frequency pipelines and writes their results.

use clap::{Parser, Subcommand};
use cora::output::{ExportConfig, OutputWriter};
use cora::{CoraConfig, run_pipelines, within_sources};
use cora::data::CsvTableLoader;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Output directory used when neither the flag nor the config names one.
const DEFAULT_OUT_DIR: &str = "output";

#[derive(Parser)]
#[command(name = "cora")]
#[command(about = "CORA: cross-asset correlation analysis", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every pipeline and write its results
    Run {
        /// Pipeline configuration file
        #[arg(long, short)]
        config: PathBuf,

        /// Output directory (overrides the config file)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Only run the named pipelines
        #[arg(long)]
        pipeline: Vec<String>,
    },

    /// Write one correlation matrix per source over its native columns
    Within {
        /// Pipeline configuration file
        #[arg(long, short)]
        config: PathBuf,

        /// Output directory (overrides the config file)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Check a configuration file without running it
    Validate {
        /// Pipeline configuration file
        #[arg(long, short)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            config,
            out_dir,
            pretty,
            pipeline,
        } => run_all(&config, out_dir, pretty, &pipeline),
        Commands::Within { config, out_dir } => run_within(&config, out_dir),
        Commands::Validate { config } => validate(&config),
    }
}

/// Export settings from the config file, with command-line overrides applied.
fn export_config(config: &CoraConfig, out_dir: Option<PathBuf>, pretty: bool) -> ExportConfig {
    let mut export = config
        .output
        .clone()
        .unwrap_or_else(|| ExportConfig::new(DEFAULT_OUT_DIR));
    if let Some(out_dir) = out_dir {
        export.out_dir = out_dir;
    }
    export.pretty |= pretty;
    export
}

fn run_all(
    path: &Path,
    out_dir: Option<PathBuf>,
    pretty: bool,
    only: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CoraConfig::load(path)?;
    if !only.is_empty() {
        if let Some(unknown) = only
            .iter()
            .find(|name| !config.pipelines.iter().any(|p| &p.name == *name))
        {
            return Err(format!("No pipeline named {}", unknown).into());
        }
        config.pipelines.retain(|p| only.contains(&p.name));
    }

    let writer = OutputWriter::new(export_config(&config, out_dir, pretty))?;
    info!(
        pipelines = config.pipelines.len(),
        out_dir = %writer.config().out_dir.display(),
        "running pipelines"
    );

    let results = run_pipelines(&config, &CsvTableLoader::new());

    let mut failed = 0;
    for result in results {
        match result {
            Ok(output) => {
                let paths = output.write(&writer)?;
                println!("{}", output.summary().to_ascii_table());
                println!("  {} files written\n", paths.len());
            }
            Err(e) => {
                eprintln!("Pipeline failed: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} pipelines failed", failed, config.pipelines.len()).into());
    }
    Ok(())
}

fn run_within(path: &Path, out_dir: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = CoraConfig::load(path)?;
    let writer = OutputWriter::new(export_config(&config, out_dir, false))?;

    let matrices = within_sources(&config, &CsvTableLoader::new());
    let written = writer.write_within_dataset(&matrices)?;

    println!("Within-source correlations");
    println!("==========================\n");
    for (source, matrix) in &matrices {
        println!("  {:<24} {} columns", source, matrix.len());
    }
    println!("\nWrote {}", written.display());
    Ok(())
}

fn validate(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = CoraConfig::load(path)?;

    println!("Configuration OK: {}", path.display());
    for pipeline in &config.pipelines {
        let columns: usize = pipeline.sources.iter().map(|s| s.columns.len()).sum();
        println!(
            "  {:<16} {:<8} {} sources, {} columns",
            pipeline.name,
            pipeline.frequency.to_string(),
            pipeline.sources.len(),
            columns
        );
    }
    Ok(())
}
