use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::error;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use osm_audit::etl::sample::SampleEtl;
use osm_audit::{Config, Etl, Result, RunReport};

const DEFAULT_CONFIG: &str = "config/osm_audit.json";

#[derive(Parser)]
#[command(name = "osm_audit", version, about = "Audit street names in an OSM dump and export it as CSV")]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Log level for the JSON logs written to stderr.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Show a progress bar while streaming elements.
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Command {
    /// Sample (if enabled), audit, clean and write every CSV output.
    #[default]
    Run,
    /// Print the unexpected street types and the names using them as JSON.
    Audit,
    /// Only write the sample document.
    Sample,
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stderr()))
        .init();
}

fn print_report(report: &RunReport) {
    if let Some(sample) = &report.sample {
        println!("Sample written: {} of {} elements", sample.loaded, sample.elements);
    }
    println!(
        "Street types flagged: {}, names corrected: {}",
        report.street_types, report.corrections
    );
    println!(
        "Elements read: {}, written: {}, dropped: {}",
        report.records.elements, report.records.loaded, report.records.skipped
    );
    println!("Process Complete");
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    match cli.command.unwrap_or_default() {
        Command::Run => {
            let report = osm_audit::process(&config, cli.progress)?;
            print_report(&report);
        }
        Command::Audit => {
            let index = osm_audit::audit(&config)?;
            println!("{}", serde_json::to_string_pretty(&index)?);
        }
        Command::Sample => {
            let summary = SampleEtl::new(&config).with_progress(cli.progress).process()?;
            println!(
                "Sample written to {}: {} of {} elements",
                config.sample.sample_osm.display(),
                summary.loaded,
                summary.elements
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(err = err.to_string(); "Run failed");
            eprintln!("osm_audit: {err}");
            ExitCode::FAILURE
        }
    }
}
