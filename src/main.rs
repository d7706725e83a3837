//! zoomify-stitch - Rebuild full-resolution images from Zoomify tile pyramids.
//!
//! This binary parses the command line, configures logging and runs one
//! reconstruction.

use clap::Parser;
use std::fmt::Display;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zoomify_stitch::{
    config::{Cli, ReportFormat},
    Reconstructor, ReqwestHttpClient, RunReport,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        report_failure(&mut std::io::stderr(), "Configuration error", &e);
        return ExitCode::FAILURE;
    }

    let base_url = cli.normalized_base_url();
    let options = cli.options();

    info!("Configuration:");
    info!("  Base URL: {}", base_url);
    info!("  Target: {}", cli.target_dir.display());
    info!("  Output name: {}", cli.output_name);
    info!(
        "  Concurrency: {}, timeout: {}s, JPEG quality: {}",
        options.concurrency, cli.timeout, options.jpeg_quality
    );

    let client = match ReqwestHttpClient::with_timeout(Duration::from_secs(cli.timeout)) {
        Ok(client) => client,
        Err(e) => {
            report_failure(&mut std::io::stderr(), "HTTP client error", &e);
            return ExitCode::FAILURE;
        }
    };

    let reconstructor = Reconstructor::with_options(client, options);

    match reconstructor
        .run(&base_url, &cli.target_dir, &cli.output_name)
        .await
    {
        Ok(report) => {
            print_report(&report, cli.format);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_failure(&mut std::io::stderr(), "Reconstruction failed", &e);
            ExitCode::FAILURE
        }
    }
}

/// Print the run summary to stdout.
fn print_report(report: &RunReport, format: ReportFormat) {
    match format {
        ReportFormat::Text => {
            println!(
                "{} ({}x{}, {} tiles, {} bytes, {} ms)",
                report.output.display(),
                report.width,
                report.height,
                report.tiles,
                report.bytes_downloaded,
                report.elapsed_ms
            );
        }
        ReportFormat::Json => match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize report: {}", e),
        },
    }
}

/// Write a fatal error to `out`.
///
/// Written directly rather than through `tracing` so it is shown whatever
/// `RUST_LOG` filters out.
fn report_failure(out: &mut impl Write, context: &str, error: &dyn Display) {
    // Nothing left to report to if stderr itself fails
    let _ = writeln!(out, "error: {}: {}", context, error);
}

/// Initialize the tracing/logging subsystem.
///
/// Logs go to stderr so that stdout only carries the report.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "zoomify_stitch=debug"
    } else {
        "zoomify_stitch=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
