use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use file_sorter::{
    walk_and_dispatch, worker_limit, SorterConfig, TransferConfig, WalkReport, WalkerConfig,
};
use tokio::sync::watch;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let matches = Command::new("File Sorter")
        .version("1.0")
        .about("Sorts a directory tree into per-extension folders with concurrent streamed copies")
        .arg(
            Arg::new("source")
                .value_name("SOURCE")
                .help("Source folder to walk")
                .index(1),
        )
        .arg(
            Arg::new("destination")
                .value_name("DESTINATION")
                .help("Destination root for the extension buckets")
                .index(2),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Set the log level (trace, debug, info, warn, error)")
                .default_value("info"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("COUNT")
                .help("Size of the walk/transfer worker pool"),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .value_name("BYTES")
                .help("Chunk size for streamed copies")
                .default_value("1024"),
        )
        .arg(
            Arg::new("no-overwrite")
                .long("no-overwrite")
                .help("Skip files whose destination already exists instead of overwriting")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("report-json")
                .long("report-json")
                .value_name("PATH")
                .help("Write the final run report as JSON to this path"),
        )
        .get_matches();

    let config = match create_sorter_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid arguments: {err:#}");
            return ExitCode::from(2);
        }
    };

    initialize_logging(&config.log_level);

    match run_application(&matches, config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::from(2)
        }
    }
}

/// Pure function to create application configuration from CLI arguments
fn create_sorter_config(matches: &ArgMatches) -> Result<SorterConfig> {
    let log_level = matches.get_one::<String>("log-level").unwrap().clone();

    let chunk_size: usize = matches
        .get_one::<String>("chunk-size")
        .unwrap()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid chunk-size value"))?;
    if chunk_size == 0 {
        anyhow::bail!("chunk-size must be at least 1");
    }

    let workers = matches
        .get_one::<String>("workers")
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| anyhow::anyhow!("Invalid workers value"))
        })
        .transpose()?;

    Ok(SorterConfig {
        transfer: TransferConfig {
            chunk_size,
            overwrite: !matches.get_flag("no-overwrite"),
        },
        walker: WalkerConfig {
            max_workers: worker_limit(workers),
        },
        log_level,
    })
}

/// Initialize structured logging with tracing
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}

/// Resolve a folder argument: CLI positional, then environment variable,
/// then an interactive prompt.
fn resolve_path_argument(
    matches: &ArgMatches,
    arg_name: &str,
    env_var: &str,
    prompt: &str,
) -> Result<PathBuf> {
    if let Some(value) = matches.get_one::<String>(arg_name) {
        return Ok(PathBuf::from(value));
    }

    if let Ok(value) = env::var(env_var) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            info!("Using {} from environment", env_var);
            return Ok(PathBuf::from(trimmed));
        }
    }

    prompt_for_path(prompt)
}

fn prompt_for_path(prompt: &str) -> Result<PathBuf> {
    print!("{prompt}: ");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read path from stdin")?;

    let trimmed = line.trim();
    if trimmed.is_empty() {
        anyhow::bail!("No path provided");
    }
    Ok(PathBuf::from(trimmed))
}

/// Main application logic
async fn run_application(matches: &ArgMatches, config: SorterConfig) -> Result<ExitCode> {
    // Load .env file if it exists
    if dotenvy::dotenv().is_err() {
        info!("No .env file found, using system environment variables");
    }

    let source = resolve_path_argument(
        matches,
        "source",
        "FILE_SORTER_SOURCE",
        "Enter the source folder path",
    )?;
    let destination = resolve_path_argument(
        matches,
        "destination",
        "FILE_SORTER_DESTINATION",
        "Enter the destination folder path",
    )?;

    let source = match tokio::fs::canonicalize(&source).await {
        Ok(path) => path,
        Err(_) => {
            error!("Source folder does not exist: {}", source.display());
            return Ok(ExitCode::from(2));
        }
    };

    info!(
        "Sorting {} into {} with {} workers",
        source.display(),
        destination.display(),
        config.walker.max_workers
    );

    // Flip the shutdown signal on Ctrl-C; workers stop taking new items and
    // in-flight transfers finish their current file.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight transfers");
            let _ = shutdown_tx.send(true);
        }
    });

    let report = walk_and_dispatch(
        &source,
        &destination,
        &config.walker,
        &config.transfer,
        shutdown_rx,
    )
    .await?;

    print_report(&report);

    if let Some(path) = matches.get_one::<String>("report-json") {
        write_json_report(path, &report).await?;
    }

    if report.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Print the walk report through the logging channel
fn print_report(report: &WalkReport) {
    info!("=== FILE SORT REPORT ===");
    info!("Directories walked: {}", report.dirs_walked);
    info!("Files copied: {}", report.files_copied);
    info!("Files skipped: {}", report.files_skipped);
    info!("Entries ignored: {}", report.entries_ignored);
    info!("Errors: {}", report.errors.len());
    info!("Success rate: {:.2}%", report.success_rate() * 100.0);

    if report.cancelled {
        warn!("Run was interrupted before the walk finished");
    }

    if !report.errors.is_empty() {
        error!("Errors encountered:");
        for err in &report.errors {
            error!("  {} ({}): {}", err.path, err.operation, err.error);
        }
    }
}

/// Write the report as JSON for downstream tooling
async fn write_json_report(path: &str, report: &WalkReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write report to {path}"))?;
    info!("Report written to {}", path);
    Ok(())
}
