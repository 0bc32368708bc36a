//! bucketsync CLI - Mirror a local directory into an object-storage bucket
//!
//! One run performs:
//! 1. CLI-level path checks (aborting before the remote is touched)
//! 2. Configuration loading with environment credential overrides
//! 3. Store construction (bucket created if absent) and engine wiring
//! 4. Synchronization, or a read-only verification with `--verify-only`

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod output;

use bucketsync_core::config::Config;
use bucketsync_core::domain::SyncRoot;
use bucketsync_engine::reconciler::{Reconciler, ReconcilerOptions, SyncReport, VerifyReport};
use bucketsync_store::S3ObjectStore;
use output::{get_formatter, OutputFormat, OutputFormatter};

#[derive(Debug, Parser)]
#[command(
    name = "bucketsync",
    version,
    about = "One-way synchronization of a local directory to an object-storage bucket"
)]
pub struct Cli {
    /// Local directory to mirror
    directory: PathBuf,

    /// Target bucket name
    bucket: String,

    /// Show what would change without touching the bucket
    #[arg(long)]
    dry_run: bool,

    /// Check synchronization instead of performing it
    #[arg(long)]
    verify_only: bool,

    /// Maximum file transfers in flight (overrides config)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let formatter = get_formatter(cli.json);

    match run(cli, format, formatter.as_ref()).await {
        Ok(code) => code,
        Err(err) => {
            formatter.error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(
    cli: Cli,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) -> Result<ExitCode> {
    // Step 1: CLI-level path checks; both abort before the remote is touched.
    let metadata = match std::fs::metadata(&cli.directory) {
        Ok(metadata) => metadata,
        Err(_) => {
            formatter.error(&format!("path does not exist: {}", cli.directory.display()));
            return Ok(ExitCode::FAILURE);
        }
    };
    if !metadata.is_dir() {
        formatter.error(&format!("not a directory: {}", cli.directory.display()));
        return Ok(ExitCode::FAILURE);
    }

    // Step 2: Load config, overlay environment credentials
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path);
    config.apply_env_overrides();

    let validation_errors = config.validate();
    if !validation_errors.is_empty() {
        for error in &validation_errors {
            formatter.error(&error.to_string());
        }
        return Ok(ExitCode::FAILURE);
    }

    info!(config_path = %config_path.display(), "loaded configuration");

    // Step 3: Wire up the store and the engine
    let absolute = std::fs::canonicalize(&cli.directory)
        .with_context(|| format!("Failed to resolve path: {}", cli.directory.display()))?;
    let sync_root = SyncRoot::new(absolute).context("Invalid sync root")?;

    let store = S3ObjectStore::open(&config.remote, &cli.bucket)
        .await
        .with_context(|| format!("Failed to open bucket '{}'", cli.bucket))?;

    let options = ReconcilerOptions {
        concurrency: cli.concurrency.unwrap_or(config.sync.concurrency),
        dry_run: cli.dry_run,
        retry_attempts: config.sync.retry_attempts,
    };

    let mut reconciler = Reconciler::initialize(sync_root, Arc::new(store), options)
        .await
        .context("Failed to initialize synchronization")?;

    // Ctrl-C cancels cooperatively; partial progress is reconciled by the
    // next run.
    let cancel = reconciler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    // Step 4: Verify or synchronize
    if cli.verify_only {
        formatter.info("Checking synchronization...");
        let report = reconciler.verify().await.context("Verification failed")?;
        print_verify_report(&report, format, formatter);
        return Ok(if report.is_synchronized() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    formatter.info("Starting synchronization...");
    let report = reconciler
        .synchronize()
        .await
        .context("Synchronization failed")?;
    print_sync_report(&report, cli.dry_run, format, formatter);

    Ok(ExitCode::SUCCESS)
}

fn print_sync_report(
    report: &SyncReport,
    dry_run: bool,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) {
    if matches!(format, OutputFormat::Json) {
        let json = serde_json::json!({
            "files_uploaded": report.files_uploaded,
            "files_skipped": report.files_skipped,
            "objects_deleted": report.objects_deleted,
            "duration_ms": report.duration_ms,
            "dry_run": dry_run,
        });
        formatter.print_json(&json);
        return;
    }

    let duration_display = if report.duration_ms >= 1000 {
        format!("{:.1}s", report.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", report.duration_ms)
    };

    if dry_run {
        formatter.success(&format!(
            "Dry run completed in {duration_display} (no changes made)"
        ));
    } else if report.files_uploaded == 0 && report.objects_deleted == 0 {
        formatter.success("Already up to date");
    } else {
        formatter.success(&format!("Synchronized in {duration_display}"));
    }

    if report.files_uploaded > 0 {
        formatter.info(&format!(
            "Uploaded:  {} file{}",
            report.files_uploaded,
            if report.files_uploaded == 1 { "" } else { "s" }
        ));
    }
    if report.files_skipped > 0 {
        formatter.info(&format!(
            "Unchanged: {} file{}",
            report.files_skipped,
            if report.files_skipped == 1 { "" } else { "s" }
        ));
    }
    if report.objects_deleted > 0 {
        formatter.info(&format!(
            "Deleted:   {} object{}",
            report.objects_deleted,
            if report.objects_deleted == 1 { "" } else { "s" }
        ));
    }
}

fn print_verify_report(
    report: &VerifyReport,
    format: OutputFormat,
    formatter: &dyn OutputFormatter,
) {
    if matches!(format, OutputFormat::Json) {
        let json = serde_json::json!({
            "synchronized": report.is_synchronized(),
            "local_files": report.local_files,
            "remote_objects": report.remote_objects,
            "findings": report
                .findings
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>(),
        });
        formatter.print_json(&json);
        return;
    }

    if report.is_synchronized() {
        formatter.success(&format!(
            "Directory is synchronized ({} file{})",
            report.local_files,
            if report.local_files == 1 { "" } else { "s" }
        ));
    } else {
        formatter.error("directory is not synchronized");
        for finding in &report.findings {
            formatter.info(&format!("- {finding}"));
        }
    }
}
