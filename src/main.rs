//! sizewatch - file size change monitor
//!
//! Entry point for the sizewatch CLI and daemon.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sizewatch::monitor::{FirstRunPolicy, Monitor, ScanAttempt, ScanInterval, ScanReport};
use sizewatch::notify::{self, NotifyTransport};
use sizewatch::server::{init_metrics, init_tracing, App, ServerConfig};
use sizewatch::storage::{init_storage, Database, SnapshotStore, SqliteSnapshotStore};
use sizewatch::{Config, Result};

/// sizewatch - report files whose size changed since the last scan
#[derive(Parser, Debug)]
#[command(name = "sizewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory tree to monitor
    #[arg(short, long, global = true, env = "SIZEWATCH_ROOT", default_value = ".")]
    root: PathBuf,

    /// Data directory for `SQLite` database
    #[arg(short, long, global = true, env = "SIZEWATCH_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Root-relative paths to skip (comma-separated, exact match)
    #[arg(short, long, global = true, env = "SIZEWATCH_EXCLUDE", value_delimiter = ',')]
    exclude: Vec<String>,

    /// Notification recipient
    #[arg(long, global = true, env = "SIZEWATCH_EMAIL")]
    email: Option<String>,

    /// Notification transport (log, spool, sendmail)
    #[arg(long, global = true, env = "SIZEWATCH_NOTIFY", default_value = "log")]
    notify: NotifyTransport,

    /// Spool directory for the spool transport
    #[arg(long, global = true, env = "SIZEWATCH_SPOOL_DIR")]
    spool_dir: Option<PathBuf>,

    /// Sendmail-compatible program for the sendmail transport
    #[arg(long, global = true, env = "SIZEWATCH_SENDMAIL_PATH", default_value = notify::DEFAULT_SENDMAIL)]
    sendmail_path: PathBuf,

    /// Sender address for notifications
    #[arg(long, global = true, env = "SIZEWATCH_MAIL_FROM", default_value = "sizewatch@localhost")]
    mail_from: String,

    /// Scan interval (hourly, daily)
    #[arg(long, global = true, env = "SIZEWATCH_INTERVAL", default_value = "daily")]
    interval: ScanInterval,

    /// First-run detection (empty-snapshot, scan-history)
    #[arg(long, global = true, env = "SIZEWATCH_FIRST_RUN", default_value = "empty-snapshot")]
    first_run: FirstRunPolicy,

    /// Host address to bind to
    #[arg(long, global = true, env = "SIZEWATCH_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, global = true, env = "SIZEWATCH_PORT", default_value = "8080")]
    port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "SIZEWATCH_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, global = true, env = "SIZEWATCH_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scan cycle now and print the report
    Scan {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the scheduler and HTTP server until interrupted
    Run,
    /// Print the stored snapshot
    Snapshot,
    /// Print recent scan runs
    History {
        /// Number of runs to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            root: self.root.clone(),
            data_dir: self.data_dir.clone(),
            exclusions: self.exclude.clone(),
            email: self.email.clone(),
            notify: self.notify,
            spool_dir: self.spool_dir.clone(),
            sendmail_path: self.sendmail_path.clone(),
            mail_from: self.mail_from.clone(),
            interval: self.interval,
            first_run: self.first_run,
            host: self.host.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
            log_json: self.log_json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    let config = cli.config();
    tracing::debug!(?config, "Configuration loaded");
    config.validate()?;

    let db = Database::open(config.database_path())?;
    init_storage(&db)?;
    let store = Arc::new(SqliteSnapshotStore::new(db));

    init_metrics();

    match cli.command {
        Command::Scan { json } => scan_once(&config, store, json).await,
        Command::Run => run(&config, store).await,
        Command::Snapshot => print_snapshot(store.as_ref()),
        Command::History { limit } => print_history(store.as_ref(), limit),
    }
}

fn build_monitor(config: &Config, store: &Arc<SqliteSnapshotStore>) -> Result<Arc<Monitor>> {
    let notifier = notify::from_config(config)?;
    Ok(Arc::new(Monitor::new(
        config.scan_settings(),
        Arc::clone(store) as Arc<dyn SnapshotStore>,
        notifier,
    )))
}

async fn scan_once(config: &Config, store: Arc<SqliteSnapshotStore>, json: bool) -> Result<()> {
    let monitor = build_monitor(config, &store)?;

    match monitor.scan_now_async().await? {
        ScanAttempt::Completed(report) if json => {
            let out = serde_json::to_string_pretty(&report)
                .map_err(|e| sizewatch::Error::internal(e.to_string()))?;
            println!("{out}");
        }
        ScanAttempt::Completed(report) => print_report(&report),
        ScanAttempt::Skipped => println!("A scan is already running"),
    }
    Ok(())
}

async fn run(config: &Config, store: Arc<SqliteSnapshotStore>) -> Result<()> {
    tracing::info!(
        "sizewatch v{} starting, watching {} ({}), API on {}",
        env!("CARGO_PKG_VERSION"),
        config.root.display(),
        config.interval,
        config.server_addr()
    );

    let monitor = build_monitor(config, &store)?;
    let server_config = ServerConfig {
        host: config.host.clone(),
        port: config.port,
        scan_period: config.interval.as_duration(),
    };

    App::new(server_config, monitor, store).run().await
}

fn print_report(report: &ScanReport) {
    println!(
        "Scanned {} files under {} in {} ms",
        report.files, report.root, report.duration_ms
    );
    for warning in &report.warnings {
        println!("  skipped {}: {}", warning.path, warning.message);
    }
    if report.changes.is_empty() {
        println!("No size changes");
    } else {
        for change in &report.changes {
            println!("{change}");
        }
    }
    println!("Notification: {}", report.notification.as_str());
}

fn print_snapshot(store: &SqliteSnapshotStore) -> Result<()> {
    let snapshot = store.load()?;
    for (path, size) in snapshot.iter() {
        println!("{size:>12}  {path}");
    }
    println!(
        "{} files, {} bytes",
        snapshot.len(),
        snapshot.total_bytes()
    );
    Ok(())
}

fn print_history(store: &SqliteSnapshotStore, limit: usize) -> Result<()> {
    let runs = store.recent_runs(limit)?;
    if runs.is_empty() {
        println!("No scans recorded");
    }
    for run in runs {
        println!(
            "{}  {}  files={} changes={} warnings={} notification={}{}",
            run.started_at.to_rfc3339(),
            run.id,
            run.files,
            run.changes,
            run.warnings,
            run.notification,
            run.notify_error
                .map(|e| format!(" ({e})"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
