//! # vrpad-bridge
//!
//! Drive a virtual gamepad from VR hand controllers and head tracking.
//!
//! This binary replays a recorded tracking session through the bridge
//! pipeline and writes the resulting gamepad reports as JSON Lines.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use vrpad_bridge::bridge::frame_loop::FrameLoop;
use vrpad_bridge::bridge::session::Session;
use vrpad_bridge::config::Config;
use vrpad_bridge::gamepad::backend::Backend;
use vrpad_bridge::gamepad::jsonl::{JsonlReportSink, ReportTarget};
use vrpad_bridge::tracking::calibration::JsonFileStore;
use vrpad_bridge::tracking::replay::ReplaySource;

/// Name of the log file written under `--log-dir`
const LOG_FILE_NAME: &str = "vrpad-bridge.log";

/// VR controller to virtual gamepad bridge
#[derive(Parser, Debug)]
#[command(name = "vrpad-bridge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: PathBuf,

    /// Virtual controller to emulate (ds4 or xinput), overrides the config
    #[arg(short, long)]
    backend: Option<Backend>,

    /// Frame rate in Hz, overrides the config
    #[arg(long)]
    hz: Option<f64>,

    /// Recorded tracking session (JSON Lines)
    #[arg(short, long)]
    replay: PathBuf,

    /// Report destination, `-` for stdout
    #[arg(long, default_value = "-")]
    report: String,

    /// Stop after this many frames (defaults to the replay length)
    #[arg(long)]
    frames: Option<u64>,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write logs to a daily file in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

/// Apply command line overrides and re-validate
fn apply_overrides(config: &mut Config, cli: &Cli) -> Result<()> {
    if let Some(backend) = cli.backend {
        config.bridge.backend = backend;
    }
    if let Some(hz) = cli.hz {
        config.bridge.rate_hz = hz;
    }
    if let Some(dir) = &cli.log_dir {
        config.logging.log_dir = Some(dir.display().to_string());
    }
    config.validate().context("Invalid command line override")?;
    Ok(())
}

/// Log level from `-v` flags, falling back to the configured level
fn log_level(verbose: u8, configured: &str) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber
///
/// Logs go to stderr so reports on stdout stay machine-readable. `RUST_LOG`
/// takes precedence over `level`.
///
/// # Returns
///
/// * `Option<WorkerGuard>` - Keeps the file writer flushing; hold until exit
fn init_logging(level: &str, log_dir: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vrpad_bridge={}", level)));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log directory {}", dir))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

/// Main entry point for vrpad-bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (defaults if missing or invalid) and apply flags
///    - Set up logging
///    - Load the replay, open the report sink, load calibration
///    - Verify a head sensor and commit a neutral report
///
/// 2. **Main Loop**
///    - Run frames at the configured rate until the replay or frame limit
///      is reached
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The replay cannot be read or has no head sensor data
/// - The report destination cannot be opened
/// - The report destination fails twice in a row
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config loading logs before the real subscriber exists
    let bootstrap = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new("info"))
        .finish();
    let mut config = tracing::subscriber::with_default(bootstrap, || Config::load_or_default(&cli.config));

    apply_overrides(&mut config, &cli)?;

    let _guard = init_logging(
        log_level(cli.verbose, &config.logging.level),
        config.logging.log_dir.as_deref(),
    )?;

    info!("vrpad-bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let tracking = Arc::new(
        ReplaySource::load(&cli.replay)
            .with_context(|| format!("Failed to load replay {}", cli.replay.display()))?,
    );
    let limit = cli.frames.unwrap_or(tracking.len() as u64);

    let sink = JsonlReportSink::open(ReportTarget::from_arg(&cli.report), config.bridge.backend).await?;
    let store = JsonFileStore::new(&config.calibration.path);
    let session = Session::new(&config, Box::new(store));

    let mut frame_loop = FrameLoop::new(tracking, sink, session, &config).await?;

    info!("Press Ctrl+C to exit");

    tokio::select! {
        result = frame_loop.run(Some(limit)) => {
            let frames = result?;
            info!("Replay finished, {} frames processed", frames);
        }

        // Handle Ctrl+C for graceful shutdown
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = parse(&["vrpad-bridge", "--replay", "session.jsonl"]);
        assert_eq!(cli.config, PathBuf::from("config/default.toml"));
        assert_eq!(cli.report, "-");
        assert_eq!(cli.backend, None);
        assert_eq!(cli.frames, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_cli_requires_replay() {
        assert!(Cli::try_parse_from(["vrpad-bridge"]).is_err());
    }

    #[test]
    fn test_cli_backend_flag() {
        let cli = parse(&["vrpad-bridge", "-r", "s.jsonl", "--backend", "xinput"]);
        assert_eq!(cli.backend, Some(Backend::XInput));
        assert!(Cli::try_parse_from(["vrpad-bridge", "-r", "s.jsonl", "-b", "switch"]).is_err());
    }

    #[test]
    fn test_cli_verbose_count() {
        let cli = parse(&["vrpad-bridge", "-r", "s.jsonl", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_apply_overrides() {
        let cli = parse(&[
            "vrpad-bridge",
            "-r",
            "s.jsonl",
            "--backend",
            "ds4",
            "--hz",
            "90",
            "--log-dir",
            "/tmp/vrpad-logs",
        ]);
        let mut config = Config::default();
        config.bridge.backend = Backend::XInput;

        apply_overrides(&mut config, &cli).unwrap();
        assert_eq!(config.bridge.backend, Backend::Ds4);
        assert_eq!(config.bridge.rate_hz, 90.0);
        assert_eq!(config.logging.log_dir.as_deref(), Some("/tmp/vrpad-logs"));
    }

    #[test]
    fn test_apply_overrides_rejects_bad_rate() {
        let cli = parse(&["vrpad-bridge", "-r", "s.jsonl", "--hz", "0"]);
        let mut config = Config::default();
        assert!(apply_overrides(&mut config, &cli).is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, "warn"), "warn");
        assert_eq!(log_level(1, "warn"), "debug");
        assert_eq!(log_level(5, "warn"), "trace");
    }
}
