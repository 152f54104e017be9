// # cloudcdn-rangesd - Cloud CDN range daemon
//
// A thin integration layer over cloudcdn-ranges-core. All fetch, parse and
// scheduling logic lives in the core crate.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Starting the refresher with the hickory resolver
// 4. Tying the refresher to SIGTERM/SIGINT
//
// ## Configuration
//
// - `CLOUDCDN_INTERVAL`: Refresh interval, e.g. `12h`, `90m`, `1d` (default: 24h)
// - `CLOUDCDN_HOSTNAME`: TXT record to query (default: `_cloud-eoips.googleusercontent.com`)
// - `CLOUDCDN_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export CLOUDCDN_INTERVAL=12h
// export CLOUDCDN_LOG_LEVEL=debug
//
// cloudcdn-rangesd
// ```

use anyhow::Result;
use cloudcdn_ranges_core::{RangeRefresher, RefresherConfig, SOURCE_ID, parse_duration};
use cloudcdn_ranges_hickory::HickoryTxtResolver;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long to wait for the refresh task after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    refresher: RefresherConfig,
    log_level: Level,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut refresher = RefresherConfig::new();

        if let Some(interval) = lookup("CLOUDCDN_INTERVAL") {
            refresher.interval = parse_duration(&interval).map_err(|e| {
                anyhow::anyhow!("CLOUDCDN_INTERVAL: {}. Example: CLOUDCDN_INTERVAL=12h", e)
            })?;
        }

        if let Some(hostname) = lookup("CLOUDCDN_HOSTNAME") {
            refresher.hostname = hostname;
        }

        refresher
            .validate()
            .map_err(|e| anyhow::anyhow!("CLOUDCDN_HOSTNAME: {}", e))?;

        let log_level = match lookup("CLOUDCDN_LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            other => anyhow::bail!(
                "CLOUDCDN_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        };

        Ok(Self {
            refresher,
            log_level,
        })
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    info!("Starting cloudcdn-rangesd ({})", SOURCE_ID);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let shutdown = CancellationToken::new();

    let resolver = Arc::new(HickoryTxtResolver::from_system_conf());
    let refresher = RangeRefresher::new(resolver, config.refresher)?.with_cancellation(&shutdown);

    refresher.start().await?;

    let ranges = refresher.ranges();
    if ranges.is_empty() {
        warn!(
            "No ranges loaded from {}; retrying in {:?}",
            refresher.hostname(),
            refresher.interval()
        );
    } else {
        info!("Loaded {} range(s) from {}", ranges.len(), refresher.hostname());
        for prefix in ranges.iter() {
            info!("Trusted range: {}", prefix);
        }
    }

    info!("Ready");

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);

    shutdown.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, refresher.wait())
        .await
        .is_err()
    {
        anyhow::bail!("Refresh task did not exit within {:?}", SHUTDOWN_GRACE);
    }

    info!("Shut down cleanly");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
