//! Application initialization
//! Handles config loading, logging setup, and fixer construction

use anyhow::Result;
use profit_fixer::config::{Config, LogFormat};
use profit_fixer::history::FileTradeHistory;
use profit_fixer::ProfitFixer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_log_level(log_level).to_string()));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init(),
    }
}

/// Parse log level string
pub fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Load and validate config from `path`, or from the default locations.
/// Returns the file that was read so it can be logged once logging is up.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = match path {
        Some(path) => path,
        None => Config::locate()?,
    };
    let config = Config::from_file(&path)?;
    config.validate()?;
    Ok((config, path))
}

/// Build a fixer with one file-backed session per configured session
pub fn init_fixer(config: &Config) -> ProfitFixer {
    let mut fixer = ProfitFixer::with_batch_config(config.market.clone(), config.batch.clone());

    for session in &config.sessions {
        let source = FileTradeHistory::new(&session.trades_file);
        info!(
            "Registering session {} from {}",
            session.name,
            source.path().display()
        );
        fixer.add_exchange(&session.name, Arc::new(source));
    }

    if fixer.sessions().is_empty() {
        warn!("No sessions configured, the run will not replay any trade");
    }
    fixer
}

/// Token cancelled on Ctrl-C or after the configured timeout
pub fn init_cancellation(timeout_secs: Option<u64>) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling reconciliation");
            on_signal.cancel();
        }
    });

    if let Some(secs) = timeout_secs {
        let on_timeout = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = on_timeout.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    warn!("Timed out after {}s, cancelling reconciliation", secs);
                    on_timeout.cancel();
                }
            }
        });
    }

    token
}
