//! One scan pass over Binance spot data, alerting to Telegram.
//!
//! ```text
//! sweepscan [config.json]
//! ```
//!
//! Credentials come from `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID`. Without
//! them alerts are written to the log.

use std::process::ExitCode;

use sweepscan::{
    config::ScanConfig,
    notify::{LogNotifier, Notifier, NotifyError, TelegramConfig, TelegramNotifier},
    scan::Scanner,
    source::BinanceSource,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Either configured alert channel
enum Alerts {
    Telegram(TelegramNotifier),
    Log(LogNotifier),
}

impl Notifier for Alerts {
    fn notify(&self, text: &str) -> Result<(), NotifyError> {
        match self {
            Alerts::Telegram(n) => n.notify(text),
            Alerts::Log(n) => n.notify(text),
        }
    }
}

fn alerts() -> Result<Alerts, NotifyError> {
    match TelegramConfig::from_env() {
        Some(config) => {
            info!(chat_id = %config.chat_id, "alerting to telegram");
            Ok(Alerts::Telegram(TelegramNotifier::new(config)?))
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, alerts go to the log");
            Ok(Alerts::Log(LogNotifier))
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(%path, "loading config");
            ScanConfig::from_file(path)?
        }
        None => ScanConfig::default(),
    };

    let scanner = Scanner::new(config, BinanceSource::new()?, alerts()?)?;
    let report = scanner.run();

    for failure in &report.failed {
        warn!(%failure, "combination failed");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "scan aborted");
            ExitCode::FAILURE
        }
    }
}
