//! Alert delivery
//!
//! [`Notifier`] is best-effort: the scan driver logs failures and moves on.
//! [`LogNotifier`] writes alerts to the `tracing` output; `TelegramNotifier`
//! (feature `http`) posts them to a chat.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{Signal, OHLCV};

/// Errors from delivering an alert
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Channel rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Sink for formatted alert text
pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str) -> std::result::Result<(), NotifyError>;
}

/// Writes alerts to the log instead of an external channel
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, text: &str) -> std::result::Result<(), NotifyError> {
        info!(target: "sweepscan::alert", "\n{text}");
        Ok(())
    }
}

// ============================================================
// FORMATTING
// ============================================================

/// Render a millisecond Unix timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
///
/// Out-of-range timestamps fall back to the raw millisecond value.
pub fn format_time(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{millis} ms"),
    }
}

/// Alert text for `signal`, reading the trigger close from `bars`.
pub fn format_message<T: OHLCV>(signal: &Signal, bars: &[T]) -> String {
    let price = bars
        .get(signal.trigger_index)
        .map(|b| format!("{:.2}", b.close()))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "Setup {} {} signal\n\
         Symbol: {}\n\
         Timeframe: {}\n\
         Trigger close time: {}\n\
         Trigger price (close): {}\n",
        signal.setup,
        signal.direction.as_str().to_uppercase(),
        signal.symbol,
        signal.timeframe,
        format_time(signal.trigger_time),
        price,
    )
}

// ============================================================
// TELEGRAM
// ============================================================

#[cfg(feature = "http")]
pub use telegram::{TelegramConfig, TelegramNotifier};

#[cfg(feature = "http")]
mod telegram {
    use std::time::Duration;

    use tracing::debug;

    use super::{NotifyError, Notifier};

    pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

    /// Telegram bot credentials
    #[derive(Clone)]
    pub struct TelegramConfig {
        pub bot_token: String,
        pub chat_id: String,
    }

    impl TelegramConfig {
        pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
            Self {
                bot_token: bot_token.into(),
                chat_id: chat_id.into(),
            }
        }

        /// Read `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`; `None` if either is
        /// missing or empty.
        pub fn from_env() -> Option<Self> {
            let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty())?;
            let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.is_empty())?;
            Some(Self { bot_token, chat_id })
        }
    }

    impl std::fmt::Debug for TelegramConfig {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TelegramConfig")
                .field("bot_token", &"<redacted>")
                .field("chat_id", &self.chat_id)
                .finish()
        }
    }

    /// Sends alerts through the Bot API `sendMessage` method
    #[derive(Debug)]
    pub struct TelegramNotifier {
        config: TelegramConfig,
        client: reqwest::blocking::Client,
        api_url: String,
    }

    impl TelegramNotifier {
        pub fn new(config: TelegramConfig) -> std::result::Result<Self, NotifyError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?;
            Ok(Self {
                config,
                client,
                api_url: DEFAULT_API_URL.to_string(),
            })
        }
    }

    impl Notifier for TelegramNotifier {
        fn notify(&self, text: &str) -> std::result::Result<(), NotifyError> {
            let url = format!("{}/bot{}/sendMessage", self.api_url, self.config.bot_token);
            let response = self
                .client
                .post(&url)
                .form(&[("chat_id", self.config.chat_id.as_str()), ("text", text)])
                .send()?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    body,
                });
            }
            debug!(chat_id = %self.config.chat_id, "telegram message sent");
            Ok(())
        }
    }
}
