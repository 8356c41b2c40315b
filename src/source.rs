//! Candle sources
//!
//! [`CandleSource`] is the contract the scan driver fetches through. The crate
//! ships an in-memory source for replay and tests, and a Binance spot REST
//! source behind the `http` feature.

use std::collections::HashMap;

use serde_json::Value;

use crate::Candle;

/// Errors from fetching or decoding candles
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode klines: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Malformed kline row {index}: {reason}")]
    MalformedRow { index: usize, reason: &'static str },

    #[error("No candles for {symbol} {timeframe}")]
    UnknownSeries { symbol: String, timeframe: String },
}

/// Provider of the `limit` most recent candles of a series, oldest first.
pub trait CandleSource: Send + Sync {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Candle>, SourceError>;
}

// ============================================================
// IN-MEMORY SOURCE
// ============================================================

/// Pre-loaded series keyed by (symbol, timeframe)
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    series: HashMap<(String, String), Vec<Candle>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a series
    pub fn with_series(
        mut self,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        candles: Vec<Candle>,
    ) -> Self {
        self.insert(symbol, timeframe, candles);
        self
    }

    pub fn insert(
        &mut self,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        candles: Vec<Candle>,
    ) {
        self.series.insert((symbol.into(), timeframe.into()), candles);
    }
}

impl CandleSource for MemorySource {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Candle>, SourceError> {
        let candles = self
            .series
            .get(&(symbol.to_string(), timeframe.to_string()))
            .ok_or_else(|| SourceError::UnknownSeries {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            })?;
        let start = candles.len().saturating_sub(limit);
        Ok(candles[start..].to_vec())
    }
}

/// Adapts a closure into a [`CandleSource`]
pub struct FnSource<F>(pub F);

impl<F> CandleSource for FnSource<F>
where
    F: Fn(&str, &str, usize) -> std::result::Result<Vec<Candle>, SourceError> + Send + Sync,
{
    fn fetch(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> std::result::Result<Vec<Candle>, SourceError> {
        (self.0)(symbol, timeframe, limit)
    }
}

// ============================================================
// BINANCE KLINE DECODING
// ============================================================

fn as_millis(value: &Value) -> Option<i64> {
    value.as_i64()
}

fn as_price(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        other => other.as_f64(),
    }
}

/// Decode one Binance kline row:
/// `[open_time, open, high, low, close, volume, close_time, ...]`.
pub fn parse_kline(index: usize, row: &[Value]) -> std::result::Result<Candle, SourceError> {
    let malformed = |reason| SourceError::MalformedRow { index, reason };

    if row.len() < 7 {
        return Err(malformed("fewer than 7 fields"));
    }
    let open_time = as_millis(&row[0]).ok_or_else(|| malformed("open time"))?;
    let open = as_price(&row[1]).ok_or_else(|| malformed("open"))?;
    let high = as_price(&row[2]).ok_or_else(|| malformed("high"))?;
    let low = as_price(&row[3]).ok_or_else(|| malformed("low"))?;
    let close = as_price(&row[4]).ok_or_else(|| malformed("close"))?;
    let volume = as_price(&row[5]).ok_or_else(|| malformed("volume"))?;
    let close_time = as_millis(&row[6]).ok_or_else(|| malformed("close time"))?;

    Ok(Candle {
        open_time,
        close_time,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// Decode a full `/api/v3/klines` payload
pub fn parse_klines(rows: &[Vec<Value>]) -> std::result::Result<Vec<Candle>, SourceError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| parse_kline(i, row))
        .collect()
}

// ============================================================
// BINANCE REST SOURCE
// ============================================================

#[cfg(feature = "http")]
pub use binance::BinanceSource;

#[cfg(feature = "http")]
mod binance {
    use std::time::Duration;

    use serde_json::Value;
    use tracing::debug;

    use super::{parse_klines, CandleSource, SourceError};
    use crate::Candle;

    pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

    /// Binance spot klines over blocking HTTP
    #[derive(Debug, Clone)]
    pub struct BinanceSource {
        client: reqwest::blocking::Client,
        base_url: String,
    }

    impl BinanceSource {
        pub fn new() -> std::result::Result<Self, SourceError> {
            Self::with_base_url(DEFAULT_BASE_URL)
        }

        pub fn with_base_url(base_url: impl Into<String>) -> std::result::Result<Self, SourceError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent(concat!("sweepscan/", env!("CARGO_PKG_VERSION")))
                .build()?;
            Ok(Self {
                client,
                base_url: base_url.into(),
            })
        }
    }

    impl CandleSource for BinanceSource {
        fn fetch(
            &self,
            symbol: &str,
            timeframe: &str,
            limit: usize,
        ) -> std::result::Result<Vec<Candle>, SourceError> {
            let url = format!("{}/api/v3/klines", self.base_url);
            let limit = limit.to_string();
            let body = self
                .client
                .get(&url)
                .query(&[("symbol", symbol), ("interval", timeframe), ("limit", limit.as_str())])
                .send()?
                .error_for_status()?
                .text()?;
            let rows: Vec<Vec<Value>> = serde_json::from_str(&body)?;

            debug!(symbol, timeframe, rows = rows.len(), "fetched klines");
            parse_klines(&rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candle(i: i64) -> Candle {
        Candle::new(i, i + 1, 1.0, 2.0, 0.5, 1.5, 10.0)
    }

    #[test]
    fn test_memory_source_returns_most_recent() {
        let source = MemorySource::new().with_series("BTCUSDT", "1h", (0..10).map(candle).collect());

        let got = source.fetch("BTCUSDT", "1h", 3).unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].open_time, 7);
        assert_eq!(got[2].open_time, 9);

        let all = source.fetch("BTCUSDT", "1h", 500).unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_memory_source_unknown_series() {
        let source = MemorySource::new();
        let err = source.fetch("BTCUSDT", "1h", 10).unwrap_err();
        assert!(matches!(err, SourceError::UnknownSeries { .. }));
        assert_eq!(err.to_string(), "No candles for BTCUSDT 1h");
    }

    #[test]
    fn test_fn_source() {
        let source = FnSource(|symbol: &str, _tf: &str, limit: usize| {
            if symbol == "BTCUSDT" {
                Ok((0..limit as i64).map(candle).collect())
            } else {
                Err(SourceError::UnknownSeries {
                    symbol: symbol.to_string(),
                    timeframe: "1h".to_string(),
                })
            }
        });
        assert_eq!(source.fetch("BTCUSDT", "1h", 4).unwrap().len(), 4);
        assert!(source.fetch("ETHUSDT", "1h", 4).is_err());
    }

    #[test]
    fn test_parse_klines() {
        let payload = json!([
            [1_700_000_000_000_i64, "100.5", "101.0", "99.0", "100.0", "12.3", 1_700_000_059_999_i64, "0", 10, "0", "0", "0"],
            [1_700_000_060_000_i64, "100.0", "102.0", "99.5", "101.5", "8.0", 1_700_000_119_999_i64, "0", 10, "0", "0", "0"]
        ]);
        let rows: Vec<Vec<Value>> = serde_json::from_value(payload).unwrap();

        let candles = parse_klines(&rows).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_700_000_000_000);
        assert_eq!(candles[0].close_time, 1_700_000_059_999);
        assert_eq!(candles[1].high, 102.0);
        assert_eq!(candles[1].volume, 8.0);
    }

    #[test]
    fn test_decode_error() {
        let err: SourceError = serde_json::from_str::<Vec<Vec<Value>>>("{\"code\":-1121}")
            .unwrap_err()
            .into();
        assert!(err.to_string().starts_with("Failed to decode klines"));
    }

    #[test]
    fn test_parse_kline_malformed() {
        let short: Vec<Value> = vec![json!(1), json!("1.0")];
        assert!(matches!(
            parse_kline(3, &short),
            Err(SourceError::MalformedRow { index: 3, .. })
        ));

        let bad_price: Vec<Value> =
            vec![json!(1), json!("x"), json!("1"), json!("1"), json!("1"), json!("1"), json!(2)];
        match parse_kline(0, &bad_price) {
            Err(SourceError::MalformedRow { reason, .. }) => assert_eq!(reason, "open"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
