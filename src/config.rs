//! Scan driver configuration
//!
//! Every field has a default, so a JSON file only needs the keys it changes:
//!
//! ```rust
//! use sweepscan::config::ScanConfig;
//!
//! let config = ScanConfig::from_json_str(r#"{ "symbols": ["SOLUSDT"] }"#).unwrap();
//! assert_eq!(config.symbols, vec!["SOLUSDT".to_string()]);
//! assert_eq!(config.candle_limit, 500);
//! ```

use std::{collections::BTreeMap, fmt, path::Path};

use crate::{BaseRetestDetector, PatternError, Result, SetupDetector, SetupId};

/// One (symbol, timeframe, setup) unit of work
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination {
    pub symbol: String,
    pub timeframe: String,
    pub setup: SetupId,
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setup {} {} {}", self.setup, self.symbol, self.timeframe)
    }
}

/// Driver settings: what to scan and how recent an alert must be
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub symbols: Vec<String>,
    /// Timeframes scanned for Setup 1
    pub setup1_timeframes: Vec<String>,
    /// Timeframes scanned for Setup 2
    pub setup2_timeframes: Vec<String>,
    /// Recency window in bars, per timeframe
    pub recent_bars: BTreeMap<String, usize>,
    /// Recency window for timeframes missing from `recent_bars`
    pub default_recent_bars: usize,
    /// Candles requested per fetch
    pub candle_limit: usize,
    /// Series shorter than this are skipped
    pub min_candles: usize,
    pub base_retest: BaseRetestDetector,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        // windows sized for an hourly run
        let recent_bars = [
            ("1m", 60),
            ("3m", 20),
            ("15m", 8),
            ("1h", 3),
            ("4h", 2),
            ("1d", 2),
            ("1w", 2),
        ]
        .into_iter()
        .map(|(tf, bars)| (tf.to_string(), bars))
        .collect();

        Self {
            symbols: strings(&["BTCUSDT", "ETHUSDT"]),
            setup1_timeframes: strings(&["1m", "3m", "1d", "1w"]),
            setup2_timeframes: strings(&["15m", "1h", "4h"]),
            recent_bars,
            default_recent_bars: 5,
            candle_limit: 500,
            min_candles: 50,
            base_retest: BaseRetestDetector::default(),
        }
    }
}

impl ScanConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PatternError::InvalidConfig(format!("config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| PatternError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.candle_limit == 0 {
            return Err(PatternError::InvalidConfig("candle_limit must be > 0".into()));
        }
        if self.default_recent_bars == 0 {
            return Err(PatternError::InvalidConfig(
                "default_recent_bars must be > 0".into(),
            ));
        }
        if let Some((tf, _)) = self.recent_bars.iter().find(|(_, &bars)| bars == 0) {
            return Err(PatternError::InvalidConfig(format!(
                "recent_bars for {tf} must be > 0"
            )));
        }
        self.base_retest.validate_config()
    }

    /// Recency window for `timeframe`, in bars
    pub fn recency_window(&self, timeframe: &str) -> usize {
        self.recent_bars
            .get(timeframe)
            .copied()
            .unwrap_or(self.default_recent_bars)
    }

    /// All Setup 1 combinations, then all Setup 2 combinations, each
    /// symbol-major.
    pub fn combinations(&self) -> Vec<Combination> {
        let per_setup = [
            (SetupId::BaseRetest, &self.setup1_timeframes),
            (SetupId::Sweep, &self.setup2_timeframes),
        ];

        per_setup
            .into_iter()
            .flat_map(|(setup, timeframes)| {
                self.symbols.iter().flat_map(move |symbol| {
                    timeframes.iter().map(move |timeframe| Combination {
                        symbol: symbol.clone(),
                        timeframe: timeframe.clone(),
                        setup,
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recency_window("1m"), 60);
        assert_eq!(config.recency_window("4h"), 2);
        assert_eq!(config.recency_window("5m"), 5);
        assert_eq!(config.combinations().len(), 2 * 4 + 2 * 3);
    }

    #[test]
    fn test_combination_order() {
        let config = ScanConfig {
            symbols: strings(&["A", "B"]),
            setup1_timeframes: strings(&["1m"]),
            setup2_timeframes: strings(&["1h", "4h"]),
            ..ScanConfig::default()
        };
        let labels: Vec<String> = config.combinations().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "Setup 1 A 1m",
                "Setup 1 B 1m",
                "Setup 2 A 1h",
                "Setup 2 A 4h",
                "Setup 2 B 1h",
                "Setup 2 B 4h",
            ]
        );
    }

    #[test]
    fn test_partial_json() {
        let config = ScanConfig::from_json_str(
            r#"{ "min_candles": 10, "recent_bars": { "1h": 6 }, "base_retest": { "wick_lookahead": 4 } }"#,
        )
        .unwrap();
        assert_eq!(config.min_candles, 10);
        assert_eq!(config.recency_window("1h"), 6);
        assert_eq!(config.recency_window("1m"), 5);
        assert_eq!(config.base_retest.wick_lookahead.get(), 4);
        assert_eq!(config.base_retest.base_lookback_max.get(), 10);
        assert_eq!(config.symbols, strings(&["BTCUSDT", "ETHUSDT"]));
    }

    #[test]
    fn test_invalid_json() {
        assert!(ScanConfig::from_json_str("{ not json").is_err());
        assert!(ScanConfig::from_json_str(r#"{ "candle_limit": 0 }"#).is_err());
        assert!(ScanConfig::from_json_str(r#"{ "recent_bars": { "1h": 0 } }"#).is_err());
        assert!(ScanConfig::from_json_str(r#"{ "base_retest": { "wick_lookahead": 0 } }"#).is_err());
        assert!(
            ScanConfig::from_json_str(r#"{ "base_retest": { "base_lookback_min": 12 } }"#).is_err()
        );
    }

    #[test]
    fn test_base_retest_windows_range_checked() {
        assert!(ScanConfig::from_json_str(r#"{ "base_retest": { "wick_lookahead": 31 } }"#).is_err());
        assert!(ScanConfig::from_json_str(
            r#"{ "base_retest": { "wick_lookahead": 18446744073709551615 } }"#
        )
        .is_err());
        assert!(ScanConfig::from_json_str(
            r#"{ "base_retest": { "continuation_lookahead": 1000000 } }"#
        )
        .is_err());
        assert!(ScanConfig::from_json_str(r#"{ "base_retest": { "wick_lookahead": 30 } }"#).is_ok());
    }

    #[test]
    fn test_missing_file() {
        assert!(ScanConfig::from_file("/nonexistent/sweepscan.json").is_err());
    }
}
