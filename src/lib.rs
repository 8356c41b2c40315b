//! # sweepscan - swing-structure setup scanner
//!
//! Detects two swing-based chart setups on OHLCV candle sequences:
//!
//! - **Setup 1** (base retest): rally-base-rally / drop-base-drop. A swing point
//!   protrudes from a base, a single wick retests the base, and price then
//!   breaks the swing point.
//! - **Setup 2** (liquidity sweep): four alternating swing points where the last
//!   one sweeps the previous same-side swing by exactly one bar, followed by a
//!   close through the starting swing.
//!
//! ## Quick Start
//!
//! ```rust
//! use sweepscan::prelude::*;
//!
//! let candles: Vec<Candle> = (0..100)
//!     .map(|i| {
//!         let p = 100.0 + i as f64;
//!         Candle::new(i * 60_000, i * 60_000 + 59_999, p, p + 1.0, p - 1.0, p + 0.5, 10.0)
//!     })
//!     .collect();
//!
//! let detector = BuiltinDetector::for_setup(SetupId::BaseRetest);
//! let signals = detector.detect(&candles, "BTCUSDT", "1h");
//! assert!(signals.is_empty());
//! ```

pub mod config;
pub mod detectors;
pub mod notify;
pub mod params;
pub mod scan;
pub mod source;

pub mod prelude {
    pub use crate::{
        // Configuration
        config::{Combination, ScanConfig},
        // Detectors
        detectors::*,
        // Notification
        notify::{format_message, LogNotifier, NotifyError, Notifier},
        // Parameters
        params::{get_period, ParamMeta, ParameterizedDetector},
        // Driver
        scan::{filter_recent, is_recent, ComboOutcome, RunReport, ScanError, ScanSuccess, Scanner},
        // Parallel
        scan_parallel,
        // Engine
        BuiltinDetector,
        // Types
        Candle,
        Direction,
        // Errors
        PatternError,
        Period,
        Result,
        // Core traits
        SetupDetector,
        SetupId,
        SeriesScan,
        Signal,
        SignalInfo,
        // Sources
        source::{CandleSource, FnSource, MemorySource, SourceError},
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors raised while configuring detectors or the scan driver
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Bar count (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAIT & CANDLE
// ============================================================

/// Core OHLCV data trait.
///
/// Sequences are expected in chronological order (index 0 = oldest) with
/// `low <= min(open, close)` and `high >= max(open, close)`. Detectors assume
/// this and do not validate it.
pub trait OHLCV {
    /// Open time, milliseconds since the Unix epoch
    fn open_time(&self) -> i64;
    /// Close time, milliseconds since the Unix epoch
    fn close_time(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Immutable candle record
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub const fn new(
        open_time: i64,
        close_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            open_time,
            close_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Candle {
    #[inline]
    fn open_time(&self) -> i64 {
        self.open_time
    }

    #[inline]
    fn close_time(&self) -> i64 {
        self.close_time
    }

    #[inline]
    fn open(&self) -> f64 {
        self.open
    }

    #[inline]
    fn high(&self) -> f64 {
        self.high
    }

    #[inline]
    fn low(&self) -> f64 {
        self.low
    }

    #[inline]
    fn close(&self) -> f64 {
        self.close
    }

    #[inline]
    fn volume(&self) -> f64 {
        self.volume
    }
}

// ============================================================
// SIGNAL - result of detection
// ============================================================

/// Identifier of a setup family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SetupId {
    /// Setup 1: rally-base-rally / drop-base-drop with a single wick retest
    BaseRetest,
    /// Setup 2: four-point liquidity sweep reversal
    Sweep,
}

impl SetupId {
    /// Numeric label used in alerts ("Setup 1", "Setup 2")
    #[inline]
    pub fn number(self) -> u8 {
        match self {
            SetupId::BaseRetest => 1,
            SetupId::Sweep => 2,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            SetupId::BaseRetest => "BASE_RETEST",
            SetupId::Sweep => "SWEEP",
        }
    }
}

impl std::fmt::Display for SetupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Direction of a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Bullish,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Setup-specific anchor points of a signal
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalInfo {
    BaseRetest {
        /// Swing high (bullish) or swing low (bearish) the pattern is built on
        swing_index: usize,
        wick_index: usize,
        base_start: usize,
        base_end: usize,
        /// Base low for bullish signals, base high for bearish ones
        base_level: f64,
    },
    Sweep {
        start_index: usize,
        swing1_index: usize,
        swing2_index: usize,
        sweep_index: usize,
    },
}

/// A confirmed setup at a trigger candle
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Signal {
    pub setup: SetupId,
    pub direction: Direction,
    pub symbol: String,
    pub timeframe: String,
    pub trigger_index: usize,
    /// Close time of the trigger candle
    pub trigger_time: i64,
    pub info: SignalInfo,
}

// ============================================================
// SETUP DETECTOR TRAIT
// ============================================================

/// Whole-sequence setup detector.
///
/// Implementations are pure: the same candles and labels always produce the
/// same signals, in the same order.
pub trait SetupDetector: Send + Sync {
    fn id(&self) -> SetupId;

    /// Shortest sequence on which the detector can emit anything
    fn min_bars(&self) -> usize;

    fn detect<T: OHLCV>(&self, bars: &[T], symbol: &str, timeframe: &str) -> Vec<Signal>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch over [`SetupDetector`]
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], symbol: &str, timeframe: &str) -> Vec<Signal> {
                match self {
                    $(Self::$variant(d) => SetupDetector::detect(d, bars, symbol, timeframe)),*
                }
            }

            #[inline]
            pub fn id(&self) -> SetupId {
                match self {
                    $(Self::$variant(d) => SetupDetector::id(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => SetupDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => SetupDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    BaseRetest(BaseRetestDetector),
    Sweep(SweepDetector),
}

impl BuiltinDetector {
    /// Detector for a setup with default parameters
    pub fn for_setup(setup: SetupId) -> Self {
        match setup {
            SetupId::BaseRetest => Self::BaseRetest(BaseRetestDetector::with_defaults()),
            SetupId::Sweep => Self::Sweep(SweepDetector::with_defaults()),
        }
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Signals found on one symbol/timeframe series
#[derive(Debug, Clone)]
pub struct SeriesScan {
    pub symbol: String,
    pub timeframe: String,
    pub signals: Vec<Signal>,
}

/// Parallel detection over many already-loaded series.
///
/// Output order follows input order.
pub fn scan_parallel<'a, T, I>(detector: &BuiltinDetector, series: I) -> Vec<SeriesScan>
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a str, &'a [T])>,
{
    series
        .into_par_iter()
        .map(|(symbol, timeframe, bars)| SeriesScan {
            symbol: symbol.to_string(),
            timeframe: timeframe.to_string(),
            signals: detector.detect(bars, symbol, timeframe),
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn make_uptrend(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                let t = i as i64 * 60_000;
                Candle::new(t, t + 59_999, base, base + 1.0, base - 1.0, base + 0.5, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_period_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Period>("0").is_err());
        assert_eq!(serde_json::from_str::<Period>("7").unwrap().get(), 7);
    }

    #[test]
    fn test_setup_id_labels() {
        assert_eq!(SetupId::BaseRetest.to_string(), "1");
        assert_eq!(SetupId::Sweep.to_string(), "2");
        assert_eq!(SetupId::Sweep.as_str(), "SWEEP");
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Bullish.to_string(), "bullish");
        assert!(Direction::Bearish.is_bearish());
        assert!(!Direction::Bearish.is_bullish());
    }

    #[test]
    fn test_signal_serializes_info_tag() {
        let signal = Signal {
            setup: SetupId::Sweep,
            direction: Direction::Bearish,
            symbol: "BTCUSDT".into(),
            timeframe: "1h".into(),
            trigger_index: 9,
            trigger_time: 1_000,
            info: SignalInfo::Sweep {
                start_index: 1,
                swing1_index: 3,
                swing2_index: 5,
                sweep_index: 7,
            },
        };
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["direction"], "bearish");
        assert_eq!(json["info"]["kind"], "sweep");
        assert_eq!(json["info"]["sweep_index"], 7);
    }

    #[test]
    fn test_builtin_dispatch() {
        let d = BuiltinDetector::for_setup(SetupId::BaseRetest);
        assert_eq!(d.id(), SetupId::BaseRetest);
        assert!(d.validate_config().is_ok());

        let d = BuiltinDetector::for_setup(SetupId::Sweep);
        assert_eq!(d.id(), SetupId::Sweep);
        assert_eq!(d.min_bars(), 6);
    }

    #[test]
    fn test_empty_scan() {
        let bars: Vec<Candle> = vec![];
        for setup in [SetupId::BaseRetest, SetupId::Sweep] {
            let signals = BuiltinDetector::for_setup(setup).detect(&bars, "X", "1m");
            assert!(signals.is_empty());
        }
    }

    #[test]
    fn test_parallel_scan() {
        let detector = BuiltinDetector::for_setup(SetupId::Sweep);

        let bars1 = make_uptrend(50);
        let bars2 = make_uptrend(80);

        let series: Vec<(&str, &str, &[Candle])> =
            vec![("BTCUSDT", "1h", &bars1), ("ETHUSDT", "4h", &bars2)];

        let results = scan_parallel(&detector, series);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol, "BTCUSDT");
        assert_eq!(results[1].timeframe, "4h");
        assert!(results.iter().all(|r| r.signals.is_empty()));
    }
}
