//! Scan driver
//!
//! Runs every configured (symbol, timeframe, setup) combination: fetch
//! candles, detect, keep recent signals, notify. A combination that fails to
//! fetch is reported and the run continues with the next one.
//!
//! ```rust
//! use sweepscan::prelude::*;
//!
//! let config = ScanConfig {
//!     symbols: vec!["BTCUSDT".into()],
//!     setup1_timeframes: vec![],
//!     setup2_timeframes: vec!["1h".into()],
//!     ..ScanConfig::default()
//! };
//! let scanner = Scanner::new(config, MemorySource::new(), LogNotifier).unwrap();
//!
//! let report = scanner.run();
//! assert_eq!(report.failed.len(), 1);
//! ```

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    config::{Combination, ScanConfig},
    notify::{format_message, Notifier},
    source::{CandleSource, SourceError},
    BuiltinDetector, Candle, Result, SetupId, Signal, SweepDetector,
};

// ============================================================
// RECENCY FILTER
// ============================================================

/// Whether a signal at `trigger_index` falls inside the last `window` bars of
/// a sequence ending at `last_index`.
#[inline]
pub fn is_recent(trigger_index: usize, last_index: usize, window: usize) -> bool {
    trigger_index <= last_index && last_index - trigger_index < window
}

/// Keep the signals that pass [`is_recent`], in their original order.
pub fn filter_recent(signals: Vec<Signal>, last_index: usize, window: usize) -> Vec<Signal> {
    signals
        .into_iter()
        .filter(|s| is_recent(s.trigger_index, last_index, window))
        .collect()
}

// ============================================================
// OUTCOMES
// ============================================================

/// What happened to a combination that fetched successfully
#[derive(Debug, Clone, PartialEq)]
pub enum ComboOutcome {
    /// Too few candles to scan
    Skipped { candles: usize },
    Scanned {
        candles: usize,
        /// Signals found over the whole sequence
        signals: usize,
        /// Signals inside the recency window; one alert each
        recent: Vec<Signal>,
        alerts_sent: usize,
        notify_failures: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanSuccess {
    pub combination: Combination,
    pub outcome: ComboOutcome,
}

/// A combination whose candles could not be fetched
#[derive(Debug, thiserror::Error)]
#[error("{combination}: {error}")]
pub struct ScanError {
    pub combination: Combination,
    #[source]
    pub error: SourceError,
}

/// Per-combination results of one run, in combination order
#[derive(Debug, Default)]
pub struct RunReport {
    pub completed: Vec<ScanSuccess>,
    pub failed: Vec<ScanError>,
}

impl RunReport {
    fn from_results(results: Vec<std::result::Result<ScanSuccess, ScanError>>) -> Self {
        let mut report = Self::default();
        for result in results {
            match result {
                Ok(success) => report.completed.push(success),
                Err(error) => report.failed.push(error),
            }
        }
        report
    }

    fn scanned(&self) -> impl Iterator<Item = (&Combination, &ComboOutcome)> {
        self.completed
            .iter()
            .filter(|s| matches!(s.outcome, ComboOutcome::Scanned { .. }))
            .map(|s| (&s.combination, &s.outcome))
    }

    pub fn skipped(&self) -> usize {
        self.completed.len() - self.scanned().count()
    }

    /// Recent signals across all combinations
    pub fn signals(&self) -> Vec<&Signal> {
        let mut out = Vec::new();
        for (_, outcome) in self.scanned() {
            if let ComboOutcome::Scanned { recent, .. } = outcome {
                out.extend(recent);
            }
        }
        out
    }

    pub fn alerts_sent(&self) -> usize {
        self.scanned()
            .map(|(_, outcome)| match outcome {
                ComboOutcome::Scanned { alerts_sent, .. } => *alerts_sent,
                ComboOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn notify_failures(&self) -> usize {
        self.scanned()
            .map(|(_, outcome)| match outcome {
                ComboOutcome::Scanned { notify_failures, .. } => *notify_failures,
                ComboOutcome::Skipped { .. } => 0,
            })
            .sum()
    }
}

// ============================================================
// SCANNER
// ============================================================

/// Drives detection over a [`CandleSource`] and alerts through a [`Notifier`]
pub struct Scanner<S, N> {
    config: ScanConfig,
    source: S,
    notifier: N,
    base_retest: BuiltinDetector,
    sweep: BuiltinDetector,
}

impl<S: CandleSource, N: Notifier> Scanner<S, N> {
    pub fn new(config: ScanConfig, source: S, notifier: N) -> Result<Self> {
        config.validate()?;
        let base_retest = BuiltinDetector::BaseRetest(config.base_retest.clone());
        Ok(Self {
            config,
            source,
            notifier,
            base_retest,
            sweep: BuiltinDetector::Sweep(SweepDetector),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn detector(&self, setup: SetupId) -> &BuiltinDetector {
        match setup {
            SetupId::BaseRetest => &self.base_retest,
            SetupId::Sweep => &self.sweep,
        }
    }

    /// Fetch, detect, filter and notify for one combination
    pub fn run_combination(
        &self,
        combination: &Combination,
    ) -> std::result::Result<ScanSuccess, ScanError> {
        let Combination { symbol, timeframe, setup } = combination;

        let candles: Vec<Candle> = self
            .source
            .fetch(symbol, timeframe, self.config.candle_limit)
            .map_err(|error| {
                warn!(%combination, %error, "fetch failed");
                ScanError {
                    combination: combination.clone(),
                    error,
                }
            })?;

        let n = candles.len();
        if n < self.config.min_candles.max(1) {
            debug!(%combination, candles = n, "not enough candles, skipping");
            return Ok(ScanSuccess {
                combination: combination.clone(),
                outcome: ComboOutcome::Skipped { candles: n },
            });
        }

        let signals = self.detector(*setup).detect(&candles, symbol, timeframe);
        let found = signals.len();
        let window = self.config.recency_window(timeframe);
        let recent = filter_recent(signals, n - 1, window);
        debug!(%combination, candles = n, found, recent = recent.len(), window, "scanned");

        let mut alerts_sent = 0;
        let mut notify_failures = 0;
        for signal in &recent {
            let text = format_message(signal, &candles);
            match self.notifier.notify(&text) {
                Ok(()) => alerts_sent += 1,
                Err(error) => {
                    warn!(%combination, trigger_index = signal.trigger_index, %error, "notify failed");
                    notify_failures += 1;
                }
            }
        }

        Ok(ScanSuccess {
            combination: combination.clone(),
            outcome: ComboOutcome::Scanned {
                candles: n,
                signals: found,
                recent,
                alerts_sent,
                notify_failures,
            },
        })
    }

    /// Run every combination in order on the calling thread
    pub fn run(&self) -> RunReport {
        let results = self
            .config
            .combinations()
            .iter()
            .map(|c| self.run_combination(c))
            .collect();
        let report = RunReport::from_results(results);
        log_summary(&report);
        report
    }

    /// Run combinations on the rayon pool; report order matches [`Self::run`]
    pub fn run_parallel(&self) -> RunReport {
        let results = self
            .config
            .combinations()
            .par_iter()
            .map(|c| self.run_combination(c))
            .collect();
        let report = RunReport::from_results(results);
        log_summary(&report);
        report
    }
}

fn log_summary(report: &RunReport) {
    info!(
        scanned = report.completed.len() - report.skipped(),
        skipped = report.skipped(),
        failed = report.failed.len(),
        alerts = report.alerts_sent(),
        notify_failures = report.notify_failures(),
        "scan finished"
    );
}
