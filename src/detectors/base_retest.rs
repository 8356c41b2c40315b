//! Setup 1: base retest continuation (rally-base-rally / drop-base-drop)
//!
//! Bullish, per swing high `H`:
//! 1. A base window `[H - base_lookback_max, H - base_lookback_min]` whose
//!    highest high is below `high[H]`.
//! 2. A single wick after `H` that trades at or below the base low and is
//!    reverted on the very next bar.
//! 3. A later bar breaking above `high[H]` - the trigger.
//!
//! Bearish mirrors every comparison over swing lows. Each scan takes the first
//! qualifying bar; a swing point yields at most one signal.

use std::collections::HashMap;

use super::swings::find_swings;
use crate::{
    params::{get_period, reject_unknown, ParamMeta, ParameterizedDetector},
    Direction, PatternError, Period, Result, SetupDetector, SetupId, Signal, SignalInfo, OHLCV,
};

/// Setup 1 detector with tunable look-back/look-ahead windows
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BaseRetestDetector {
    /// Furthest bar of the base, counted back from the swing point
    pub base_lookback_max: Period,
    /// Nearest bar of the base, counted back from the swing point
    pub base_lookback_min: Period,
    /// Bars after the swing point searched for the wick retest
    pub wick_lookahead: Period,
    /// Bars after the wick searched for the break of the swing point
    pub continuation_lookahead: Period,
}

impl Default for BaseRetestDetector {
    fn default() -> Self {
        Self {
            base_lookback_max: Period::new_const(10),
            base_lookback_min: Period::new_const(3),
            wick_lookahead: Period::new_const(10),
            continuation_lookahead: Period::new_const(15),
        }
    }
}

/// Base window bounds and range
#[derive(Debug, Clone, Copy)]
struct Base {
    start: usize,
    end: usize,
    low: f64,
    high: f64,
}

impl BaseRetestDetector {
    /// Base window preceding `swing`, or `None` when the swing sits too close
    /// to either end of the sequence.
    fn base_for<T: OHLCV>(&self, bars: &[T], swing: usize) -> Option<Base> {
        let n = bars.len();
        let max_lb = self.base_lookback_max.get();
        let min_lb = self.base_lookback_min.get();
        let tail = self
            .wick_lookahead
            .get()
            .saturating_add(self.continuation_lookahead.get())
            .saturating_add(1);

        if swing < max_lb || swing <= min_lb {
            return None;
        }
        // not enough bars after the swing to fully form the pattern
        if swing.saturating_add(tail) >= n {
            return None;
        }

        let start = swing.saturating_sub(max_lb);
        let end = swing - min_lb;
        if end <= start {
            return None;
        }

        let window = &bars[start..=end];
        let low = window.iter().map(|b| b.low()).fold(f64::INFINITY, f64::min);
        let high = window
            .iter()
            .map(|b| b.high())
            .fold(f64::NEG_INFINITY, f64::max);

        Some(Base {
            start,
            end,
            low,
            high,
        })
    }

    /// Bullish pattern anchored on swing high `swing`: (trigger index, info)
    fn bullish_at<T: OHLCV>(&self, bars: &[T], swing: usize) -> Option<(usize, SignalInfo)> {
        let n = bars.len();
        let base = self.base_for(bars, swing)?;

        let ref_high = bars[swing].high();
        if ref_high <= base.high {
            return None;
        }

        let wick_end = (n - 2).min(swing.saturating_add(self.wick_lookahead.get()));
        let wick_index = (swing + 1..wick_end)
            .find(|&i| bars[i].low() <= base.low && bars[i + 1].low() > base.low)?;

        let cont_end = n.min(wick_index.saturating_add(self.continuation_lookahead.get()));
        let trigger = (wick_index + 1..cont_end).find(|&i| bars[i].high() > ref_high)?;

        Some((
            trigger,
            SignalInfo::BaseRetest {
                swing_index: swing,
                wick_index,
                base_start: base.start,
                base_end: base.end,
                base_level: base.low,
            },
        ))
    }

    /// Bearish pattern anchored on swing low `swing`: (trigger index, info)
    fn bearish_at<T: OHLCV>(&self, bars: &[T], swing: usize) -> Option<(usize, SignalInfo)> {
        let n = bars.len();
        let base = self.base_for(bars, swing)?;

        let ref_low = bars[swing].low();
        if ref_low >= base.low {
            return None;
        }

        let wick_end = (n - 2).min(swing.saturating_add(self.wick_lookahead.get()));
        let wick_index = (swing + 1..wick_end)
            .find(|&i| bars[i].high() >= base.high && bars[i + 1].high() < base.high)?;

        let cont_end = n.min(wick_index.saturating_add(self.continuation_lookahead.get()));
        let trigger = (wick_index + 1..cont_end).find(|&i| bars[i].low() < ref_low)?;

        Some((
            trigger,
            SignalInfo::BaseRetest {
                swing_index: swing,
                wick_index,
                base_start: base.start,
                base_end: base.end,
                base_level: base.high,
            },
        ))
    }
}

impl SetupDetector for BaseRetestDetector {
    fn id(&self) -> SetupId {
        SetupId::BaseRetest
    }

    fn min_bars(&self) -> usize {
        self.base_lookback_max
            .get()
            .saturating_add(self.wick_lookahead.get())
            .saturating_add(self.continuation_lookahead.get())
            .saturating_add(2)
    }

    fn detect<T: OHLCV>(&self, bars: &[T], symbol: &str, timeframe: &str) -> Vec<Signal> {
        let swings = find_swings(bars);

        let bullish = swings
            .highs
            .iter()
            .filter_map(|&h| self.bullish_at(bars, h))
            .map(|hit| (Direction::Bullish, hit));
        let bearish = swings
            .lows
            .iter()
            .filter_map(|&l| self.bearish_at(bars, l))
            .map(|hit| (Direction::Bearish, hit));

        bullish
            .chain(bearish)
            .map(|(direction, (trigger, info))| Signal {
                setup: SetupId::BaseRetest,
                direction,
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                trigger_index: trigger,
                trigger_time: bars[trigger].close_time(),
                info,
            })
            .collect()
    }

    fn validate_config(&self) -> Result<()> {
        let values = [
            self.base_lookback_max,
            self.base_lookback_min,
            self.wick_lookahead,
            self.continuation_lookahead,
        ];
        for (meta, value) in Self::param_meta().iter().zip(values) {
            meta.validate(value.get() as f64)?;
        }
        if self.base_lookback_min >= self.base_lookback_max {
            return Err(PatternError::InvalidConfig(format!(
                "base_lookback_min ({}) must be below base_lookback_max ({})",
                self.base_lookback_min.get(),
                self.base_lookback_max.get()
            )));
        }
        Ok(())
    }
}

static BASE_RETEST_PARAMS: [ParamMeta; 4] = [
    ParamMeta::period(
        "base_lookback_max",
        10.0,
        (4.0, 30.0, 1.0),
        "Furthest base bar before the swing point",
    ),
    ParamMeta::period(
        "base_lookback_min",
        3.0,
        (1.0, 10.0, 1.0),
        "Nearest base bar before the swing point",
    ),
    ParamMeta::period(
        "wick_lookahead",
        10.0,
        (2.0, 30.0, 1.0),
        "Bars after the swing point searched for the wick retest",
    ),
    ParamMeta::period(
        "continuation_lookahead",
        15.0,
        (2.0, 40.0, 1.0),
        "Bars after the wick searched for the breakout",
    ),
];

impl ParameterizedDetector for BaseRetestDetector {
    fn param_meta() -> &'static [ParamMeta] {
        &BASE_RETEST_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        reject_unknown(params, Self::param_meta())?;

        let detector = Self {
            base_lookback_max: get_period(params, "base_lookback_max", 10)?,
            base_lookback_min: get_period(params, "base_lookback_min", 3)?,
            wick_lookahead: get_period(params, "wick_lookahead", 10)?,
            continuation_lookahead: get_period(params, "continuation_lookahead", 15)?,
        };
        detector.validate_config()?;
        Ok(detector)
    }

}
