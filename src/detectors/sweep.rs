//! Setup 2: four-point liquidity sweep reversal
//!
//! Every run of four consecutive swing points is checked:
//!
//! - Bearish `L0 H1 L2 H3`: `H3` takes out `H1`, no bar between them does,
//!   the bar after `H3` makes no higher high, and a later bar closes below `L0`.
//! - Bullish `H0 L1 H2 L3`: the mirror image.
//!
//! Windows overlap and are not deduplicated, so one swing point can take part
//! in several signals.

use std::collections::HashMap;

use super::swings::{find_swings, SwingKind, SwingPoint};
use crate::{
    params::{reject_unknown, ParamMeta, ParameterizedDetector},
    Direction, Result, SetupDetector, SetupId, Signal, SignalInfo, OHLCV,
};

/// Setup 2 detector. Has no tunable parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SweepDetector;

impl SweepDetector {
    fn bearish<T: OHLCV>(bars: &[T], [i0, i1, _, i3]: [usize; 4]) -> Option<usize> {
        let low0 = bars[i0].low();
        let high1 = bars[i1].high();
        let high3 = bars[i3].high();

        if high3 <= high1 {
            return None;
        }
        // i3 must be the only bar above high1
        if bars[i1 + 1..i3].iter().any(|b| b.high() > high1) {
            return None;
        }
        if bars.get(i3 + 1).is_some_and(|b| b.high() > high3) {
            return None;
        }

        (i3 + 1..bars.len()).find(|&i| bars[i].close() < low0)
    }

    fn bullish<T: OHLCV>(bars: &[T], [i0, i1, _, i3]: [usize; 4]) -> Option<usize> {
        let high0 = bars[i0].high();
        let low1 = bars[i1].low();
        let low3 = bars[i3].low();

        if low3 >= low1 {
            return None;
        }
        // i3 must be the only bar below low1
        if bars[i1 + 1..i3].iter().any(|b| b.low() < low1) {
            return None;
        }
        if bars.get(i3 + 1).is_some_and(|b| b.low() < low3) {
            return None;
        }

        (i3 + 1..bars.len()).find(|&i| bars[i].close() > high0)
    }

    /// Check one window of four swing points
    fn check_window<T: OHLCV>(
        bars: &[T],
        window: &[SwingPoint],
    ) -> Option<(Direction, usize, [usize; 4])> {
        use SwingKind::{High, Low};

        let idx = [
            window[0].index,
            window[1].index,
            window[2].index,
            window[3].index,
        ];
        if !idx.windows(2).all(|w| w[0] < w[1]) {
            return None;
        }

        let kinds = [window[0].kind, window[1].kind, window[2].kind, window[3].kind];
        match kinds {
            [Low, High, Low, High] => {
                Self::bearish(bars, idx).map(|trigger| (Direction::Bearish, trigger, idx))
            }
            [High, Low, High, Low] => {
                Self::bullish(bars, idx).map(|trigger| (Direction::Bullish, trigger, idx))
            }
            _ => None,
        }
    }
}

impl SetupDetector for SweepDetector {
    fn id(&self) -> SetupId {
        SetupId::Sweep
    }

    fn min_bars(&self) -> usize {
        6
    }

    fn detect<T: OHLCV>(&self, bars: &[T], symbol: &str, timeframe: &str) -> Vec<Signal> {
        let points = find_swings(bars).merged();
        if points.len() < 4 {
            return Vec::new();
        }

        points
            .windows(4)
            .filter_map(|window| Self::check_window(bars, window))
            .map(|(direction, trigger, [i0, i1, i2, i3])| Signal {
                setup: SetupId::Sweep,
                direction,
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
                trigger_index: trigger,
                trigger_time: bars[trigger].close_time(),
                info: SignalInfo::Sweep {
                    start_index: i0,
                    swing1_index: i1,
                    swing2_index: i2,
                    sweep_index: i3,
                },
            })
            .collect()
    }
}

impl ParameterizedDetector for SweepDetector {
    fn param_meta() -> &'static [ParamMeta] {
        &[]
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        reject_unknown(params, Self::param_meta())?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;

    fn bar(i: usize, high: f64, low: f64, close: f64) -> Candle {
        let t = i as i64 * 1_000;
        Candle::new(t, t + 999, (high + low) / 2.0, high, low, close, 1.0)
    }

    fn bars(points: &[(f64, f64, f64)]) -> Vec<Candle> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(h, l, c))| bar(i, h, l, c))
            .collect()
    }

    fn mirror(candles: &[Candle]) -> Vec<Candle> {
        candles
            .iter()
            .map(|c| Candle {
                open: 200.0 - c.open,
                high: 200.0 - c.low,
                low: 200.0 - c.high,
                close: 200.0 - c.close,
                ..*c
            })
            .collect()
    }

    /// Swings: L@1, H@3, L@5, H@7 (sweeps H@3); close below L@1 at 9
    fn bearish_fixture() -> Vec<(f64, f64, f64)> {
        vec![
            (105.0, 100.0, 102.0), // 0
            (104.0, 95.0, 100.0),  // 1 L0
            (108.0, 97.0, 106.0),  // 2
            (112.0, 100.0, 108.0), // 3 H1
            (109.0, 98.0, 100.0),  // 4
            (106.0, 96.0, 104.0),  // 5 L2
            (110.0, 99.0, 109.0),  // 6
            (115.0, 103.0, 105.0), // 7 H3 sweep
            (113.0, 101.0, 102.0), // 8
            (108.0, 94.0, 94.5),   // 9 close < 95
            (100.0, 90.0, 92.0),   // 10
        ]
    }

    #[test]
    fn test_bearish_sweep() {
        let candles = bars(&bearish_fixture());
        let signals = SweepDetector.detect(&candles, "ETHUSDT", "1h");

        assert_eq!(signals.len(), 1);
        let s = &signals[0];
        assert_eq!(s.direction, Direction::Bearish);
        assert_eq!(s.trigger_index, 9);
        assert_eq!(s.trigger_time, candles[9].close_time);
        assert_eq!(
            s.info,
            SignalInfo::Sweep {
                start_index: 1,
                swing1_index: 3,
                swing2_index: 5,
                sweep_index: 7,
            }
        );
    }

    #[test]
    fn test_bullish_mirror() {
        let candles = mirror(&bars(&bearish_fixture()));
        let signals = SweepDetector.detect(&candles, "ETHUSDT", "1h");

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Bullish);
        assert_eq!(signals[0].trigger_index, 9);
    }

    #[test]
    fn test_trend_breach_rejected() {
        let mut points = bearish_fixture();
        // bar between H1 and H3 already trades above H1
        points[6] = (113.0, 99.0, 109.0);
        let candles = bars(&points);
        assert!(SweepDetector.detect(&candles, "X", "1h").is_empty());
    }

    #[test]
    fn test_sweep_must_exceed_prior_high() {
        let mut points = bearish_fixture();
        points[7] = (111.5, 103.0, 105.0);
        points[8] = (110.0, 101.0, 102.0);
        let candles = bars(&points);
        assert!(SweepDetector.detect(&candles, "X", "1h").is_empty());
    }

    #[test]
    fn test_no_confirmation_close() {
        let mut points = bearish_fixture();
        points[9] = (108.0, 94.0, 96.0);
        points[10] = (100.0, 93.0, 95.0);
        let candles = bars(&points);
        assert!(SweepDetector.detect(&candles, "X", "1h").is_empty());
    }

    #[test]
    fn test_first_close_wins() {
        let mut points = bearish_fixture();
        points[10] = (100.0, 90.0, 91.0);
        let candles = bars(&points);
        let signals = SweepDetector.detect(&candles, "X", "1h");
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].trigger_index, 9);
    }

    /// Swings L@1, H@3, L@5, H@7, L@9, H@11. Window (1,3,5,7) is a bearish
    /// sweep closing below L@1 at 9; window (3,5,7,9) is a bullish sweep
    /// closing above H@3 at 11; window (5,7,9,11) fails since H@11 < H@7.
    fn overlapping_fixture() -> Vec<(f64, f64, f64)> {
        vec![
            (105.0, 100.0, 102.0), // 0
            (104.0, 96.0, 100.0),  // 1 L
            (108.0, 98.0, 106.0),  // 2
            (112.0, 100.0, 108.0), // 3 H
            (109.0, 97.0, 100.0),  // 4
            (106.0, 94.0, 104.0),  // 5 L
            (110.0, 97.0, 109.0),  // 6
            (115.0, 103.0, 105.0), // 7 H sweeps 112
            (113.0, 99.0, 100.0),  // 8
            (108.0, 92.0, 95.0),   // 9 L sweeps 94, close < 96
            (111.0, 95.0, 110.0),  // 10
            (114.0, 100.0, 113.5), // 11 H, close > 112
            (113.0, 105.0, 106.0), // 12
        ]
    }

    #[test]
    fn test_overlapping_windows_both_signal() {
        let candles = bars(&overlapping_fixture());
        let signals = SweepDetector.detect(&candles, "BTCUSDT", "4h");

        assert_eq!(signals.len(), 2);

        assert_eq!(signals[0].direction, Direction::Bearish);
        assert_eq!(signals[0].trigger_index, 9);
        assert_eq!(
            signals[0].info,
            SignalInfo::Sweep {
                start_index: 1,
                swing1_index: 3,
                swing2_index: 5,
                sweep_index: 7,
            }
        );

        assert_eq!(signals[1].direction, Direction::Bullish);
        assert_eq!(signals[1].trigger_index, 11);
        assert_eq!(
            signals[1].info,
            SignalInfo::Sweep {
                start_index: 3,
                swing1_index: 5,
                swing2_index: 7,
                sweep_index: 9,
            }
        );
    }

    #[test]
    fn test_fewer_than_four_points() {
        let candles = bars(&bearish_fixture()[..5]);
        assert!(SweepDetector.detect(&candles, "X", "1h").is_empty());
    }

    #[test]
    fn test_with_params_rejects_unknown() {
        assert!(SweepDetector::with_params(&HashMap::new()).is_ok());

        let mut params = HashMap::new();
        params.insert("depth", 3.0);
        assert!(SweepDetector::with_params(&params).is_err());
    }
}
