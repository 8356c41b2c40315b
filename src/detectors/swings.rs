//! Swing point extraction
//!
//! A swing high is a bar whose high is strictly above both immediate neighbours;
//! a swing low is a bar whose low is strictly below both. Equal neighbours never
//! qualify, and the first and last bar can never be swings.

use crate::OHLCV;

/// Which extreme a swing point marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwingKind {
    High,
    Low,
}

/// A swing index tagged with its kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwingPoint {
    pub index: usize,
    pub kind: SwingKind,
}

/// Swing highs and lows of a sequence, each strictly ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Swings {
    pub highs: Vec<usize>,
    pub lows: Vec<usize>,
}

impl Swings {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.highs.is_empty() && self.lows.is_empty()
    }

    /// All swing points in index order.
    ///
    /// A bar that is both a swing high and a swing low appears twice, high first.
    pub fn merged(&self) -> Vec<SwingPoint> {
        let mut points: Vec<SwingPoint> = self
            .highs
            .iter()
            .map(|&index| SwingPoint {
                index,
                kind: SwingKind::High,
            })
            .chain(self.lows.iter().map(|&index| SwingPoint {
                index,
                kind: SwingKind::Low,
            }))
            .collect();
        // stable: keeps High before Low on shared indices
        points.sort_by_key(|p| p.index);
        points
    }
}

/// Extract swing highs and lows in one O(n) pass.
pub fn find_swings<T: OHLCV>(bars: &[T]) -> Swings {
    let mut swings = Swings::default();

    for (offset, window) in bars.windows(3).enumerate() {
        let (prev, cur, next) = (&window[0], &window[1], &window[2]);
        let index = offset + 1;

        if cur.high() > prev.high() && cur.high() > next.high() {
            swings.highs.push(index);
        }
        if cur.low() < prev.low() && cur.low() < next.low() {
            swings.lows.push(index);
        }
    }

    swings
}
