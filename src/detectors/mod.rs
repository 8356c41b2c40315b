//! Swing-structure setup detectors
//!
//! # Components
//!
//! - **Swings**: single-bar local extrema, shared by both setups.
//! - **Base retest (Setup 1)**: swing point protruding from a base, single-wick
//!   retest of the base, break of the swing point.
//! - **Sweep (Setup 2)**: four alternating swing points with a one-bar sweep of
//!   the prior same-side swing and a close through the starting swing.

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod base_retest;
pub mod sweep;
pub mod swings;

pub use base_retest::*;
pub use sweep::*;
pub use swings::*;

impl_with_defaults!(BaseRetestDetector, SweepDetector);
