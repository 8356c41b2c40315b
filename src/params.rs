//! Parameter metadata for setup detectors
//!
//! This module provides metadata about detector parameters, enabling:
//! - Grid search over look-back/look-ahead windows
//! - Parameter documentation
//! - Building detectors from loosely typed settings
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use sweepscan::prelude::*;
//!
//! for param in BaseRetestDetector::param_meta() {
//!     println!("{} (default: {})", param.name, param.default);
//! }
//!
//! let mut params = HashMap::new();
//! params.insert("wick_lookahead", 6.0);
//! let detector = BaseRetestDetector::with_params(&params).unwrap();
//! assert_eq!(detector.wick_lookahead.get(), 6);
//! ```

use std::collections::HashMap;

use crate::{PatternError, Period, Result};

// ============================================================
// PARAMETER METADATA
// ============================================================

/// Metadata for a single bar-count parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "wick_lookahead")
  pub name: &'static str,
  /// Default value
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  /// Human-readable description
  pub description: &'static str,
}

impl ParamMeta {
  /// Create a new ParamMeta for a Period parameter
  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut v = min;
    while v <= max + f64::EPSILON {
      values.push(v);
      v += step;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    if value < 1.0 || value.fract() != 0.0 {
      return Err(PatternError::InvalidValue("Period must be a positive integer"));
    }
    Ok(())
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Trait for detectors that support parameterization
pub trait ParameterizedDetector: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector with parameters from a HashMap
  ///
  /// Missing parameters use their default values; unknown keys are an error.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 1.0 || value.fract() != 0.0 {
    return Err(PatternError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Fail on keys that no parameter in `meta` declares
pub fn reject_unknown(params: &HashMap<&str, f64>, meta: &[ParamMeta]) -> Result<()> {
  let mut unknown: Vec<&str> =
    params.keys().copied().filter(|key| !meta.iter().any(|m| m.name == *key)).collect();
  if unknown.is_empty() {
    return Ok(());
  }
  unknown.sort_unstable();
  Err(PatternError::InvalidConfig(format!("unknown parameter(s): {}", unknown.join(", "))))
}

// ============================================================
// TESTS
// ============================================================
