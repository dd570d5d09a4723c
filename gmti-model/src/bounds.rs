//! Operator-facing parameter ranges.
//!
//! Every numeric field of a run configuration is kept inside these ranges.
//! Descriptor values are clamped when parsed and operator edits are clamped
//! when applied, so an out-of-range value can never reach the engine.

/// Inclusive range for an integer run parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: u32,
    pub max: u32,
}

impl IntRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: u64) -> u32 {
        if value < u64::from(self.min) {
            self.min
        } else if value > u64::from(self.max) {
            self.max
        } else {
            value as u32
        }
    }
}

/// Inclusive range for a floating-point run parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub min: f64,
    pub max: f64,
}

impl FloatRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp into the range. Non-finite input collapses to `min`.
    pub fn clamp(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

/// The full set of bounds applied to run parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBounds {
    pub taps: IntRange,
    pub range_bins: IntRange,
    pub doppler_bins: IntRange,
    pub frequency: FloatRange,
    pub noise: FloatRange,
}

impl ParameterBounds {
    pub const OPERATOR: ParameterBounds = ParameterBounds {
        taps: IntRange::new(1, 32),
        range_bins: IntRange::new(64, 8192),
        doppler_bins: IntRange::new(32, 1024),
        frequency: FloatRange::new(1.0, 200.0),
        noise: FloatRange::new(0.0, 0.5),
    };
}

impl Default for ParameterBounds {
    fn default() -> Self {
        Self::OPERATOR
    }
}
