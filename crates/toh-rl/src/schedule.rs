//! Step-indexed schedules for the exploration and learning rates

use serde::{Deserialize, Serialize};
use toh_core::{Result, TohError};

/// A pure function of the step counter
pub trait Schedule {
    fn value(&self, step: u64) -> f64;
}

/// `ε(n) = 1 / (1 + decay·n)`: starts at 1 and decays toward 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpsilonSchedule {
    pub decay: f64,
}

impl EpsilonSchedule {
    pub fn new(decay: f64) -> Result<Self> {
        if !(decay > 0.0 && decay.is_finite()) {
            return Err(TohError::InvalidParameter(format!(
                "epsilon decay must be positive, got {decay}"
            )));
        }
        Ok(Self { decay })
    }
}

impl Default for EpsilonSchedule {
    fn default() -> Self {
        Self { decay: 0.001 }
    }
}

impl Schedule for EpsilonSchedule {
    fn value(&self, step: u64) -> f64 {
        1.0 / (1.0 + self.decay * step as f64)
    }
}

/// Polynomially decaying learning rate `α(n) = initial / (1 + n)^ω`.
///
/// With `ω ∈ (0.5, 1]` the rates satisfy the Robbins-Monro conditions:
/// `Σ α(n)` diverges since `ω ≤ 1`, and `Σ α(n)²` converges since `2ω > 1`.
/// Exponents below 1 shrink the step size more slowly than `1/n`, which keeps
/// convergence polynomial rather than `n^-(1-γ)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlphaSchedule {
    pub initial: f64,
    pub exponent: f64,
}

impl AlphaSchedule {
    pub fn new(initial: f64, exponent: f64) -> Result<Self> {
        let schedule = Self { initial, exponent };
        schedule.validate()?;
        Ok(schedule)
    }

    /// Classic `1 / (1 + n)`
    pub fn harmonic() -> Self {
        Self {
            initial: 1.0,
            exponent: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.initial > 0.0 && self.initial <= 1.0) {
            return Err(TohError::InvalidParameter(format!(
                "initial alpha must be in (0, 1], got {}",
                self.initial
            )));
        }
        if !(self.exponent > 0.5 && self.exponent <= 1.0) {
            return Err(TohError::InvalidParameter(format!(
                "alpha exponent must be in (0.5, 1], got {}",
                self.exponent
            )));
        }
        Ok(())
    }
}

impl Default for AlphaSchedule {
    fn default() -> Self {
        Self {
            initial: 1.0,
            exponent: 0.6,
        }
    }
}

impl Schedule for AlphaSchedule {
    fn value(&self, step: u64) -> f64 {
        self.initial / (1.0 + step as f64).powf(self.exponent)
    }
}
