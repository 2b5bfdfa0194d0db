//! Configuration types for agent creation.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Learning and planning parameters shared by both Dyna agents.
///
/// Defaults are the classic Dyna-Q settings: five planning updates per real
/// step, ε = 0.1, α = 0.1, γ = 0.95 and κ = 1e-3 (κ is ignored by Dyna-Q).
///
/// ```
/// use dyna_maze_core::AgentConfig;
///
/// let config = AgentConfig::default()
///     .with_planning_steps(50)
///     .with_kappa(1e-2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Simulated updates per real step (n)
    pub planning_steps: usize,
    /// Exploration rate ε
    pub epsilon: f64,
    /// Learning rate α
    pub alpha: f64,
    /// Discount factor γ
    pub gamma: f64,
    /// Exploration-bonus coefficient κ (Dyna-Q+ only)
    pub kappa: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            planning_steps: 5,
            epsilon: 0.1,
            alpha: 0.1,
            gamma: 0.95,
            kappa: 1e-3,
        }
    }
}

impl AgentConfig {
    pub fn with_planning_steps(mut self, planning_steps: usize) -> Self {
        self.planning_steps = planning_steps;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_kappa(mut self, kappa: f64) -> Self {
        self.kappa = kappa;
        self
    }

    /// Checks every parameter is in range.
    pub fn validate(&self) -> Result<()> {
        if self.planning_steps == 0 {
            return Err(Error::configuration("planning steps must be positive"));
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::configuration(format!(
                "epsilon {} must be within [0, 1]",
                self.epsilon
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::configuration(format!(
                "alpha {} must be within [0, 1]",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(Error::configuration(format!(
                "gamma {} must be within [0, 1]",
                self.gamma
            )));
        }
        if !self.kappa.is_finite() || self.kappa < 0.0 {
            return Err(Error::configuration(format!(
                "kappa {} must be non-negative and finite",
                self.kappa
            )));
        }
        Ok(())
    }
}
