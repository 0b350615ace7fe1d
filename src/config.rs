//! Experiment configuration.

use crate::{phase_length, AlgorithmFamily, Error, Result};

/// Knobs shared by every algorithm in an experiment set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExperimentConfig {
    /// Expected arm count; must match the provider's price list.
    pub n_arms: usize,
    /// Rounds per trial.
    pub time_horizon: usize,
    /// Trials per algorithm.
    pub n_experiments: usize,
    pub n_contexts: usize,
    pub n_phases: usize,
    /// Sliding-window length for non-stationary algorithms.
    pub window_size: Option<usize>,
    /// Base seed; every trial and estimator seed is derived from it.
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_arms: 11,
            time_horizon: 6000,
            n_experiments: 500,
            n_contexts: 3,
            n_phases: 4,
            window_size: Some(1500),
            seed: 0,
        }
    }
}

impl ExperimentConfig {
    pub fn with_n_arms(mut self, n_arms: usize) -> Self {
        self.n_arms = n_arms;
        self
    }

    pub fn with_time_horizon(mut self, time_horizon: usize) -> Self {
        self.time_horizon = time_horizon;
        self
    }

    pub fn with_n_experiments(mut self, n_experiments: usize) -> Self {
        self.n_experiments = n_experiments;
        self
    }

    pub fn with_n_contexts(mut self, n_contexts: usize) -> Self {
        self.n_contexts = n_contexts;
        self
    }

    pub fn with_n_phases(mut self, n_phases: usize) -> Self {
        self.n_phases = n_phases;
        self
    }

    pub fn with_window_size(mut self, window_size: Option<usize>) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_arms == 0 {
            return Err(Error::NoArms);
        }
        if self.time_horizon == 0 || self.n_phases == 0 {
            return Err(Error::InvalidHorizon);
        }
        if self.n_contexts == 0 {
            return Err(Error::NoContexts);
        }
        if self.window_size == Some(0) {
            return Err(Error::InvalidWindowSize);
        }
        Ok(())
    }

    /// Rounds per demand phase.
    pub fn phase_len(&self) -> usize {
        phase_length(self.time_horizon, self.n_phases)
    }

    /// Window to hand to `family`'s algorithms.
    ///
    /// Families without windowed algorithms get `None`. Windowed families use the
    /// configured window; with a single phase and no window the whole phase is used.
    pub fn window_for(&self, family: AlgorithmFamily) -> Result<Option<usize>> {
        if !family.needs_window() {
            return Ok(None);
        }
        match (self.window_size, self.n_phases) {
            (Some(0), _) => Err(Error::InvalidWindowSize),
            (Some(w), _) => Ok(Some(w)),
            (None, 1) => Ok(Some(self.phase_len())),
            (None, _) => {
                let algorithm = family
                    .algorithms()
                    .into_iter()
                    .find(|a| a.is_windowed())
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| family.to_string());
                Err(Error::MissingWindowSize { algorithm })
            }
        }
    }
}
