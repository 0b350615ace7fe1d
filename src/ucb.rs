//! UCB1 over price-weighted conversion estimates.
//!
//! Score for arm `i` is `(mean_i + bound_i) * price_i`, with
//! `bound_i = sqrt(ln(clock) / n_i)`. The arm pulled in the current round counts its
//! samples without that round's pull, so an arm seen exactly once keeps the
//! [`unexplored_bound`](crate::unexplored_bound) sentinel for one more round. Arms without
//! samples (or rounds where the log term is degenerate) get the sentinel.
//! Bounds are refreshed for every arm after each observation, since the shared clock
//! moves for all of them.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{argmax_uniform, unexplored_bound, Estimator, LearnerCore, Refit, Result};

/// `(mean_estimate, bound)` for one arm.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UcbEstimate {
    pub mean: f64,
    pub bound: f64,
}

/// Seedable UCB1 price learner.
#[derive(Debug, Clone)]
pub struct Ucb1 {
    core: LearnerCore,
    estimates: Vec<UcbEstimate>,
    sentinel: f64,
    rng: StdRng,
}

impl Ucb1 {
    /// Create a learner for a run of `horizon` rounds (used to scale the sentinel bound).
    pub fn new(prices: Vec<f64>, horizon: usize, seed: u64) -> Result<Self> {
        let core = LearnerCore::new(prices)?;
        let n = core.n_arms();
        let sentinel = unexplored_bound(horizon, n);
        Ok(Self {
            core,
            estimates: vec![
                UcbEstimate {
                    mean: 0.0,
                    bound: sentinel,
                };
                n
            ],
            sentinel,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn estimates(&self) -> &[UcbEstimate] {
        &self.estimates
    }

    /// The sentinel used in place of an undefined bound.
    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    fn bound(&self, n_samples: u64, log_rounds: u64) -> f64 {
        if n_samples == 0 || log_rounds <= 1 {
            return self.sentinel;
        }
        ((log_rounds as f64).ln() / n_samples as f64).sqrt()
    }
}

impl Estimator for Ucb1 {
    fn core(&self) -> &LearnerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LearnerCore {
        &mut self.core
    }

    fn select_arm(&mut self) -> usize {
        if let Some(arm) = self.core.forced_arm() {
            return arm;
        }
        let scores: Vec<f64> = self
            .estimates
            .iter()
            .zip(self.core.prices())
            .map(|(e, p)| (e.mean + e.bound) * p)
            .collect();
        argmax_uniform(&scores, &mut self.rng)
    }

    fn record(&mut self, arm: usize, raw_reward: f64) {
        self.core.record(arm, raw_reward);
        let n = self.core.arm_counters()[arm] as f64;
        let e = &mut self.estimates[arm];
        e.mean += (raw_reward - e.mean) / n;

        let clock = self.core.clock();
        for i in 0..self.estimates.len() {
            let n_i = self.core.arm_counters()[i] - u64::from(i == arm);
            let b = self.bound(n_i, clock);
            self.estimates[i].bound = b;
        }
    }

    fn mean_estimate(&self, arm: usize) -> f64 {
        self.estimates[arm].mean
    }

    fn confidence_bound(&self, arm: usize) -> f64 {
        self.estimates[arm].bound
    }
}

impl Refit for Ucb1 {
    /// Means over live samples; the log term only trusts `min(clock, window_size)` rounds.
    fn refit(&mut self, live: &[Vec<f64>], window_size: usize, pulled: usize) {
        let log_rounds = self.core.clock().min(window_size as u64);
        for (i, samples) in live.iter().enumerate() {
            let n = samples.len() as u64;
            let mean = if n == 0 {
                0.0
            } else {
                samples.iter().sum::<f64>() / n as f64
            };
            let n_bound = n.saturating_sub(u64::from(i == pulled));
            self.estimates[i] = UcbEstimate {
                mean,
                bound: self.bound(n_bound, log_rounds),
            };
        }
    }
}
