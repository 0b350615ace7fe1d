//! Greedy baseline: exploit the best empirical `mean * price`, never explore after the sweep.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::{argmax_uniform, Estimator, LearnerCore, Result};

/// Pure-exploitation policy with per-arm running means.
#[derive(Debug, Clone)]
pub struct Greedy {
    core: LearnerCore,
    means: Vec<f64>,
    rng: StdRng,
}

impl Greedy {
    /// Create a greedy learner; `seed` drives tie-breaking only.
    pub fn new(prices: Vec<f64>, seed: u64) -> Result<Self> {
        let core = LearnerCore::new(prices)?;
        let n = core.n_arms();
        Ok(Self {
            core,
            means: vec![0.0; n],
            rng: StdRng::seed_from_u64(seed),
        })
    }
}

impl Estimator for Greedy {
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
            .means
            .iter()
            .zip(self.core.prices())
            .map(|(m, p)| m * p)
            .collect();
        argmax_uniform(&scores, &mut self.rng)
    }

    fn record(&mut self, arm: usize, raw_reward: f64) {
        self.core.record(arm, raw_reward);
        let n = self.core.arm_counters()[arm] as f64;
        self.means[arm] += (raw_reward - self.means[arm]) / n;
    }

    fn mean_estimate(&self, arm: usize) -> f64 {
        self.means[arm]
    }

    fn confidence_bound(&self, _arm: usize) -> f64 {
        0.0
    }
}
