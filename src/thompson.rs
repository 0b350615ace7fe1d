//! Thompson sampling over per-price Beta posteriors.
//!
//! Each arm keeps a Beta(alpha, beta) posterior on its conversion probability, starting
//! from the uniform prior `(1, 1)`. Selection draws one sample per arm, scales it by the
//! arm's price, and takes the argmax.
//!
//! Notes:
//! - This policy is **seedable** so selection can be reproducible in tests.
//! - The reported confidence bound is the upper end of the central 95% posterior
//!   interval (the 0.975 quantile).

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};

use crate::{argmax_uniform, beta_quantile, Estimator, LearnerCore, Refit, Result};

/// Quantile reported by [`ThompsonSampling::confidence_bound`].
pub const THOMPSON_BOUND_QUANTILE: f64 = 0.975;

/// Beta posterior state for one arm.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BetaStats {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BetaStats {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

impl BetaStats {
    pub fn expected_value(&self) -> f64 {
        let denom = self.alpha + self.beta;
        if denom <= 0.0 {
            0.5
        } else {
            self.alpha / denom
        }
    }

    /// Posterior from a uniform prior and a bag of Bernoulli outcomes.
    pub fn from_samples(samples: &[f64]) -> Self {
        let successes: f64 = samples.iter().sum();
        Self {
            alpha: 1.0 + successes,
            beta: 1.0 + samples.len() as f64 - successes,
        }
    }
}

/// Seedable Thompson-sampling price learner.
#[derive(Debug, Clone)]
pub struct ThompsonSampling {
    core: LearnerCore,
    stats: Vec<BetaStats>,
    rng: StdRng,
}

impl ThompsonSampling {
    /// Create a learner with a fixed seed (reproducible).
    pub fn with_seed(prices: Vec<f64>, seed: u64) -> Result<Self> {
        let core = LearnerCore::new(prices)?;
        let n = core.n_arms();
        Ok(Self {
            core,
            stats: vec![BetaStats::default(); n],
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Access the per-arm Beta stats.
    pub fn stats(&self) -> &[BetaStats] {
        &self.stats
    }

    fn sample_beta(&mut self, s: BetaStats) -> f64 {
        if !(s.alpha.is_finite() && s.beta.is_finite()) || s.alpha <= 0.0 || s.beta <= 0.0 {
            return 0.5;
        }
        match Beta::new(s.alpha, s.beta) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => 0.5,
        }
    }
}

impl Estimator for ThompsonSampling {
    fn core(&self) -> &LearnerCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LearnerCore {
        &mut self.core
    }

    /// Policy:
    /// - Explore: arm `t` until every arm has one observation.
    /// - Otherwise: sample each posterior, weight by price, choose the max.
    fn select_arm(&mut self) -> usize {
        if let Some(arm) = self.core.forced_arm() {
            return arm;
        }
        let mut scores = Vec::with_capacity(self.stats.len());
        for i in 0..self.stats.len() {
            let x = self.sample_beta(self.stats[i]);
            scores.push(x * self.core.prices()[i]);
        }
        argmax_uniform(&scores, &mut self.rng)
    }

    /// `alpha += reward`, `beta += 1 - reward`.
    fn record(&mut self, arm: usize, raw_reward: f64) {
        self.core.record(arm, raw_reward);
        let s = &mut self.stats[arm];
        s.alpha += raw_reward;
        s.beta += 1.0 - raw_reward;
    }

    fn mean_estimate(&self, arm: usize) -> f64 {
        self.stats[arm].expected_value()
    }

    fn confidence_bound(&self, arm: usize) -> f64 {
        let s = self.stats[arm];
        beta_quantile(THOMPSON_BOUND_QUANTILE, s.alpha, s.beta)
    }
}

impl Refit for ThompsonSampling {
    fn refit(&mut self, live: &[Vec<f64>], _window_size: usize, _pulled: usize) {
        for (s, samples) in self.stats.iter_mut().zip(live) {
            *s = BetaStats::from_samples(samples);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explores_each_arm_once_in_order() {
        let mut ts = ThompsonSampling::with_seed(vec![1.0, 2.0, 3.0], 123).unwrap();
        for expected in 0..3 {
            let arm = ts.select_arm();
            assert_eq!(arm, expected);
            ts.record(arm, 0.0);
        }
    }

    #[test]
    fn deterministic_choice_given_same_seed_and_state() {
        let prices = vec![1.0, 1.5, 2.0];
        let mut t1 = ThompsonSampling::with_seed(prices.clone(), 42).unwrap();
        let mut t2 = ThompsonSampling::with_seed(prices, 42).unwrap();
        for arm in 0..3 {
            t1.record(arm, (arm % 2) as f64);
            t2.record(arm, (arm % 2) as f64);
        }
        for _ in 0..50 {
            assert_eq!(t1.select_arm(), t2.select_arm());
        }
    }

    #[test]
    fn posterior_tracks_counts() {
        let mut ts = ThompsonSampling::with_seed(vec![1.0, 1.0], 0).unwrap();
        for r in [1.0, 1.0, 0.0] {
            ts.record(0, r);
        }
        let s = ts.stats()[0];
        assert_eq!((s.alpha, s.beta), (3.0, 2.0));
        assert!((ts.mean_estimate(0) - 0.6).abs() < 1e-12);
        assert_eq!(ts.stats()[1], BetaStats::default());
    }

    #[test]
    fn bound_sits_above_mean_and_shrinks() {
        let mut ts = ThompsonSampling::with_seed(vec![1.0], 0).unwrap();
        ts.record(0, 1.0);
        ts.record(0, 0.0);
        let early = ts.confidence_bound(0);
        assert!(early > ts.mean_estimate(0));
        for i in 0..200 {
            ts.record(0, (i % 2) as f64);
        }
        let late = ts.confidence_bound(0);
        assert!(late < early, "late={late} early={early}");
        assert!(late > ts.mean_estimate(0));
    }

    #[test]
    fn refit_replaces_posterior_with_window() {
        let mut ts = ThompsonSampling::with_seed(vec![1.0, 1.0], 0).unwrap();
        for _ in 0..10 {
            ts.record(0, 1.0);
        }
        ts.refit(&[vec![0.0, 1.0], vec![]], 2, 0);
        assert_eq!(ts.stats()[0], BetaStats { alpha: 2.0, beta: 2.0 });
        assert_eq!(ts.stats()[1], BetaStats::default());
    }
}
