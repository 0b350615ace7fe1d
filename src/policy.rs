//! The [`Estimator`] trait shared by every online price-selection policy.
//!
//! [`Greedy`](crate::Greedy), [`ThompsonSampling`](crate::ThompsonSampling) and
//! [`Ucb1`](crate::Ucb1) all expose the same four capabilities: pick an arm, record
//! the observed Bernoulli outcome, and report a per-arm mean and confidence bound.
//! Non-stationary behaviour is layered on with [`Windowed`](crate::Windowed) rather
//! than by subclassing the policies.
//!
//! Bookkeeping common to all policies lives in [`LearnerCore`]:
//! - `t`: observations recorded; always `sum(arm_counters)`.
//! - `clock`: global rounds elapsed (`>= t`). Equal to `t` unless a caller advances it
//!   on behalf of rounds this estimator did not observe (see
//!   [`ContextSplitController`](crate::ContextSplitController)).
//! - `collected_rewards`: one monetary reward `raw_reward * price` per observation.

use rand::rngs::StdRng;
use rand::Rng;

use crate::{Error, Result, TIEBREAK_EPS};

/// Per-learner counters and reward trace.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearnerCore {
    prices: Vec<f64>,
    t: u64,
    clock: u64,
    arm_counters: Vec<u64>,
    collected_rewards: Vec<f64>,
}

impl LearnerCore {
    /// Validate `prices` (one per arm, finite, non-negative) and start at round zero.
    pub fn new(prices: Vec<f64>) -> Result<Self> {
        if prices.is_empty() {
            return Err(Error::NoArms);
        }
        if let Some(&bad) = prices.iter().find(|p| !p.is_finite() || **p < 0.0) {
            return Err(Error::InvalidPrice { value: bad });
        }
        let n = prices.len();
        Ok(Self {
            prices,
            t: 0,
            clock: 0,
            arm_counters: vec![0; n],
            collected_rewards: Vec::new(),
        })
    }

    pub fn n_arms(&self) -> usize {
        self.prices.len()
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn t(&self) -> u64 {
        self.t
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn arm_counters(&self) -> &[u64] {
        &self.arm_counters
    }

    pub fn collected_rewards(&self) -> &[f64] {
        &self.collected_rewards
    }

    /// Forced initial sweep: arm `t` while not every arm has been tried.
    pub fn forced_arm(&self) -> Option<usize> {
        let t = self.t as usize;
        (t < self.prices.len()).then_some(t)
    }

    /// Book one observation.
    ///
    /// # Panics
    ///
    /// Panics if `arm` is out of range.
    pub fn record(&mut self, arm: usize, raw_reward: f64) {
        let price = self.prices[arm];
        self.arm_counters[arm] += 1;
        self.t += 1;
        self.clock += 1;
        self.collected_rewards.push(raw_reward * price);
    }

    /// Account for `rounds` global rounds that this learner did not observe.
    pub fn advance_clock(&mut self, rounds: u64) {
        self.clock = self.clock.saturating_add(rounds);
    }
}

/// Common interface for online per-arm estimators.
///
/// Implementors only provide the policy-specific pieces; counters and the reward trace
/// come from [`LearnerCore`] through [`core`](Estimator::core).
pub trait Estimator {
    fn core(&self) -> &LearnerCore;

    fn core_mut(&mut self) -> &mut LearnerCore;

    /// Choose the next arm to pull.
    ///
    /// The first `n_arms` calls on a fresh estimator return `0, 1, ..., n_arms - 1`.
    fn select_arm(&mut self) -> usize;

    /// Record the Bernoulli outcome (`0.0` or `1.0`) of pulling `arm`.
    ///
    /// # Panics
    ///
    /// Panics if `arm` is out of range.
    fn record(&mut self, arm: usize, raw_reward: f64);

    /// Current estimate of the arm's success probability.
    fn mean_estimate(&self, arm: usize) -> f64;

    /// Current confidence term for the arm (policy-specific; `0.0` when not tracked).
    fn confidence_bound(&self, arm: usize) -> f64;

    fn n_arms(&self) -> usize {
        self.core().n_arms()
    }

    fn prices(&self) -> &[f64] {
        self.core().prices()
    }

    fn t(&self) -> u64 {
        self.core().t()
    }

    fn clock(&self) -> u64 {
        self.core().clock()
    }

    fn arm_counters(&self) -> &[u64] {
        self.core().arm_counters()
    }

    /// Monetary reward per observation, in observation order.
    fn total_rewards(&self) -> &[f64] {
        self.core().collected_rewards()
    }

    fn advance_clock(&mut self, rounds: u64) {
        self.core_mut().advance_clock(rounds);
    }
}

impl<E: Estimator + ?Sized> Estimator for Box<E> {
    fn core(&self) -> &LearnerCore {
        (**self).core()
    }
    fn core_mut(&mut self) -> &mut LearnerCore {
        (**self).core_mut()
    }
    fn select_arm(&mut self) -> usize {
        (**self).select_arm()
    }
    fn record(&mut self, arm: usize, raw_reward: f64) {
        (**self).record(arm, raw_reward);
    }
    fn mean_estimate(&self, arm: usize) -> f64 {
        (**self).mean_estimate(arm)
    }
    fn confidence_bound(&self, arm: usize) -> f64 {
        (**self).confidence_bound(arm)
    }
}

/// Index of the largest score; ties (within [`TIEBREAK_EPS`]) are broken uniformly at random.
///
/// The RNG is only consumed when there is more than one maximizer.
///
/// # Panics
///
/// Panics if `scores` is empty.
pub fn argmax_uniform(scores: &[f64], rng: &mut StdRng) -> usize {
    assert!(!scores.is_empty(), "argmax over zero arms");
    let best = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let ties: Vec<usize> = scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s == best || (best - s).abs() <= TIEBREAK_EPS)
        .map(|(i, _)| i)
        .collect();
    match ties.len() {
        0 => 0,
        1 => ties[0],
        n => ties[rng.random_range(0..n)],
    }
}
