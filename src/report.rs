//! Experiment summaries and where they go.
//!
//! Plotting is somebody else's job: a [`Reporter`] receives one [`ExperimentSummary`]
//! per algorithm and does whatever it wants with it.

use tracing::info;

use crate::Algorithm;

/// Average split time across trials.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SplitTime {
    /// Stationary controllers: one split round per trial, averaged.
    Once(f64),
    /// Phased controllers: phase-relative split offset, averaged per phase.
    PerPhase(Vec<f64>),
}

/// Trial-averaged results for one algorithm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentSummary {
    pub algorithm: Algorithm,
    pub trials: usize,
    /// Mean monetary reward per round.
    pub rewards: Vec<f64>,
    /// Cumulative regret per round.
    pub cumulative_regret: Vec<f64>,
    /// Final per-arm mean estimate of the aggregate estimator (`None` for greedy).
    pub arm_means: Option<Vec<f64>>,
    /// Final per-arm confidence bound of the aggregate estimator (`None` for greedy).
    pub arm_bounds: Option<Vec<f64>>,
    /// `[context][arm]` final means, contextual algorithms only.
    pub context_arm_means: Vec<Vec<f64>>,
    /// `[context][arm]` final bounds, contextual algorithms only.
    pub context_arm_bounds: Vec<Vec<f64>>,
    pub split_time: Option<SplitTime>,
}

impl ExperimentSummary {
    pub fn final_regret(&self) -> Option<f64> {
        self.cumulative_regret.last().copied()
    }

    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }
}

/// Consumer of experiment summaries.
pub trait Reporter {
    fn report(&mut self, summary: &ExperimentSummary);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn report(&mut self, summary: &ExperimentSummary) {
        (**self).report(summary);
    }
}

/// Logs one `info` line per summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, summary: &ExperimentSummary) {
        let split = match &summary.split_time {
            Some(SplitTime::Once(t)) => format!("{t:.1}"),
            Some(SplitTime::PerPhase(ts)) => format!("{ts:.1?}"),
            None => "-".to_string(),
        };
        info!(
            algorithm = %summary.algorithm,
            trials = summary.trials,
            total_reward = summary.total_reward(),
            final_regret = summary.final_regret().unwrap_or(0.0),
            split_time = %split,
            "experiment finished"
        );
    }
}

/// Keeps every summary it is given, in order.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    summaries: Vec<ExperimentSummary>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summaries(&self) -> &[ExperimentSummary] {
        &self.summaries
    }

    pub fn into_summaries(self) -> Vec<ExperimentSummary> {
        self.summaries
    }

    /// Summary for `algorithm`, if one was reported.
    pub fn get(&self, algorithm: Algorithm) -> Option<&ExperimentSummary> {
        self.summaries.iter().find(|s| s.algorithm == algorithm)
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, summary: &ExperimentSummary) {
        self.summaries.push(summary.clone());
    }
}
