//! Trial harness: run one algorithm for many trials against a persistent environment.
//!
//! A [`TrialRunner`] owns a [`RewardSource`] for its whole lifetime. Each trial builds a
//! fresh learner from the [`Algorithm`] (fresh state, fresh seeds) but keeps drawing
//! from the same source, so a phased environment's clock keeps running across trials.
//!
//! Notes:
//! - Every trial gets its own `StdRng` (context draws, Bernoulli draws), derived from the
//!   runner seed and the trial index. Estimators get their own derived seeds as well.
//! - Trials run serially; the shared environment clock makes their order observable.
//! - Contextual regret is computed per trial against the optimum of the context that
//!   actually arrived each round, then averaged. Plain regret is computed on the
//!   trial-averaged reward trace.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use crate::{
    derive_seed, phase_length, Algorithm, Error, Estimator, ExperimentSummary, Learner, Optimum,
    Result, RewardSource, SplitMode, SplitTime,
};

/// Snapshot of one finished trial.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrialResult {
    /// Monetary reward per round.
    pub rewards: Vec<f64>,
    /// Context that arrived each round (all zero for non-contextual sources).
    pub contexts: Vec<usize>,
    /// Final per-arm means of the acting (or aggregate) estimator.
    pub arm_means: Vec<f64>,
    pub arm_bounds: Vec<f64>,
    /// `[context][arm]`, contextual learners only.
    pub context_arm_means: Vec<Vec<f64>>,
    pub context_arm_bounds: Vec<Vec<f64>>,
    /// Reported split round (stationary adaptive controllers only).
    pub split_time: Option<u64>,
    /// Phase-relative split offsets (phased adaptive controllers only).
    pub phase_split_times: Vec<u64>,
}

fn means_and_bounds<E: Estimator + ?Sized>(e: &E) -> (Vec<f64>, Vec<f64>) {
    (0..e.n_arms())
        .map(|arm| (e.mean_estimate(arm), e.confidence_bound(arm)))
        .unzip()
}

fn column_mean<'a>(rows: impl Iterator<Item = &'a [f64]>) -> Vec<f64> {
    let mut sum: Vec<f64> = Vec::new();
    let mut n = 0usize;
    for row in rows {
        if sum.len() < row.len() {
            sum.resize(row.len(), 0.0);
        }
        for (s, v) in sum.iter_mut().zip(row) {
            *s += v;
        }
        n += 1;
    }
    if n > 0 {
        sum.iter_mut().for_each(|s| *s /= n as f64);
    }
    sum
}

fn cumsum(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Repeated trials of one algorithm.
pub struct TrialRunner {
    algorithm: Algorithm,
    source: Box<dyn RewardSource>,
    prices: Vec<f64>,
    horizon: usize,
    window_size: Option<usize>,
    seed: u64,
    results: Vec<TrialResult>,
}

impl std::fmt::Debug for TrialRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrialRunner")
            .field("algorithm", &self.algorithm)
            .field("horizon", &self.horizon)
            .field("trials", &self.results.len())
            .finish()
    }
}

impl TrialRunner {
    /// Runner for `algorithm` over `horizon` rounds per trial.
    ///
    /// `prices` must have one entry per arm of `source`.
    pub fn new(
        algorithm: Algorithm,
        source: Box<dyn RewardSource>,
        prices: Vec<f64>,
        horizon: usize,
    ) -> Result<Self> {
        if horizon == 0 {
            return Err(Error::InvalidHorizon);
        }
        if prices.len() != source.n_arms() {
            return Err(Error::PriceCountMismatch {
                arms: source.n_arms(),
                prices: prices.len(),
            });
        }
        Ok(Self {
            algorithm,
            source,
            prices,
            horizon,
            window_size: None,
            seed: 0,
            results: Vec::new(),
        })
    }

    /// Window length for windowed algorithms.
    pub fn with_window_size(mut self, window_size: Option<usize>) -> Self {
        self.window_size = window_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn results(&self) -> &[TrialResult] {
        &self.results
    }

    /// Run one full trial and keep its snapshot.
    pub fn run_trial(&mut self) -> Result<&TrialResult> {
        let index = self.results.len() as u64;
        let trial_seed = derive_seed(self.seed, "trial", index);
        let mut rng = StdRng::seed_from_u64(trial_seed);
        let n_contexts = self.source.n_contexts();

        let mut learner = self.algorithm.build(
            &self.prices,
            self.horizon,
            self.window_size,
            n_contexts,
            |i| derive_seed(trial_seed, "estimator", i),
        )?;

        let mut contexts = Vec::with_capacity(self.horizon);
        for _ in 0..self.horizon {
            let context = if n_contexts > 1 {
                rng.random_range(0..n_contexts)
            } else {
                0
            };
            match &mut learner {
                Learner::Plain(est) => {
                    let arm = est.select_arm();
                    let reward = self.source.draw(arm, context, &mut rng);
                    est.record(arm, reward);
                }
                Learner::Contextual(ctl) => {
                    let choices = ctl.select_arm(context);
                    let arm = ctl.act_on(choices);
                    let reward = self.source.draw(arm, context, &mut rng);
                    ctl.record(arm, reward, context);
                    if ctl.split_test_due() {
                        ctl.check_split();
                    }
                }
            }
            contexts.push(context);
        }

        let result = match learner {
            Learner::Plain(est) => {
                let (arm_means, arm_bounds) = means_and_bounds(&est);
                TrialResult {
                    rewards: est.total_rewards().to_vec(),
                    contexts,
                    arm_means,
                    arm_bounds,
                    ..TrialResult::default()
                }
            }
            Learner::Contextual(ctl) => {
                let (arm_means, arm_bounds) = means_and_bounds(ctl.aggregate());
                let (context_arm_means, context_arm_bounds): (Vec<_>, Vec<_>) =
                    ctl.contexts().iter().map(means_and_bounds).unzip();
                let adaptive = ctl.mode() == SplitMode::Adaptive;
                TrialResult {
                    rewards: ctl.aggregate().total_rewards().to_vec(),
                    contexts,
                    arm_means,
                    arm_bounds,
                    context_arm_means,
                    context_arm_bounds,
                    split_time: (adaptive && !ctl.is_phased()).then(|| ctl.reported_split_time()),
                    phase_split_times: ctl.phase_split_times().to_vec(),
                }
            }
        };
        trace!(
            algorithm = %self.algorithm,
            trial = index,
            reward = result.rewards.iter().sum::<f64>(),
            "trial finished"
        );
        self.results.push(result);
        Ok(&self.results[self.results.len() - 1])
    }

    /// Run `n_trials` more trials.
    pub fn run_experiment(&mut self, n_trials: usize) -> Result<()> {
        for _ in 0..n_trials {
            self.run_trial()?;
        }
        Ok(())
    }

    /// Per-round reward averaged across trials.
    pub fn reward_in_time(&self) -> Vec<f64> {
        column_mean(self.results.iter().map(|r| r.rewards.as_slice()))
    }

    /// Cumulative regret per round against `optimum`, averaged across trials.
    ///
    /// Phases last `horizon / optimum.n_phases()` rounds, counted from the trial start.
    pub fn regret_in_time(&self, optimum: &Optimum) -> Vec<f64> {
        let phase_len = phase_length(self.horizon, optimum.n_phases());
        if self.algorithm.is_contextual() {
            let per_trial: Vec<Vec<f64>> = self
                .results
                .iter()
                .map(|r| {
                    r.rewards
                        .iter()
                        .zip(&r.contexts)
                        .enumerate()
                        .map(|(round, (reward, &ctx))| {
                            optimum.context_at(ctx, round, phase_len) - reward
                        })
                        .collect()
                })
                .collect();
            cumsum(column_mean(per_trial.iter().map(Vec::as_slice)))
        } else {
            let avg = self.reward_in_time();
            cumsum(
                avg.iter()
                    .enumerate()
                    .map(|(round, r)| optimum.aggregate_at(round, phase_len) - r),
            )
        }
    }

    /// Final per-arm means averaged across trials.
    pub fn arm_estimates(&self) -> Vec<f64> {
        column_mean(self.results.iter().map(|r| r.arm_means.as_slice()))
    }

    /// Final per-arm confidence bounds averaged across trials.
    pub fn arm_bound_estimates(&self) -> Vec<f64> {
        column_mean(self.results.iter().map(|r| r.arm_bounds.as_slice()))
    }

    /// `[context][arm]` final means averaged across trials.
    pub fn context_arm_estimates(&self) -> Vec<Vec<f64>> {
        self.per_context(|r| &r.context_arm_means)
    }

    /// `[context][arm]` final bounds averaged across trials.
    pub fn context_arm_bound_estimates(&self) -> Vec<Vec<f64>> {
        self.per_context(|r| &r.context_arm_bounds)
    }

    fn per_context(&self, pick: impl Fn(&TrialResult) -> &Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        let n = self.results.first().map_or(0, |r| pick(r).len());
        (0..n)
            .map(|c| {
                let rows = self.results.iter().filter_map(|r| pick(r).get(c));
                column_mean(rows.map(Vec::as_slice))
            })
            .collect()
    }

    /// Average split time across trials, for adaptive contextual algorithms.
    ///
    /// Phased controllers report one average per phase, over the phases every trial
    /// completed.
    pub fn average_split_time(&self) -> Option<SplitTime> {
        if self.results.is_empty() {
            return None;
        }
        let once: Vec<u64> = self.results.iter().filter_map(|r| r.split_time).collect();
        if !once.is_empty() {
            let mean = once.iter().sum::<u64>() as f64 / once.len() as f64;
            return Some(SplitTime::Once(mean));
        }
        let phases = self
            .results
            .iter()
            .map(|r| r.phase_split_times.len())
            .min()
            .unwrap_or(0);
        if phases == 0 {
            return None;
        }
        let n = self.results.len() as f64;
        let per_phase = (0..phases)
            .map(|k| {
                self.results
                    .iter()
                    .map(|r| r.phase_split_times[k] as f64)
                    .sum::<f64>()
                    / n
            })
            .collect();
        Some(SplitTime::PerPhase(per_phase))
    }

    /// Everything a reporter needs, averaged over the trials run so far.
    pub fn summary(&self, optimum: &Optimum) -> ExperimentSummary {
        let estimates = self.algorithm.reports_estimates();
        ExperimentSummary {
            algorithm: self.algorithm,
            trials: self.results.len(),
            rewards: self.reward_in_time(),
            cumulative_regret: self.regret_in_time(optimum),
            arm_means: estimates.then(|| self.arm_estimates()),
            arm_bounds: estimates.then(|| self.arm_bound_estimates()),
            context_arm_means: if estimates {
                self.context_arm_estimates()
            } else {
                Vec::new()
            },
            context_arm_bounds: if estimates {
                self.context_arm_bound_estimates()
            } else {
                Vec::new()
            },
            split_time: self.average_split_time(),
        }
    }
}
