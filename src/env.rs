//! Synthetic demand: Bernoulli conversion draws per price.
//!
//! Four shapes of environment, all behind [`RewardSource`]:
//! - [`BernoulliEnvironment`]: one fixed probability per arm.
//! - [`PhasedEnvironment`]: a probability row per phase, selected by an internal clock
//!   that ticks once per draw and cycles through the phases.
//! - [`ContextualEnvironment`]: one stationary environment per context.
//! - [`PhasedContextualEnvironment`]: one phased environment per context, with all
//!   context clocks kept on the same global round count.
//!
//! Environments never own randomness; the caller passes the trial's RNG.

use rand::rngs::StdRng;
use rand::Rng;

use crate::{Error, Result};

/// A source of Bernoulli rewards.
pub trait RewardSource {
    fn n_arms(&self) -> usize;

    /// Number of contexts this source distinguishes (`1` for non-contextual sources).
    fn n_contexts(&self) -> usize {
        1
    }

    /// Draw `0.0` or `1.0` for pulling `arm` under `context`.
    ///
    /// Non-contextual sources ignore `context`.
    ///
    /// # Panics
    ///
    /// Panics if `arm` or `context` is out of range.
    fn draw(&mut self, arm: usize, context: usize, rng: &mut StdRng) -> f64;
}

fn validate_row(row: &[f64], n_arms: Option<usize>) -> Result<usize> {
    if row.is_empty() {
        return Err(Error::NoArms);
    }
    if let Some(expected) = n_arms {
        if row.len() != expected {
            return Err(Error::ShapeMismatch {
                what: "probability row",
                expected,
                actual: row.len(),
            });
        }
    }
    if let Some(&bad) = row.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(Error::InvalidProbability { value: bad });
    }
    Ok(row.len())
}

fn validate_matrix(rows: &[Vec<f64>]) -> Result<usize> {
    let first = rows.first().ok_or(Error::ShapeMismatch {
        what: "probability rows",
        expected: 1,
        actual: 0,
    })?;
    let n = validate_row(first, None)?;
    for row in &rows[1..] {
        validate_row(row, Some(n))?;
    }
    Ok(n)
}

/// Stationary Bernoulli environment.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BernoulliEnvironment {
    probabilities: Vec<f64>,
}

impl BernoulliEnvironment {
    pub fn new(probabilities: Vec<f64>) -> Result<Self> {
        validate_row(&probabilities, None)?;
        Ok(Self { probabilities })
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn sample(&self, arm: usize, rng: &mut StdRng) -> f64 {
        let p = self.probabilities[arm];
        if rng.random_bool(p) {
            1.0
        } else {
            0.0
        }
    }
}

impl RewardSource for BernoulliEnvironment {
    fn n_arms(&self) -> usize {
        self.probabilities.len()
    }

    fn draw(&mut self, arm: usize, _context: usize, rng: &mut StdRng) -> f64 {
        BernoulliEnvironment::sample(self, arm, rng)
    }
}

/// Piecewise-stationary environment with a cycling phase clock.
///
/// The clock is never reset by the environment itself: reusing one instance across
/// trials keeps moving through the phases, like an ever-running market.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhasedEnvironment {
    phases: Vec<Vec<f64>>,
    phase_len: u64,
    clock: u64,
}

impl PhasedEnvironment {
    /// `phases[k][arm]` is the conversion probability of `arm` during phase `k`.
    pub fn new(phases: Vec<Vec<f64>>, phase_len: u64) -> Result<Self> {
        if phase_len == 0 {
            return Err(Error::InvalidPhaseLength);
        }
        validate_matrix(&phases)?;
        Ok(Self {
            phases,
            phase_len,
            clock: 0,
        })
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn phase_len(&self) -> u64 {
        self.phase_len
    }

    pub fn n_phases(&self) -> usize {
        self.phases.len()
    }

    /// `floor(clock / phase_len) mod n_phases`.
    pub fn current_phase(&self) -> usize {
        ((self.clock / self.phase_len) % self.phases.len() as u64) as usize
    }

    /// Move the clock forward without drawing.
    pub fn advance(&mut self, rounds: u64) {
        self.clock = self.clock.saturating_add(rounds);
    }

    /// Sample under the current phase, then tick the clock.
    pub fn sample(&mut self, arm: usize, rng: &mut StdRng) -> f64 {
        let p = self.phases[self.current_phase()][arm];
        self.clock += 1;
        if rng.random_bool(p) {
            1.0
        } else {
            0.0
        }
    }
}

impl RewardSource for PhasedEnvironment {
    fn n_arms(&self) -> usize {
        self.phases[0].len()
    }

    fn draw(&mut self, arm: usize, _context: usize, rng: &mut StdRng) -> f64 {
        PhasedEnvironment::sample(self, arm, rng)
    }
}

/// One stationary environment per context.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextualEnvironment {
    envs: Vec<BernoulliEnvironment>,
}

impl ContextualEnvironment {
    /// `per_context[c][arm]` is the conversion probability of `arm` for context `c`.
    pub fn new(per_context: Vec<Vec<f64>>) -> Result<Self> {
        if per_context.is_empty() {
            return Err(Error::NoContexts);
        }
        validate_matrix(&per_context)?;
        let envs = per_context
            .into_iter()
            .map(BernoulliEnvironment::new)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { envs })
    }

    pub fn sample(&self, arm: usize, context: usize, rng: &mut StdRng) -> f64 {
        self.envs[context].sample(arm, rng)
    }
}

impl RewardSource for ContextualEnvironment {
    fn n_arms(&self) -> usize {
        self.envs[0].probabilities().len()
    }

    fn n_contexts(&self) -> usize {
        self.envs.len()
    }

    fn draw(&mut self, arm: usize, context: usize, rng: &mut StdRng) -> f64 {
        ContextualEnvironment::sample(self, arm, context, rng)
    }
}

/// One phased environment per context, clocks synchronized to global rounds.
///
/// Contexts are hit at random, so each draw advances every *other* context's clock by
/// one before delegating. After `n` draws every context clock has moved by exactly `n`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhasedContextualEnvironment {
    envs: Vec<PhasedEnvironment>,
}

impl PhasedContextualEnvironment {
    /// `per_context[c][phase][arm]`.
    pub fn new(per_context: Vec<Vec<Vec<f64>>>, phase_len: u64) -> Result<Self> {
        if per_context.is_empty() {
            return Err(Error::NoContexts);
        }
        let envs = per_context
            .into_iter()
            .map(|phases| PhasedEnvironment::new(phases, phase_len))
            .collect::<Result<Vec<_>>>()?;
        let n_arms = envs[0].n_arms();
        if let Some(bad) = envs.iter().find(|e| e.n_arms() != n_arms) {
            return Err(Error::ShapeMismatch {
                what: "context probability rows",
                expected: n_arms,
                actual: bad.n_arms(),
            });
        }
        Ok(Self { envs })
    }

    pub fn contexts(&self) -> &[PhasedEnvironment] {
        &self.envs
    }

    pub fn sample(&mut self, arm: usize, context: usize, rng: &mut StdRng) -> f64 {
        assert!(context < self.envs.len(), "context {context} out of range");
        for (i, e) in self.envs.iter_mut().enumerate() {
            if i != context {
                e.advance(1);
            }
        }
        self.envs[context].sample(arm, rng)
    }
}

impl RewardSource for PhasedContextualEnvironment {
    fn n_arms(&self) -> usize {
        self.envs[0].n_arms()
    }

    fn n_contexts(&self) -> usize {
        self.envs.len()
    }

    fn draw(&mut self, arm: usize, context: usize, rng: &mut StdRng) -> f64 {
        PhasedContextualEnvironment::sample(self, arm, context, rng)
    }
}
