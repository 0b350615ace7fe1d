//! Sliding-window decorator for non-stationary demand.
//!
//! [`Windowed`] wraps any [`Refit`] estimator. Each observation is recorded on the inner
//! estimator as usual (counters, reward trace), pushed into a [`SlidingWindow`], and then
//! the inner statistics are rebuilt from the window's live samples. Rebuilding from
//! scratch is what makes old samples drop out exactly when they leave the window.

use crate::{Estimator, LearnerCore, Result, SlidingWindow};

/// Estimators whose statistics can be rebuilt from a window of live samples.
pub trait Refit: Estimator {
    /// Replace per-arm statistics with ones computed only from `live[arm]`.
    ///
    /// `pulled` is the arm observed in the round that triggered the refit.
    fn refit(&mut self, live: &[Vec<f64>], window_size: usize, pulled: usize);
}

/// An estimator that only trusts the last `window_size` observations.
#[derive(Debug, Clone)]
pub struct Windowed<E> {
    inner: E,
    window: SlidingWindow,
}

impl<E: Refit> Windowed<E> {
    pub fn new(inner: E, window_size: usize) -> Result<Self> {
        let window = SlidingWindow::new(window_size, inner.n_arms())?;
        Ok(Self { inner, window })
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }
}

impl<E: Refit> Estimator for Windowed<E> {
    fn core(&self) -> &LearnerCore {
        self.inner.core()
    }

    fn core_mut(&mut self) -> &mut LearnerCore {
        self.inner.core_mut()
    }

    fn select_arm(&mut self) -> usize {
        self.inner.select_arm()
    }

    fn record(&mut self, arm: usize, raw_reward: f64) {
        self.inner.record(arm, raw_reward);
        self.window.push(arm, raw_reward);
        let live = self.window.live_samples();
        self.inner.refit(&live, self.window.window_size(), arm);
    }

    fn mean_estimate(&self, arm: usize) -> f64 {
        self.inner.mean_estimate(arm)
    }

    fn confidence_bound(&self, arm: usize) -> f64 {
        self.inner.confidence_bound(arm)
    }
}
