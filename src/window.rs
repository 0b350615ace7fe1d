//! Sliding window over per-arm observation slots.
//!
//! Every round appends one slot to **every** arm: the observed reward for the pulled arm
//! and an empty slot (`None`) for the rest. Only the last `window_size` slots are live,
//! so an arm that was not pulled recently has no live samples even if it was pulled
//! often long ago. Storage never exceeds `window_size` slots per arm.

use std::collections::VecDeque;

use crate::{Error, Result};

/// Bounded trailing history of the last `window_size` rounds, per arm.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlidingWindow {
    window_size: usize,
    slots: Vec<VecDeque<Option<f64>>>,
    rounds: u64,
}

impl SlidingWindow {
    /// Create an empty window over `n_arms` arms.
    pub fn new(window_size: usize, n_arms: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::InvalidWindowSize);
        }
        if n_arms == 0 {
            return Err(Error::NoArms);
        }
        Ok(Self {
            window_size,
            slots: vec![VecDeque::with_capacity(window_size); n_arms],
            rounds: 0,
        })
    }

    /// Number of trailing rounds considered live.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn n_arms(&self) -> usize {
        self.slots.len()
    }

    /// Rounds pushed since creation or the last [`reset`](Self::reset).
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Record one round: `raw_reward` for `arm`, an empty slot for every other arm.
    ///
    /// # Panics
    ///
    /// Panics if `arm` is out of range.
    pub fn push(&mut self, arm: usize, raw_reward: f64) {
        assert!(arm < self.slots.len(), "arm {arm} out of range");
        for (i, row) in self.slots.iter_mut().enumerate() {
            if row.len() == self.window_size {
                row.pop_front();
            }
            row.push_back((i == arm).then_some(raw_reward));
        }
        self.rounds += 1;
    }

    /// Per-arm rewards observed within the live window, oldest first.
    pub fn live_samples(&self) -> Vec<Vec<f64>> {
        self.slots
            .iter()
            .map(|row| row.iter().flatten().copied().collect())
            .collect()
    }

    /// Per-arm number of live samples.
    pub fn live_counts(&self) -> Vec<u64> {
        self.slots
            .iter()
            .map(|row| row.iter().filter(|s| s.is_some()).count() as u64)
            .collect()
    }

    /// Forget all history.
    pub fn reset(&mut self) {
        for row in &mut self.slots {
            row.clear();
        }
        self.rounds = 0;
    }
}
