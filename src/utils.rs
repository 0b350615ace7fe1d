//! Utility helpers: phase length, window sizing.

/// Rounds per demand phase for a run of `horizon` rounds split into `n_phases` phases.
///
/// Never returns zero, so it is always safe to divide by.
pub fn phase_length(horizon: usize, n_phases: usize) -> usize {
    (horizon / n_phases.max(1)).max(1)
}

/// Suggest a sliding-window length for a run with a known number of demand changes.
///
/// Uses the SW-UCB scaling `tau = 2 * sqrt(T ln T / Υ_T)` from Garivier & Moulines 2008
/// (arXiv:0805.3415), where `T` is the horizon and `Υ_T` the number of breakpoints.
/// The result is clamped to `[1, horizon]`.
///
/// # Example
///
/// ```rust
/// use pricing_bandits::suggested_window_size;
///
/// // 6000 rounds, three changes of demand (four seasons).
/// let w = suggested_window_size(6000, 3);
/// assert!(w > 0 && w <= 6000);
/// ```
pub fn suggested_window_size(horizon: usize, n_changes: usize) -> usize {
    if horizon <= 1 {
        return 1;
    }
    let t = horizon as f64;
    let changes = n_changes.max(1) as f64;
    let tau = 2.0 * (t * t.ln() / changes).sqrt();
    (tau.round() as usize).clamp(1, horizon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_length_never_zero() {
        assert_eq!(phase_length(6000, 4), 1500);
        assert_eq!(phase_length(3, 4), 1);
        assert_eq!(phase_length(10, 0), 10);
    }

    #[test]
    fn suggested_window_shrinks_with_more_changes() {
        let few = suggested_window_size(10_000, 1);
        let many = suggested_window_size(10_000, 20);
        assert!(many < few, "many={many} few={few}");
        assert_eq!(suggested_window_size(0, 3), 1);
        assert!(suggested_window_size(50, 1) <= 50);
    }
}
