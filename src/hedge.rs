//! Hedge ratio estimation on a rolling window.
//!
//! [`HedgeRatioEstimator`] turns one window of Close prices into a weight per
//! instrument; [`rolling_hedge_ratios`] drives it over every step of a panel
//! using only the bars strictly before that step.

use crate::data::PricePanel;
use crate::error::{JohansenError, PairsError, Result};
use crate::frame::Frame;
use crate::johansen::johansen;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Fraction of the lookback window that must be complete rows before estimating.
pub const MIN_WINDOW_COVERAGE: f64 = 0.75;

/// Johansen-based hedge ratio for a window of Close prices.
#[derive(Debug, Clone, PartialEq)]
pub struct HedgeRatioEstimator {
    lookback_window: usize,
    min_coverage: f64,
}

impl HedgeRatioEstimator {
    pub fn new(lookback_window: usize) -> Self {
        Self {
            lookback_window,
            min_coverage: MIN_WINDOW_COVERAGE,
        }
    }

    /// Override the required fraction of complete rows.
    pub fn with_min_coverage(mut self, min_coverage: f64) -> Self {
        self.min_coverage = min_coverage;
        self
    }

    pub fn lookback_window(&self) -> usize {
        self.lookback_window
    }

    /// Complete rows needed before a window is estimated at all.
    pub fn min_observations(&self) -> f64 {
        self.lookback_window as f64 * self.min_coverage
    }

    /// Estimate the hedge ratio for one window.
    ///
    /// Rows with a missing price on any instrument are dropped. Windows left
    /// with too few rows yield a zero vector of length `width`; otherwise the
    /// leading Johansen eigenvector is returned in instrument order.
    pub fn estimate(
        &self,
        window: &[Vec<Option<f64>>],
        width: usize,
    ) -> std::result::Result<Vec<f64>, JohansenError> {
        let complete: Vec<Vec<f64>> = window
            .iter()
            .filter_map(|row| row.iter().copied().collect::<Option<Vec<f64>>>())
            .collect();

        if (complete.len() as f64) < self.min_observations() {
            return Ok(vec![0.0; width]);
        }

        let levels = DMatrix::from_fn(complete.len(), width, |i, j| complete[i][j]);
        Ok(johansen(&levels)?.leading_vector())
    }
}

/// Hedge ratio for every step of `panel`, estimated on Close rows
/// `[t - lookback, t)`.
///
/// Steps before a full lookback exists see an empty window and get a zero
/// vector.
///
/// With `parallel` set, steps are spread over the rayon pool. Results are
/// always assembled in time order and the earliest failing step is reported.
pub fn rolling_hedge_ratios(
    panel: &PricePanel,
    estimator: &HedgeRatioEstimator,
    parallel: bool,
) -> Result<Frame> {
    let started = Instant::now();
    let closes = panel.closes();
    let width = panel.width();
    let lookback = estimator.lookback_window();

    let step = |t: usize| match t.checked_sub(lookback) {
        Some(start) => estimator.estimate(&closes[start..t], width),
        None => estimator.estimate(&[], width),
    };

    let estimates: Vec<std::result::Result<Vec<f64>, JohansenError>> = if parallel {
        (0..panel.len()).into_par_iter().map(step).collect()
    } else {
        (0..panel.len()).map(step).collect()
    };

    let rows = estimates
        .into_iter()
        .enumerate()
        .map(|(t, estimate)| {
            estimate.map_err(|source| PairsError::HedgeRatio {
                step: t,
                timestamp: panel.index()[t],
                source,
            })
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let flat_steps = rows.iter().filter(|r| r.iter().all(|v| *v == 0.0)).count();
    debug!("{} of {} steps had insufficient data", flat_steps, rows.len());
    info!(
        "Estimated {} hedge ratios (window {}, parallel: {}) in {:?}",
        rows.len(),
        lookback,
        parallel,
        started.elapsed()
    );

    Frame::new(panel.index().to_vec(), panel.symbols().to_vec(), rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(i: usize) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(i as i64)
    }

    fn wobble(i: usize, k: f64) -> f64 {
        (i as f64 * k).sin() + 0.5 * (i as f64 * k * 2.3).cos()
    }

    fn pair_panel(n: usize) -> PricePanel {
        let mut a = 100.0;
        let mut close = Vec::with_capacity(n);
        for i in 0..n {
            a += wobble(i, 0.37);
            let b = 2.0 * a + 0.4 * wobble(i, 1.9);
            close.push(vec![Some(a), Some(b)]);
        }
        PricePanel::new(
            (0..n).map(day).collect(),
            vec!["A".to_string(), "B".to_string()],
            close.clone(),
            close,
        )
        .unwrap()
    }

    #[test]
    fn test_insufficient_window_is_zero_vector() {
        let estimator = HedgeRatioEstimator::new(20);
        let window: Vec<Vec<Option<f64>>> = (0..20)
            .map(|i| {
                if i % 3 == 0 {
                    vec![Some(1.0 + i as f64), None]
                } else {
                    vec![Some(1.0 + i as f64), Some(2.0 + i as f64)]
                }
            })
            .collect();
        // 13 complete rows < 15 required
        assert_eq!(estimator.estimate(&window, 2).unwrap(), vec![0.0, 0.0]);
        assert_eq!(estimator.estimate(&[], 2).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_min_coverage_override() {
        let estimator = HedgeRatioEstimator::new(20).with_min_coverage(0.5);
        assert_eq!(estimator.min_observations(), 10.0);
    }

    #[test]
    fn test_rolling_excludes_current_bar() {
        let panel = pair_panel(60);
        let estimator = HedgeRatioEstimator::new(20);
        let ratios = rolling_hedge_ratios(&panel, &estimator, false).unwrap();

        assert_eq!(ratios.len(), 60);
        for t in 0..20 {
            assert_eq!(ratios.row(t), &[0.0, 0.0]);
        }

        let first = estimator.estimate(&panel.closes()[0..20], 2).unwrap();
        assert_eq!(ratios.row(20), first.as_slice());

        let direct = estimator.estimate(&panel.closes()[20..40], 2).unwrap();
        assert_eq!(ratios.row(40), direct.as_slice());
    }

    #[test]
    fn test_warm_up_ignores_covered_partial_windows() {
        // 16 prior bars would pass coverage, but no full lookback exists yet.
        let panel = pair_panel(40);
        let estimator = HedgeRatioEstimator::new(20);
        assert!(estimator.estimate(&panel.closes()[0..16], 2).unwrap()[0] != 0.0);

        for parallel in [false, true] {
            let ratios = rolling_hedge_ratios(&panel, &estimator, parallel).unwrap();
            let warm: Vec<usize> = (0..20)
                .filter(|&t| ratios.row(t).iter().any(|v| *v != 0.0))
                .collect();
            assert!(warm.is_empty(), "estimated during warm-up at {:?}", warm);
            assert!(ratios.row(20).iter().all(|v| *v != 0.0));
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let panel = pair_panel(80);
        let estimator = HedgeRatioEstimator::new(20);
        let serial = rolling_hedge_ratios(&panel, &estimator, false).unwrap();
        let parallel = rolling_hedge_ratios(&panel, &estimator, true).unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn test_degenerate_window_fails_run() {
        let n = 30;
        let flat = vec![vec![Some(10.0), Some(20.0)]; n];
        let panel = PricePanel::new(
            (0..n).map(day).collect(),
            vec!["A".to_string(), "B".to_string()],
            flat.clone(),
            flat,
        )
        .unwrap();

        let err = rolling_hedge_ratios(&panel, &HedgeRatioEstimator::new(20), true).unwrap_err();
        match err {
            PairsError::HedgeRatio { step, .. } => assert_eq!(step, 20),
            other => panic!("unexpected error: {other}"),
        }
    }
}
