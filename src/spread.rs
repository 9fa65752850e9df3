//! Synthetic spread and its Bollinger Bands.

use crate::data::{forward_fill, rolling_mean, rolling_std};
use crate::error::{PairsError, Result};
use crate::frame::Frame;
use serde::{Deserialize, Serialize};

/// Spread[t] = Σ Close[t, j] × HedgeRatio[t, j].
///
/// Missing when any instrument's close is missing at `t`.
pub fn compute_spread(
    closes: &[Vec<Option<f64>>],
    hedge_ratios: &Frame,
) -> Result<Vec<Option<f64>>> {
    if closes.len() != hedge_ratios.len() {
        return Err(PairsError::InvalidInput(format!(
            "{} close rows but {} hedge ratio rows",
            closes.len(),
            hedge_ratios.len()
        )));
    }

    Ok(closes
        .iter()
        .zip(hedge_ratios.rows())
        .map(|(close, ratio)| {
            close
                .iter()
                .zip(ratio)
                .map(|(c, h)| c.map(|c| c * h))
                .sum::<Option<f64>>()
        })
        .collect())
}

/// One step of spread and band values, as consumed by the signal state machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandPoint {
    pub spread: Option<f64>,
    pub mean: Option<f64>,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

/// Rolling mean and ± k·std bands over a spread series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadBands {
    /// Raw spread; entry and exit tests compare against this.
    pub spread: Vec<Option<f64>>,
    pub mean: Vec<Option<f64>>,
    pub std: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl SpreadBands {
    /// Bands over the forward-filled spread with a trailing `period` window
    /// and sample standard deviation.
    pub fn new(spread: Vec<Option<f64>>, period: usize, num_std: f64) -> Self {
        let filled = forward_fill(&spread);
        let mean = rolling_mean(&filled, period);
        let std = rolling_std(&filled, period);

        let band = |sign: f64| -> Vec<Option<f64>> {
            mean.iter()
                .zip(&std)
                .map(|(&m, &s)| Some(m? + sign * num_std * s?))
                .collect()
        };
        let upper = band(1.0);
        let lower = band(-1.0);

        Self {
            spread,
            mean,
            std,
            upper,
            lower,
        }
    }

    pub fn len(&self) -> usize {
        self.spread.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spread.is_empty()
    }

    pub fn at(&self, t: usize) -> BandPoint {
        BandPoint {
            spread: self.spread[t],
            mean: self.mean[t],
            upper: self.upper[t],
            lower: self.lower[t],
        }
    }

    pub fn points(&self) -> impl Iterator<Item = BandPoint> + '_ {
        (0..self.len()).map(|t| self.at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_spread_is_weighted_sum() {
        let index = vec![
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        ];
        let ratios = Frame::new(
            index,
            vec!["A".to_string(), "B".to_string()],
            vec![vec![1.0, -0.5], vec![2.0, -1.0]],
        )
        .unwrap();
        let closes = vec![vec![Some(10.0), Some(18.0)], vec![Some(10.0), None]];

        let spread = compute_spread(&closes, &ratios).unwrap();
        assert_eq!(spread, vec![Some(1.0), None]);
    }

    #[test]
    fn test_bands_bracket_mean() {
        let spread: Vec<Option<f64>> = (0..30).map(|i| Some((i as f64 * 0.8).sin())).collect();
        let bands = SpreadBands::new(spread, 10, 1.5);

        assert!(bands.mean[8].is_none());
        for t in 9..30 {
            let p = bands.at(t);
            assert!(p.lower.unwrap() <= p.mean.unwrap());
            assert!(p.mean.unwrap() <= p.upper.unwrap());
        }
    }

    #[test]
    fn test_missing_spread_is_forward_filled_for_stats_only() {
        let spread = vec![Some(1.0), Some(2.0), None, Some(4.0)];
        let bands = SpreadBands::new(spread, 3, 1.0);

        // Window at t=2 is [1, 2, 2] after forward fill
        assert!((bands.mean[2].unwrap() - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(bands.at(2).spread, None);
        assert_eq!(bands.points().count(), 4);
    }
}
