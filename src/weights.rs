//! Target weights, lagged positions and gross returns.
//!
//! A signal decided with data through the close of `t` becomes a target
//! weight at `t`, a position at `t + 1`, and earns the open-to-open move
//! from `t + 1` to `t + 2`.

use crate::data::{forward_fill, PricePanel};
use crate::error::{PairsError, Result};
use crate::frame::Frame;
use tracing::debug;

fn check_aligned(frame: &Frame, panel: &PricePanel, what: &str) -> Result<()> {
    if frame.index() != panel.index() || frame.columns() != panel.symbols() {
        return Err(PairsError::InvalidInput(format!(
            "{} frame is not aligned with the price panel",
            what
        )));
    }
    Ok(())
}

/// Convert a broadcast signal matrix into gross-exposure-normalized weights.
///
/// raw[t, j] = signal[t, j] × hedge_ratio[t, j] × close[t, j], then each row
/// is divided by Σ|raw|. Rows summing to zero, and rows with a missing close
/// on any instrument, are all zero.
pub fn target_weights(signals: &Frame, hedge_ratios: &Frame, panel: &PricePanel) -> Result<Frame> {
    check_aligned(signals, panel, "signal")?;
    check_aligned(hedge_ratios, panel, "hedge ratio")?;

    let mut unpriced = 0;
    let rows = signals
        .rows()
        .iter()
        .zip(hedge_ratios.rows())
        .zip(panel.closes())
        .map(|((signal, ratio), close)| {
            let raw: Option<Vec<f64>> = signal
                .iter()
                .zip(ratio)
                .zip(close)
                .map(|((s, h), c)| c.map(|c| s * h * c))
                .collect();

            let Some(raw) = raw else {
                if signal.iter().any(|s| *s != 0.0) {
                    unpriced += 1;
                }
                return vec![0.0; signal.len()];
            };

            let total: f64 = raw.iter().map(|w| w.abs()).sum();
            if total == 0.0 || !total.is_finite() {
                vec![0.0; raw.len()]
            } else {
                raw.iter().map(|w| w / total).collect()
            }
        })
        .collect();

    if unpriced > 0 {
        debug!("Zeroed {} active rows with missing closes", unpriced);
    }

    Frame::new(panel.index().to_vec(), panel.symbols().to_vec(), rows)
}

/// Positions held during each bar: target weights shifted forward one bar.
pub fn positions(weights: &Frame) -> Frame {
    weights.shift(1)
}

/// GrossReturn[t, j] = (Open[t, j] / Open[t-1, j] − 1) × Position[t-1, j].
///
/// Opens are forward-filled before the percentage change; any change that
/// cannot be formed is zero, as is the first row.
pub fn gross_returns(positions: &Frame, panel: &PricePanel) -> Result<Frame> {
    check_aligned(positions, panel, "position")?;

    let width = panel.width();
    let opens: Vec<Vec<Option<f64>>> = (0..width)
        .map(|j| {
            let column: Vec<Option<f64>> = panel.opens().iter().map(|row| row[j]).collect();
            forward_fill(&column)
        })
        .collect();

    let rows = (0..panel.len())
        .map(|t| {
            (0..width)
                .map(|j| {
                    if t == 0 {
                        return 0.0;
                    }
                    let change = match (opens[j][t], opens[j][t - 1]) {
                        (Some(now), Some(prev)) if prev != 0.0 => now / prev - 1.0,
                        _ => 0.0,
                    };
                    change * positions.get(t - 1, j)
                })
                .collect()
        })
        .collect();

    Frame::new(panel.index().to_vec(), panel.symbols().to_vec(), rows)
}
