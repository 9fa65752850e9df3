//! Summary statistics for a pipeline run.

use crate::strategy::PipelineOutput;
use crate::types::SpreadSignal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gross-exposure tolerance used when checking normalized weight rows.
pub const EXPOSURE_TOLERANCE: f64 = 1e-9;

/// Headline numbers for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub bars: usize,
    /// Bars with a non-flat signal.
    pub active_bars: usize,
    pub long_entries: usize,
    pub short_entries: usize,
    /// Compounded sum-across-instruments gross return.
    pub total_gross_return: f64,
    /// Largest Σ|weight| over all rows; 1.0 whenever the pair ever traded.
    pub max_gross_exposure: f64,
    /// Rows with a non-flat signal whose gross exposure is not 1.
    pub exposure_violations: usize,
}

impl PipelineSummary {
    pub fn from_output(output: &PipelineOutput) -> Self {
        let signals: Vec<SpreadSignal> = output
            .signals
            .rows()
            .iter()
            .map(|row| row.first().copied().map(SpreadSignal::from_value).unwrap_or_default())
            .collect();

        let mut long_entries = 0;
        let mut short_entries = 0;
        let mut previous = SpreadSignal::Flat;
        for &signal in &signals {
            if signal != previous {
                match signal {
                    SpreadSignal::Long => long_entries += 1,
                    SpreadSignal::Short => short_entries += 1,
                    SpreadSignal::Flat => {}
                }
            }
            previous = signal;
        }

        let exposures: Vec<f64> = (0..output.weights.len())
            .map(|t| output.weights.row_abs_sum(t))
            .collect();
        let exposure_violations = signals
            .iter()
            .zip(&exposures)
            .filter(|(s, e)| s.is_active() && (**e - 1.0).abs() > EXPOSURE_TOLERANCE && **e != 0.0)
            .count();

        let total_gross_return = output
            .returns
            .row_sums()
            .iter()
            .fold(1.0, |equity, r| equity * (1.0 + r))
            - 1.0;

        Self {
            bars: signals.len(),
            active_bars: signals.iter().filter(|s| s.is_active()).count(),
            long_entries,
            short_entries,
            total_gross_return,
            max_gross_exposure: exposures.iter().copied().fold(0.0, f64::max),
            exposure_violations,
        }
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bars:               {}", self.bars)?;
        writeln!(
            f,
            "Active bars:        {} ({:.1}%)",
            self.active_bars,
            if self.bars == 0 {
                0.0
            } else {
                100.0 * self.active_bars as f64 / self.bars as f64
            }
        )?;
        writeln!(f, "Long entries:       {}", self.long_entries)?;
        writeln!(f, "Short entries:      {}", self.short_entries)?;
        writeln!(f, "Gross return:       {:.4}%", self.total_gross_return * 100.0)?;
        write!(f, "Max gross exposure: {:.4}", self.max_gross_exposure)
    }
}
