//! Time × instrument matrices.
//!
//! A [`Frame`] is the shape every pipeline stage hands to the next: signals,
//! hedge ratios, target weights, positions and returns are all frames keyed
//! by the panel's time index and instrument symbols.

use crate::error::{PairsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dense row-major matrix with a time index and labelled columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    index: Vec<DateTime<Utc>>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl Frame {
    /// Build a frame, checking that `values` is `index.len()` rows of
    /// `columns.len()` values each.
    pub fn new(
        index: Vec<DateTime<Utc>>,
        columns: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if values.len() != index.len() {
            return Err(PairsError::InvalidInput(format!(
                "frame has {} rows but index has {} timestamps",
                values.len(),
                index.len()
            )));
        }
        if let Some((t, row)) = values
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(PairsError::InvalidInput(format!(
                "row {} has {} values, expected {}",
                t,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// All-zero frame.
    pub fn zeros(index: Vec<DateTime<Utc>>, columns: Vec<String>) -> Self {
        let values = vec![vec![0.0; columns.len()]; index.len()];
        Self {
            index,
            columns,
            values,
        }
    }

    /// Replicate a scalar series across the instrument axis.
    pub fn broadcast(
        index: Vec<DateTime<Utc>>,
        columns: Vec<String>,
        series: &[f64],
    ) -> Result<Self> {
        if series.len() != index.len() {
            return Err(PairsError::InvalidInput(format!(
                "series has {} values but index has {} timestamps",
                series.len(),
                index.len()
            )));
        }
        let width = columns.len();
        let values = series.iter().map(|&v| vec![v; width]).collect();
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    pub fn row(&self, t: usize) -> &[f64] {
        &self.values[t]
    }

    pub fn get(&self, t: usize, j: usize) -> f64 {
        self.values[t][j]
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of instruments.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Values of one instrument over time.
    pub fn column(&self, symbol: &str) -> Option<Vec<f64>> {
        let j = self.columns.iter().position(|c| c == symbol)?;
        Some(self.values.iter().map(|row| row[j]).collect())
    }

    /// Sum of absolute values in row `t`.
    pub fn row_abs_sum(&self, t: usize) -> f64 {
        self.values[t].iter().map(|v| v.abs()).sum()
    }

    /// Shift rows forward by `periods`; vacated leading rows are zero.
    pub fn shift(&self, periods: usize) -> Self {
        let width = self.width();
        let values = (0..self.len())
            .map(|t| {
                if t >= periods {
                    self.values[t - periods].clone()
                } else {
                    vec![0.0; width]
                }
            })
            .collect();
        Self {
            index: self.index.clone(),
            columns: self.columns.clone(),
            values,
        }
    }

    /// True when both frames share index and columns.
    pub fn is_aligned_with(&self, other: &Frame) -> bool {
        self.index == other.index && self.columns == other.columns
    }

    /// Row-wise sum across instruments.
    pub fn row_sums(&self) -> Vec<f64> {
        self.values.iter().map(|row| row.iter().sum()).collect()
    }
}
