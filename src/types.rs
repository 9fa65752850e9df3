//! Core data types shared across the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV bar for one instrument and one period, as read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Validate that bar data is consistent.
    pub fn validate(&self) -> bool {
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Price field of a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    Open,
    Close,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Open => write!(f, "Open"),
            Field::Close => write!(f, "Close"),
        }
    }
}

/// Discrete position on the spread.
///
/// Long the spread means buying the hedge-ratio combination, short means
/// selling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpreadSignal {
    Long,
    #[default]
    Flat,
    Short,
}

impl SpreadSignal {
    /// Numeric value in {-1, 0, +1}.
    pub fn value(self) -> f64 {
        match self {
            SpreadSignal::Long => 1.0,
            SpreadSignal::Flat => 0.0,
            SpreadSignal::Short => -1.0,
        }
    }

    /// Inverse of [`SpreadSignal::value`]. Anything that is not ±1 maps to flat.
    pub fn from_value(value: f64) -> Self {
        if value == 1.0 {
            SpreadSignal::Long
        } else if value == -1.0 {
            SpreadSignal::Short
        } else {
            SpreadSignal::Flat
        }
    }

    pub fn is_active(self) -> bool {
        self != SpreadSignal::Flat
    }
}

impl fmt::Display for SpreadSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadSignal::Long => write!(f, "LONG"),
            SpreadSignal::Flat => write!(f, "FLAT"),
            SpreadSignal::Short => write!(f, "SHORT"),
        }
    }
}
