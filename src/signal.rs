//! Band-crossing state machine.
//!
//! The spread signal is the sum of two independent channels stepped once per
//! bar:
//!
//! | channel | entry                  | exit                 |
//! |---------|------------------------|----------------------|
//! | long    | spread < lower → +1    | spread ≥ mean → 0    |
//! | short   | spread > upper → −1    | spread ≤ mean → 0    |
//!
//! Entry is tested before exit; when neither fires the channel keeps its
//! previous value. Comparisons against a missing value are false, so an
//! undefined band simply holds state. With lower ≤ mean ≤ upper the two
//! channels are never active together.

use crate::spread::{BandPoint, SpreadBands};
use crate::types::SpreadSignal;
use tracing::debug;

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    lt(b, a)
}

fn ge(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a >= b)
}

fn le(a: Option<f64>, b: Option<f64>) -> bool {
    ge(b, a)
}

/// Long and short channels with entry/exit hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SignalStateMachine {
    long: SpreadSignal,
    short: SpreadSignal,
}

impl SignalStateMachine {
    /// Both channels flat.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one bar and return the combined signal.
    pub fn step(&mut self, point: &BandPoint) -> SpreadSignal {
        if lt(point.spread, point.lower) {
            self.long = SpreadSignal::Long;
        } else if ge(point.spread, point.mean) {
            self.long = SpreadSignal::Flat;
        }

        if gt(point.spread, point.upper) {
            self.short = SpreadSignal::Short;
        } else if le(point.spread, point.mean) {
            self.short = SpreadSignal::Flat;
        }

        self.state()
    }

    pub fn long_channel(&self) -> SpreadSignal {
        self.long
    }

    pub fn short_channel(&self) -> SpreadSignal {
        self.short
    }

    /// Sum of both channels.
    pub fn state(&self) -> SpreadSignal {
        SpreadSignal::from_value(self.long.value() + self.short.value())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Run the state machine over every bar of `bands`.
pub fn generate_signals(bands: &SpreadBands) -> Vec<SpreadSignal> {
    let mut machine = SignalStateMachine::new();
    let mut previous = SpreadSignal::Flat;
    let mut transitions = 0;

    let signals: Vec<SpreadSignal> = bands
        .points()
        .map(|point| {
            let signal = machine.step(&point);
            if signal != previous {
                transitions += 1;
                previous = signal;
            }
            signal
        })
        .collect();

    debug!("{} signal transitions over {} bars", transitions, signals.len());
    signals
}
