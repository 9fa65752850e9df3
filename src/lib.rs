//! Pairs Pipeline - rolling cointegration signals for pairs trading.
//!
//! # Overview
//!
//! Given a panel of Open/Close prices for two (or more) co-moving
//! instruments, the pipeline:
//!
//! 1. estimates a hedge ratio per bar with the Johansen procedure on the
//!    preceding `lookback_window` closes ([`hedge`], [`johansen`]),
//! 2. forms the hedge-ratio-weighted spread and its Bollinger Bands
//!    ([`spread`]),
//! 3. turns band crossings into a long/flat/short signal with hysteresis
//!    ([`signal`]),
//! 4. converts the signal into gross-exposure-normalized weights, lags them
//!    into positions and computes open-to-open gross returns ([`weights`]).
//!
//! Everything is recomputed from the full panel on each run; the only state
//! carried between stages is the hedge ratio frame cached by
//! [`strategy::PairsStrategy`].
//!
//! # Quick Start
//!
//! ```no_run
//! use pairs_pipeline::{
//!     config::PairsConfig,
//!     data::{load_panel, DataConfig},
//!     strategy::{PairsStrategy, SignalPipeline},
//! };
//!
//! let panel = load_panel(
//!     &[("GDX", "data/GDX.csv"), ("GLD", "data/GLD.csv")],
//!     &DataConfig::default(),
//! )
//! .unwrap();
//!
//! let mut strategy = PairsStrategy::new(PairsConfig::new(20, 1.0)).unwrap();
//! let output = strategy.run(&panel).unwrap();
//!
//! println!("{}", pairs_pipeline::PipelineSummary::from_output(&output));
//! ```
//!
//! # Modules
//!
//! - [`types`]: Bars, price fields and the spread signal
//! - [`data`]: Price panels, CSV loading, rolling-window helpers
//! - [`frame`]: Time × instrument matrices passed between stages
//! - [`johansen`]: Johansen eigen-decomposition
//! - [`hedge`]: Windowed hedge ratio estimator and rolling stream
//! - [`spread`]: Spread and Bollinger Bands
//! - [`signal`]: Band-crossing state machine
//! - [`weights`]: Target weights, positions, gross returns
//! - [`strategy`]: `SignalPipeline` trait and `PairsStrategy`
//! - [`config`]: Runtime and TOML configuration
//! - [`analytics`]: Run summaries
//! - [`export`]: CSV/JSON export

pub mod analytics;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod frame;
pub mod hedge;
pub mod johansen;
pub mod signal;
pub mod spread;
pub mod strategy;
pub mod types;
pub mod weights;

pub use analytics::PipelineSummary;
pub use config::{PairsConfig, PairsFileConfig};
pub use data::{load_csv, load_panel, DataConfig, PricePanel};
pub use error::{JohansenError, PairsError, Result};
pub use frame::Frame;
pub use hedge::{rolling_hedge_ratios, HedgeRatioEstimator, MIN_WINDOW_COVERAGE};
pub use johansen::{johansen, JohansenResult};
pub use signal::{generate_signals, SignalStateMachine};
pub use spread::{compute_spread, BandPoint, SpreadBands};
pub use strategy::{PairsStrategy, PipelineOutput, SignalPipeline};
pub use types::{Bar, Field, SpreadSignal};
pub use weights::{gross_returns, positions, target_weights};
