//! Pipeline trait and the rolling-cointegration pairs strategy.

use crate::config::PairsConfig;
use crate::data::PricePanel;
use crate::error::{PairsError, Result};
use crate::frame::Frame;
use crate::hedge::{rolling_hedge_ratios, HedgeRatioEstimator};
use crate::signal::generate_signals;
use crate::spread::{compute_spread, SpreadBands};
use crate::weights::{gross_returns, positions, target_weights};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Every matrix produced by one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub signals: Frame,
    pub weights: Frame,
    pub positions: Frame,
    pub returns: Frame,
    /// Per-step hedge ratios, when the pipeline computes them.
    pub hedge_ratios: Option<Frame>,
}

/// The four chained stages a backtest engine drives.
pub trait SignalPipeline: Send + Sync {
    fn name(&self) -> &str;

    /// Signal matrix (time × instrument) with values in {-1, 0, 1}.
    fn signals(&mut self, prices: &PricePanel) -> Result<Frame>;

    /// Target weight matrix from a signal matrix.
    fn weights(&self, signals: &Frame, prices: &PricePanel) -> Result<Frame>;

    /// Positions actually held in each period.
    fn positions(&self, weights: &Frame, prices: &PricePanel) -> Result<Frame>;

    /// Gross returns earned by the positions.
    fn returns(&self, positions: &Frame, prices: &PricePanel) -> Result<Frame>;

    /// Hedge ratios cached by the last `signals` call.
    fn hedge_ratios(&self) -> Option<&Frame> {
        None
    }

    /// Parameters as key-value pairs for logging.
    fn parameters(&self) -> Vec<(String, String)> {
        vec![]
    }

    /// Run all four stages in order.
    fn run(&mut self, prices: &PricePanel) -> Result<PipelineOutput> {
        let signals = self.signals(prices)?;
        let weights = self.weights(&signals, prices)?;
        let positions = self.positions(&weights, prices)?;
        let returns = self.returns(&positions, prices)?;
        Ok(PipelineOutput {
            signals,
            weights,
            positions,
            returns,
            hedge_ratios: self.hedge_ratios().cloned(),
        })
    }
}

/// Pairs strategy: rolling Johansen hedge ratios, Bollinger Bands on the
/// spread, and a hysteresis signal.
///
/// Hedge ratios and bands from the most recent [`SignalPipeline::signals`]
/// call are kept for the weight stage of the same run and for inspection.
#[derive(Debug, Clone)]
pub struct PairsStrategy {
    config: PairsConfig,
    estimator: HedgeRatioEstimator,
    hedge_ratios: Option<Frame>,
    bands: Option<SpreadBands>,
}

impl PairsStrategy {
    pub fn new(config: PairsConfig) -> Result<Self> {
        config.validate()?;
        let estimator =
            HedgeRatioEstimator::new(config.lookback_window).with_min_coverage(config.min_coverage);
        Ok(Self {
            config,
            estimator,
            hedge_ratios: None,
            bands: None,
        })
    }

    pub fn config(&self) -> &PairsConfig {
        &self.config
    }

    /// Spread and bands from the last `signals` call.
    pub fn bands(&self) -> Option<&SpreadBands> {
        self.bands.as_ref()
    }

    /// The configured instruments of `prices`, or all of them.
    fn traded(&self, prices: &PricePanel) -> Result<PricePanel> {
        if self.config.symbols.is_empty() {
            Ok(prices.clone())
        } else {
            prices.select(&self.config.symbols)
        }
    }
}

impl SignalPipeline for PairsStrategy {
    fn name(&self) -> &str {
        "Johansen Pairs"
    }

    fn signals(&mut self, prices: &PricePanel) -> Result<Frame> {
        self.hedge_ratios = None;
        self.bands = None;

        let prices = self.traded(prices)?;
        if prices.width() == 0 {
            return Err(PairsError::InvalidInput(
                "price panel has no instruments".to_string(),
            ));
        }

        let hedge_ratios = rolling_hedge_ratios(&prices, &self.estimator, self.config.parallel)?;
        let spread = compute_spread(prices.closes(), &hedge_ratios)?;
        let bands = SpreadBands::new(spread, self.config.lookback_window, self.config.bband_std);

        let series: Vec<f64> = generate_signals(&bands).iter().map(|s| s.value()).collect();
        let active = series.iter().filter(|v| **v != 0.0).count();
        info!(
            "{}: {} of {} bars in the market",
            self.name(),
            active,
            series.len()
        );

        let signals =
            Frame::broadcast(prices.index().to_vec(), prices.symbols().to_vec(), &series)?;
        self.hedge_ratios = Some(hedge_ratios);
        self.bands = Some(bands);
        Ok(signals)
    }

    fn weights(&self, signals: &Frame, prices: &PricePanel) -> Result<Frame> {
        let hedge_ratios = self
            .hedge_ratios
            .as_ref()
            .ok_or(PairsError::MissingHedgeRatios)?;
        let prices = self.traded(prices)?;
        target_weights(signals, hedge_ratios, &prices)
    }

    fn positions(&self, weights: &Frame, prices: &PricePanel) -> Result<Frame> {
        let prices = self.traded(prices)?;
        if !(weights.index() == prices.index() && weights.columns() == prices.symbols()) {
            return Err(PairsError::InvalidInput(
                "weight frame is not aligned with the price panel".to_string(),
            ));
        }
        Ok(positions(weights))
    }

    fn returns(&self, positions: &Frame, prices: &PricePanel) -> Result<Frame> {
        let prices = self.traded(prices)?;
        gross_returns(positions, &prices)
    }

    fn hedge_ratios(&self) -> Option<&Frame> {
        self.hedge_ratios.as_ref()
    }

    fn parameters(&self) -> Vec<(String, String)> {
        vec![
            (
                "lookback_window".to_string(),
                self.config.lookback_window.to_string(),
            ),
            ("bband_std".to_string(), format!("{:.2}", self.config.bband_std)),
            (
                "min_coverage".to_string(),
                format!("{:.2}", self.config.min_coverage),
            ),
            ("symbols".to_string(), self.config.symbols.join(",")),
        ]
    }
}
