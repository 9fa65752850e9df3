//! Strategy configuration and TOML file support.

use crate::data::DataConfig;
use crate::error::{PairsError, Result};
use crate::hedge::MIN_WINDOW_COVERAGE;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runtime parameters of the pairs pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairsConfig {
    /// Bars used for hedge ratios and Bollinger Bands.
    pub lookback_window: usize,
    /// Band half-width in standard deviations.
    pub bband_std: f64,
    /// Fraction of the window that must be complete rows.
    pub min_coverage: f64,
    /// Instruments to trade, in order. Empty means every instrument in the panel.
    pub symbols: Vec<String>,
    /// Fan the rolling hedge ratio estimates out over the rayon pool.
    pub parallel: bool,
}

impl Default for PairsConfig {
    fn default() -> Self {
        Self {
            lookback_window: 20,
            bband_std: 1.0,
            min_coverage: MIN_WINDOW_COVERAGE,
            symbols: Vec::new(),
            parallel: true,
        }
    }
}

impl PairsConfig {
    pub fn new(lookback_window: usize, bband_std: f64) -> Self {
        Self {
            lookback_window,
            bband_std,
            ..Default::default()
        }
    }

    pub fn with_symbols<S: Into<String>>(mut self, symbols: impl IntoIterator<Item = S>) -> Self {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookback_window == 0 {
            return Err(PairsError::ConfigError(
                "lookback_window must be at least 1".to_string(),
            ));
        }
        if !self.bband_std.is_finite() || self.bband_std < 0.0 {
            return Err(PairsError::ConfigError(format!(
                "bband_std must be a finite non-negative number, got {}",
                self.bband_std
            )));
        }
        if !(self.min_coverage > 0.0 && self.min_coverage <= 1.0) {
            return Err(PairsError::ConfigError(format!(
                "min_coverage must be in (0, 1], got {}",
                self.min_coverage
            )));
        }
        let unique: BTreeSet<&String> = self.symbols.iter().collect();
        if unique.len() != self.symbols.len() {
            return Err(PairsError::ConfigError(
                "symbols must not contain duplicates".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration file with strategy and data sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairsFileConfig {
    #[serde(default)]
    pub strategy: StrategySettings,
    #[serde(default)]
    pub data: DataSettings,
}

/// `[strategy]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    #[serde(default = "default_lookback")]
    pub lookback_window: usize,
    #[serde(default = "default_bband_std")]
    pub bband_std: f64,
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f64,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub symbols: Vec<String>,
}

fn default_lookback() -> usize { 20 }
fn default_bband_std() -> f64 { 1.0 }
fn default_min_coverage() -> f64 { MIN_WINDOW_COVERAGE }
fn default_true() -> bool { true }

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            lookback_window: 20,
            bband_std: 1.0,
            min_coverage: MIN_WINDOW_COVERAGE,
            parallel: true,
            symbols: Vec::new(),
        }
    }
}

/// `[data]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    /// Directory holding `<SYMBOL>.csv` files.
    pub dir: Option<String>,
    /// Explicit per-symbol paths; override `dir`.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    pub date_format: Option<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char { ',' }

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: None,
            files: BTreeMap::new(),
            date_format: None,
            delimiter: ',',
        }
    }
}

impl PairsFileConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = fs::read_to_string(path)?;
        let config: PairsFileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PairsError::ConfigError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validated runtime configuration.
    pub fn to_pairs_config(&self) -> Result<PairsConfig> {
        let config = PairsConfig {
            lookback_window: self.strategy.lookback_window,
            bband_std: self.strategy.bband_std,
            min_coverage: self.strategy.min_coverage,
            symbols: self.strategy.symbols.clone(),
            parallel: self.strategy.parallel,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_data_config(&self) -> Result<DataConfig> {
        if !self.data.delimiter.is_ascii() {
            return Err(PairsError::ConfigError(format!(
                "delimiter must be ASCII, got {:?}",
                self.data.delimiter
            )));
        }
        Ok(DataConfig {
            date_format: self.data.date_format.clone(),
            delimiter: self.data.delimiter as u8,
            ..Default::default()
        })
    }

    /// CSV path for every configured symbol, in symbol order.
    pub fn data_files(&self) -> Result<Vec<(String, PathBuf)>> {
        self.strategy
            .symbols
            .iter()
            .map(|symbol| {
                let path = match (self.data.files.get(symbol), &self.data.dir) {
                    (Some(file), _) => PathBuf::from(file),
                    (None, Some(dir)) => Path::new(dir).join(format!("{}.csv", symbol)),
                    (None, None) => {
                        return Err(PairsError::ConfigError(format!(
                            "no data file configured for {}",
                            symbol
                        )))
                    }
                };
                Ok((symbol.clone(), path))
            })
            .collect()
    }

    /// Example configuration file content.
    pub fn example() -> String {
        r#"# Pairs pipeline configuration

[strategy]
lookback_window = 20   # bars for hedge ratios and bands
bband_std = 1.0        # band half-width in standard deviations
min_coverage = 0.75    # complete rows required per window
parallel = true
symbols = ["GDX", "GLD"]

[data]
dir = "data"
# date_format = "%Y-%m-%d"
delimiter = ","

# [data.files]
# GDX = "data/gdx_daily.csv"
"#
        .to_string()
    }
}
