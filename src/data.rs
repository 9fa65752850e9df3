//! Price panels, CSV loading and rolling-window helpers.
//!
//! The pipeline reads prices from a [`PricePanel`]: Open and Close fields
//! indexed by time and instrument, with missing cells represented as `None`.
//! Panels are normally supplied fully materialized by the backtest engine;
//! [`PricePanel::from_series`] and [`load_panel`] build one from per-symbol
//! bar series for standalone runs.

use crate::error::{PairsError, Result};
use crate::types::{Bar, Field};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// Raw CSV row with flexible column naming.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(
        alias = "Date",
        alias = "DATE",
        alias = "Timestamp",
        alias = "timestamp",
        alias = "Time",
        alias = "time",
        alias = "datetime"
    )]
    date: String,
    #[serde(alias = "Open", alias = "o")]
    open: f64,
    #[serde(alias = "High", alias = "h", default)]
    high: Option<f64>,
    #[serde(alias = "Low", alias = "l", default)]
    low: Option<f64>,
    #[serde(alias = "Close", alias = "c", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "v", alias = "vol", default)]
    volume: f64,
}

/// CSV source configuration.
#[derive(Debug, Clone)]
pub struct DataConfig {
    /// Date format string (e.g. "%Y-%m-%d"). Common formats are tried when `None`.
    pub date_format: Option<String>,
    pub has_headers: bool,
    pub delimiter: u8,
    /// Skip unparseable rows instead of failing.
    pub skip_invalid: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_format: None,
            has_headers: true,
            delimiter: b',',
            skip_invalid: true,
        }
    }
}

fn parse_datetime(s: &str, format: Option<&str>) -> Result<DateTime<Utc>> {
    let midnight = |d: NaiveDate| d.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));

    if let Some(fmt) = format {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt).ok().and_then(midnight) {
            return Ok(dt);
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&dt));
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y"] {
        if let Some(dt) = NaiveDate::parse_from_str(s, fmt).ok().and_then(midnight) {
            return Ok(dt);
        }
    }

    if let Some(dt) = s.parse::<i64>().ok().and_then(|ts| DateTime::from_timestamp(ts, 0)) {
        return Ok(dt);
    }

    Err(PairsError::DataError(format!("Could not parse date: '{}'", s)))
}

/// Load one instrument's bars from a CSV file, sorted and de-duplicated by timestamp.
///
/// Only Open and Close are required; High/Low default to the max/min of the two.
pub fn load_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    info!("Loading data from: {}", path.display());

    let mut reader = ReaderBuilder::new()
        .has_headers(config.has_headers)
        .delimiter(config.delimiter)
        .flexible(true)
        .from_path(path)?;

    let mut bars = Vec::new();
    let mut skipped = 0;

    for (row_num, result) in reader.deserialize::<CsvRow>().enumerate() {
        let parsed = result
            .map_err(PairsError::from)
            .and_then(|row| Ok((parse_datetime(&row.date, config.date_format.as_deref())?, row)));

        let (timestamp, row) = match parsed {
            Ok(parsed) => parsed,
            Err(e) if config.skip_invalid => {
                debug!("Skipping row {}: {}", row_num + 1, e);
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        let high = row.high.unwrap_or(row.open.max(row.close));
        let low = row.low.unwrap_or(row.open.min(row.close));
        bars.push(Bar::new(timestamp, row.open, high, low, row.close, row.volume));
    }

    if skipped > 0 {
        warn!("Skipped {} invalid rows", skipped);
    }

    let inconsistent = bars.iter().filter(|b| !b.validate()).count();
    if inconsistent > 0 {
        warn!("{} bars have inconsistent OHLC values", inconsistent);
    }

    bars.sort_by_key(|b| b.timestamp);
    let original_len = bars.len();
    bars.dedup_by_key(|b| b.timestamp);
    if bars.len() < original_len {
        warn!("Removed {} duplicate timestamps", original_len - bars.len());
    }

    if bars.is_empty() {
        return Err(PairsError::NoData);
    }

    debug!(
        "Loaded {} bars from {} to {}",
        bars.len(),
        bars[0].timestamp,
        bars[bars.len() - 1].timestamp
    );
    Ok(bars)
}

/// Load several instruments and align them into a panel.
pub fn load_panel<S, P>(files: &[(S, P)], config: &DataConfig) -> Result<PricePanel>
where
    S: AsRef<str>,
    P: AsRef<Path>,
{
    let loaded = files
        .iter()
        .map(|(symbol, path)| Ok((symbol.as_ref().to_string(), load_csv(path, config)?)))
        .collect::<Result<Vec<(String, Vec<Bar>)>>>()?;

    let series: Vec<(&str, &[Bar])> = loaded
        .iter()
        .map(|(s, bars)| (s.as_str(), bars.as_slice()))
        .collect();
    PricePanel::from_series(&series)
}

/// Open/Close prices indexed by time and instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePanel {
    index: Vec<DateTime<Utc>>,
    symbols: Vec<String>,
    open: Vec<Vec<Option<f64>>>,
    close: Vec<Vec<Option<f64>>>,
}

impl PricePanel {
    /// Build a panel from time-major field matrices.
    ///
    /// The index must be strictly increasing. Non-finite prices are stored as missing.
    pub fn new(
        index: Vec<DateTime<Utc>>,
        symbols: Vec<String>,
        open: Vec<Vec<Option<f64>>>,
        close: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PairsError::InvalidInput(
                "panel index must be strictly increasing".to_string(),
            ));
        }
        let unique: BTreeSet<&String> = symbols.iter().collect();
        if unique.len() != symbols.len() {
            return Err(PairsError::InvalidInput(
                "panel symbols must be unique".to_string(),
            ));
        }
        for (field, matrix) in [(Field::Open, &open), (Field::Close, &close)] {
            if matrix.len() != index.len() || matrix.iter().any(|row| row.len() != symbols.len()) {
                return Err(PairsError::InvalidInput(format!(
                    "{} field must be {} rows of {} values",
                    field,
                    index.len(),
                    symbols.len()
                )));
            }
        }

        let clean = |m: Vec<Vec<Option<f64>>>| -> Vec<Vec<Option<f64>>> {
            m.into_iter()
                .map(|row| row.into_iter().map(|v| v.filter(|x| x.is_finite())).collect())
                .collect()
        };

        Ok(Self {
            index,
            symbols,
            open: clean(open),
            close: clean(close),
        })
    }

    /// Outer-join several bar series on timestamp; absent bars become missing cells.
    pub fn from_series(series: &[(&str, &[Bar])]) -> Result<Self> {
        if series.is_empty() {
            return Err(PairsError::NoData);
        }

        let index: Vec<DateTime<Utc>> = series
            .iter()
            .flat_map(|(_, bars)| bars.iter().map(|b| b.timestamp))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let lookups: Vec<HashMap<DateTime<Utc>, &Bar>> = series
            .iter()
            .map(|(_, bars)| bars.iter().map(|b| (b.timestamp, b)).collect())
            .collect();

        let mut open = Vec::with_capacity(index.len());
        let mut close = Vec::with_capacity(index.len());
        let mut gaps = 0;
        for ts in &index {
            let bars: Vec<Option<&&Bar>> = lookups.iter().map(|m| m.get(ts)).collect();
            gaps += bars.iter().filter(|b| b.is_none()).count();
            open.push(bars.iter().map(|b| b.map(|bar| bar.open)).collect());
            close.push(bars.iter().map(|b| b.map(|bar| bar.close)).collect());
        }

        if gaps > 0 {
            warn!("Aligned panel has {} missing cells", gaps);
        }

        let symbols = series.iter().map(|(s, _)| s.to_string()).collect();
        Self::new(index, symbols, open, close)
    }

    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
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
        self.symbols.len()
    }

    /// Time-major matrix for one field.
    pub fn field(&self, field: Field) -> &[Vec<Option<f64>>] {
        match field {
            Field::Open => &self.open,
            Field::Close => &self.close,
        }
    }

    pub fn closes(&self) -> &[Vec<Option<f64>>] {
        self.field(Field::Close)
    }

    pub fn opens(&self) -> &[Vec<Option<f64>>] {
        self.field(Field::Open)
    }

    /// Restrict the panel to `symbols`, in the given order.
    pub fn select(&self, symbols: &[String]) -> Result<Self> {
        let positions = symbols
            .iter()
            .map(|s| {
                self.symbols
                    .iter()
                    .position(|p| p == s)
                    .ok_or_else(|| PairsError::UnknownSymbol(s.clone()))
            })
            .collect::<Result<Vec<usize>>>()?;

        let pick = |m: &[Vec<Option<f64>>]| -> Vec<Vec<Option<f64>>> {
            m.iter()
                .map(|row| positions.iter().map(|&j| row[j]).collect())
                .collect()
        };

        Self::new(
            self.index.clone(),
            symbols.to_vec(),
            pick(&self.open),
            pick(&self.close),
        )
    }
}

/// Carry the last defined value forward over missing entries.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}

/// Trailing mean over `period` values ending at each index (inclusive).
///
/// `None` until a full window of defined values is available.
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |w| Some(w.iter().sum::<f64>() / w.len() as f64))
}

/// Trailing sample standard deviation (N−1 denominator) over `period` values.
///
/// `None` until a full window is available, and always `None` for `period < 2`.
pub fn rolling_std(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |w| {
        if w.len() < 2 {
            return None;
        }
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let var = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.max(0.0).sqrt())
    })
}

fn rolling<F>(values: &[Option<f64>], period: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut window = Vec::with_capacity(period);
    (0..values.len())
        .map(|t| {
            if period == 0 || t + 1 < period {
                return None;
            }
            window.clear();
            for v in &values[t + 1 - period..=t] {
                window.push((*v)?);
            }
            stat(&window)
        })
        .collect()
}
