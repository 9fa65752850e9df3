//! End-to-end tests for the pairs pipeline.

use chrono::{DateTime, TimeZone, Utc};
use pairs_pipeline::config::{PairsConfig, PairsFileConfig};
use pairs_pipeline::data::{load_panel, PricePanel};
use pairs_pipeline::strategy::{PairsStrategy, PipelineOutput, SignalPipeline};
use pairs_pipeline::{PairsError, PipelineSummary};
use std::io::Write;
use tempfile::TempDir;

/// xorshift64* mapped to [-1, 1).
struct Noise(u64);

impl Noise {
    fn next(&mut self) -> f64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        let x = self.0.wrapping_mul(0x2545_F491_4F6C_DD1D);
        (x >> 11) as f64 / (1u64 << 52) as f64 - 1.0
    }
}

fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 1, 4, 0, 0, 0).unwrap() + chrono::Duration::days(i as i64)
}

const SPIKE_DAY: usize = 150;

/// A follows a random walk from 100; B = 2A plus a mean-reverting
/// perturbation, with a one-day upward spike in B at `SPIKE_DAY`.
fn cointegrated_panel(n: usize, seed: u64) -> PricePanel {
    let mut noise = Noise(seed);
    let mut a = 100.0;
    let mut ar = 0.0;
    let mut open = Vec::with_capacity(n);
    let mut close = Vec::with_capacity(n);

    for i in 0..n {
        let a_open = a;
        a += 2.0 * noise.next();
        ar = 0.5 * ar + 0.02 * noise.next();
        let spike = if i == SPIKE_DAY { 3.0 } else { 0.0 };
        let b = 2.0 * a + ar + spike;
        open.push(vec![Some(a_open), Some(2.0 * a_open + 0.5 * ar)]);
        close.push(vec![Some(a), Some(b)]);
    }

    PricePanel::new(
        (0..n).map(day).collect(),
        vec!["A".to_string(), "B".to_string()],
        open,
        close,
    )
    .unwrap()
}

fn run(panel: &PricePanel, parallel: bool) -> (PairsStrategy, PipelineOutput) {
    let config = PairsConfig::new(20, 1.0).with_parallel(parallel);
    let mut strategy = PairsStrategy::new(config).unwrap();
    let output = strategy.run(panel).unwrap();
    (strategy, output)
}

#[test]
fn test_hedge_ratios_track_cointegrating_vector() {
    let panel = cointegrated_panel(250, 0x9E37_79B9);
    let (_, output) = run(&panel, true);
    let hedge = output.hedge_ratios.unwrap();

    let mut ratios: Vec<f64> = (40..250)
        .filter(|&t| hedge.get(t, 0) != 0.0)
        .map(|t| hedge.get(t, 1) / hedge.get(t, 0))
        .collect();
    assert!(ratios.len() > 150);
    ratios.sort_by(|a, b| a.total_cmp(b));
    let median = ratios[ratios.len() / 2];
    assert!((median + 0.5).abs() < 0.1, "median ratio {}", median);
}

#[test]
fn test_spike_enters_against_rich_leg_then_exits() {
    let panel = cointegrated_panel(250, 0x9E37_79B9);
    let (strategy, output) = run(&panel, true);

    let bands = strategy.bands().unwrap();
    let point = bands.at(SPIKE_DAY);
    let spread = point.spread.unwrap();
    assert!(spread < point.lower.unwrap() || spread > point.upper.unwrap());

    let entry = output.signals.get(SPIKE_DAY, 0);
    assert_ne!(entry, 0.0);
    // B is rich: short B, long A, whatever sign the eigenvector carries.
    assert!(output.weights.get(SPIKE_DAY, 0) > 0.0);
    assert!(output.weights.get(SPIKE_DAY, 1) < 0.0);

    // Exit fires on the first bar whose spread reaches the mean from the entry side.
    let reached_mean = |t: usize| {
        let point = bands.at(t);
        match (point.spread, point.mean) {
            (Some(s), Some(m)) if entry > 0.0 => s >= m,
            (Some(s), Some(m)) => s <= m,
            _ => false,
        }
    };
    let exit = (SPIKE_DAY + 1..panel.len())
        .find(|&t| output.signals.get(t, 0) != entry)
        .expect("signal never left the spike entry");

    for t in SPIKE_DAY + 1..exit {
        assert_eq!(output.signals.get(t, 0), entry, "signal changed at {}", t);
        assert!(!reached_mean(t), "held past a mean crossing at {}", t);
    }
    assert!(reached_mean(exit));
    assert_eq!(output.signals.get(exit, 0), 0.0);
    assert!(output.weights.row(exit).iter().all(|w| *w == 0.0));
}

#[test]
fn test_weights_positions_returns_relationships() {
    let panel = cointegrated_panel(200, 42);
    let (_, output) = run(&panel, false);

    for t in 0..panel.len() {
        let signal = output.signals.get(t, 0);
        assert!(output.signals.row(t).iter().all(|s| *s == signal));
        assert!([-1.0, 0.0, 1.0].contains(&signal));

        let gross = output.weights.row_abs_sum(t);
        if signal == 0.0 {
            assert_eq!(gross, 0.0);
        } else {
            assert!((gross - 1.0).abs() < 1e-9, "gross {} at {}", gross, t);
        }

        if t == 0 {
            assert!(output.positions.row(0).iter().all(|p| *p == 0.0));
            assert!(output.returns.row(0).iter().all(|r| *r == 0.0));
            continue;
        }

        assert_eq!(output.positions.row(t), output.weights.row(t - 1));

        let opens = panel.opens();
        for j in 0..2 {
            let change = opens[t][j].unwrap() / opens[t - 1][j].unwrap() - 1.0;
            let expected = change * output.positions.get(t - 1, j);
            assert!((output.returns.get(t, j) - expected).abs() < 1e-15);
            assert!(output.returns.get(t, j).is_finite());
        }
    }
}

#[test]
fn test_rerun_is_bit_identical() {
    let panel = cointegrated_panel(180, 7);
    let (_, first) = run(&panel, true);
    let (_, second) = run(&panel, true);
    let (_, serial) = run(&panel, false);

    assert_eq!(first, second);
    assert_eq!(first, serial);
}

#[test]
fn test_sparse_data_stays_flat() {
    let n = 60;
    let rows: Vec<Vec<Option<f64>>> = (0..n)
        .map(|i| {
            let a = 100.0 + (i as f64 * 0.3).sin();
            // B is missing on two of every three days
            let b = (i % 3 == 0).then_some(2.0 * a);
            vec![Some(a), b]
        })
        .collect();
    let panel = PricePanel::new(
        (0..n).map(day).collect(),
        vec!["A".to_string(), "B".to_string()],
        rows.clone(),
        rows,
    )
    .unwrap();

    let (_, output) = run(&panel, true);
    let hedge = output.hedge_ratios.as_ref().unwrap();
    assert!(hedge.rows().iter().all(|r| r.iter().all(|v| *v == 0.0)));
    assert!(output.signals.rows().iter().all(|r| r[0] == 0.0));
    assert!(output.weights.rows().iter().all(|r| r.iter().all(|w| *w == 0.0)));
    assert!(output.returns.rows().iter().all(|r| r.iter().all(|x| *x == 0.0)));
}

#[test]
fn test_degenerate_prices_fail_whole_run() {
    let n = 40;
    let rows = vec![vec![Some(10.0), Some(20.0)]; n];
    let panel = PricePanel::new(
        (0..n).map(day).collect(),
        vec!["A".to_string(), "B".to_string()],
        rows.clone(),
        rows,
    )
    .unwrap();

    let mut strategy = PairsStrategy::new(PairsConfig::new(20, 1.0)).unwrap();
    let err = strategy.run(&panel).unwrap_err();
    assert!(matches!(err, PairsError::HedgeRatio { step: 20, .. }));
    assert!(strategy.hedge_ratios().is_none());
}

#[test]
fn test_summary_of_synthetic_run() {
    let panel = cointegrated_panel(250, 0x9E37_79B9);
    let (_, output) = run(&panel, true);
    let summary = PipelineSummary::from_output(&output);

    assert_eq!(summary.bars, 250);
    assert!(summary.active_bars > 0);
    assert!(summary.long_entries + summary.short_entries > 0);
    assert_eq!(summary.exposure_violations, 0);
    assert!((summary.max_gross_exposure - 1.0).abs() < 1e-9);
    assert!(summary.total_gross_return.is_finite());
}

#[test]
fn test_config_and_csv_end_to_end() {
    let dir = TempDir::new().unwrap();
    let panel = cointegrated_panel(120, 99);

    for (j, symbol) in ["AAA", "BBB"].iter().enumerate() {
        let mut file = std::fs::File::create(dir.path().join(format!("{}.csv", symbol))).unwrap();
        writeln!(file, "Date,Open,Close").unwrap();
        for t in 0..panel.len() {
            writeln!(
                file,
                "{},{},{}",
                panel.index()[t].format("%Y-%m-%d"),
                panel.opens()[t][j].unwrap(),
                panel.closes()[t][j].unwrap()
            )
            .unwrap();
        }
    }

    let toml_content = format!(
        "[strategy]\nlookback_window = 20\nbband_std = 1.0\nsymbols = [\"AAA\", \"BBB\"]\n\n\
         [data]\ndir = {:?}\n",
        dir.path().display().to_string()
    );
    let config_path = dir.path().join("pairs.toml");
    std::fs::write(&config_path, toml_content).unwrap();

    let file_config = PairsFileConfig::load(&config_path).unwrap();
    let loaded = load_panel(
        &file_config.data_files().unwrap(),
        &file_config.to_data_config().unwrap(),
    )
    .unwrap();
    assert_eq!(loaded.len(), 120);
    assert_eq!(loaded.symbols(), &["AAA".to_string(), "BBB".to_string()]);

    let mut strategy = PairsStrategy::new(file_config.to_pairs_config().unwrap()).unwrap();
    let output = strategy.run(&loaded).unwrap();
    assert_eq!(output.returns.len(), 120);
    assert_eq!(output.returns.columns(), loaded.symbols());
}
