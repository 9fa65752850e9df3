//! Example: Johansen Pairs Pipeline
//!
//! Runs the four pipeline stages on a pair of instruments:
//! 1. Rolling Johansen hedge ratios on the preceding closes
//! 2. Bollinger Bands on the hedge-ratio-weighted spread
//! 3. Long/flat/short signal with band hysteresis
//! 4. Gross-normalized weights, lagged positions and gross returns
//!
//! With a TOML config path the prices are loaded from CSV, otherwise a
//! synthetic cointegrated pair is used. A second argument exports every
//! frame plus a JSON summary into that directory.
//!
//! Run with: cargo run --example pairs_demo -- [pairs.toml] [output_dir]
//! Set RUST_LOG=debug for stage-level logging.

use chrono::{TimeZone, Utc};
use pairs_pipeline::config::{PairsConfig, PairsFileConfig};
use pairs_pipeline::data::{load_panel, PricePanel};
use pairs_pipeline::export::{export_output_csv, export_summary_json, ExportConfig};
use pairs_pipeline::strategy::{PairsStrategy, SignalPipeline};
use pairs_pipeline::PipelineSummary;
use tracing_subscriber::EnvFilter;

/// Generate a synthetic pair: B tracks 2·A plus a mean-reverting wobble.
fn generate_synthetic_pair(days: usize) -> PricePanel {
    let mut price = 100.0;
    let mut wobble = 0.0;
    let mut open = Vec::with_capacity(days);
    let mut close = Vec::with_capacity(days);

    for i in 0..days {
        let noise = ((i as f64 * 0.7).sin() * 2.0 + (i as f64 * 1.3).cos()) * 0.5;
        let prev = price;
        price = (price + noise).max(50.0);
        wobble = 0.6 * wobble + 0.4 * (i as f64 * 2.3).sin();

        open.push(vec![Some(prev), Some(2.0 * prev + 0.5 * wobble)]);
        close.push(vec![Some(price), Some(2.0 * price + wobble)]);
    }

    PricePanel::new(
        (0..days)
            .map(|i| {
                Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64)
            })
            .collect(),
        vec!["AAA".to_string(), "BBB".to_string()],
        open,
        close,
    )
    .expect("Failed to build synthetic panel")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    let output_dir = args.next();

    println!("=== Johansen Pairs Pipeline ===\n");

    // 1. Load data
    println!("1. Loading data...");
    let (config, panel) = match &config_path {
        Some(path) => {
            let file_config = PairsFileConfig::load(path).expect("Failed to load config");
            let files = file_config.data_files().expect("Invalid data section");
            let data_config = file_config.to_data_config().expect("Invalid data section");
            let panel = load_panel(&files, &data_config).expect("Failed to load prices");
            (
                file_config.to_pairs_config().expect("Invalid strategy section"),
                panel,
            )
        }
        None => {
            println!("   Using synthetic data");
            (PairsConfig::default(), generate_synthetic_pair(750))
        }
    };
    println!(
        "   Loaded {} bars for {}\n",
        panel.len(),
        panel.symbols().join(", ")
    );

    // 2. Run the pipeline
    println!("2. Running pipeline...");
    let mut strategy = PairsStrategy::new(config).expect("Invalid configuration");
    for (key, value) in strategy.parameters() {
        println!("   {:<16} {}", key, value);
    }
    let output = strategy.run(&panel).expect("Pipeline failed");

    // 3. Summary
    println!("\n3. Results:\n");
    println!("{}", "=".repeat(50));
    let summary = PipelineSummary::from_output(&output);
    println!("{}", summary);
    println!("{}", "=".repeat(50));

    if let Some(hedge) = strategy.hedge_ratios() {
        let last = hedge.len().saturating_sub(1);
        println!("\n   Last hedge ratio: {:?}", hedge.row(last));
    }

    // 4. Export
    if let Some(dir) = output_dir {
        println!("\n4. Exporting to {}...", dir);
        export_output_csv(&output, &dir, &ExportConfig::default())
            .expect("Failed to export frames");
        export_summary_json(&summary, std::path::Path::new(&dir).join("summary.json"))
            .expect("Failed to export summary");
        println!("   Done");
    }
}
