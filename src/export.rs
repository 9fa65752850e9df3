//! Export of pipeline frames and summaries.
//!
//! | Format | Content |
//! |--------|---------|
//! | CSV    | one frame: timestamp column plus one column per instrument |
//! | JSON   | a whole run, or its [`PipelineSummary`] |

use crate::analytics::PipelineSummary;
use crate::error::Result;
use crate::frame::Frame;
use crate::strategy::PipelineOutput;
use csv::Writer;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Output formatting options.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub date_format: String,
    pub precision: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d".to_string(),
            precision: 6,
        }
    }
}

/// Write `frame` as CSV to any writer.
pub fn write_frame_csv<W: Write>(frame: &Frame, writer: W, config: &ExportConfig) -> Result<()> {
    let mut csv = Writer::from_writer(writer);

    let mut header = vec!["timestamp".to_string()];
    header.extend(frame.columns().iter().cloned());
    csv.write_record(&header)?;

    for (ts, row) in frame.index().iter().zip(frame.rows()) {
        let mut record = vec![ts.format(&config.date_format).to_string()];
        record.extend(row.iter().map(|v| format!("{:.prec$}", v, prec = config.precision)));
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write `frame` as a CSV file.
pub fn export_frame_csv(
    frame: &Frame,
    path: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<()> {
    let path = path.as_ref();
    write_frame_csv(frame, File::create(path)?, config)?;
    info!("Wrote {} rows to {}", frame.len(), path.display());
    Ok(())
}

/// Write every frame of a run into `dir` as `<stage>.csv`.
pub fn export_output_csv(
    output: &PipelineOutput,
    dir: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut frames = vec![
        ("signals", &output.signals),
        ("weights", &output.weights),
        ("positions", &output.positions),
        ("returns", &output.returns),
    ];
    if let Some(hedge_ratios) = &output.hedge_ratios {
        frames.push(("hedge_ratios", hedge_ratios));
    }

    for (name, frame) in frames {
        export_frame_csv(frame, dir.join(format!("{}.csv", name)), config)?;
    }
    Ok(())
}

/// Write a run summary as pretty JSON.
pub fn export_summary_json(summary: &PipelineSummary, path: impl AsRef<Path>) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}
