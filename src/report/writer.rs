//! Report serialization: text table, CSV and JSON.

use super::Report;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl Report {
    /// Writes the report in `format`. `raw` disables magnitude suffixes in
    /// CSV output; JSON always carries plain numbers.
    pub fn write<W: Write>(&self, format: ReportFormat, writer: W, raw: bool) -> Result<()> {
        match format {
            ReportFormat::Table => write_table(self, writer),
            ReportFormat::Csv => write_csv(self, writer, raw),
            ReportFormat::Json => write_json(self, writer),
        }
    }
}

pub fn write_table<W: Write>(report: &Report, mut writer: W) -> Result<()> {
    write!(writer, "{}", report)?;
    writer.flush()?;
    Ok(())
}

/// One record per layer in insertion order, then the totals.
pub fn write_csv<W: Write>(report: &Report, writer: W, raw: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(Report::header())?;
    for row in report.rows.iter().chain(std::iter::once(&report.total)) {
        wtr.write_record(row.cells(raw))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(report: &Report, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportRow;

    fn sample() -> Report {
        Report::from_rows(vec![
            ReportRow {
                name: "conv1".into(),
                inference: 118_013_952.0,
                propagation: 118_013_952.0,
                update: 118_013_952.0,
                params: 9408.0,
                input_volume: 150_528.0,
            },
            ReportRow { name: "relu1".into(), input_volume: 802_816.0, ..Default::default() },
        ])
    }

    #[test]
    fn test_csv_output() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "layer,inference,propagation,update,params,input");
        assert_eq!(lines[1], "conv1,118.01M,118.01M,118.01M,9.41K,150.53K");
        assert_eq!(lines[2], "relu1,0,0,0,0,802.82K");
        assert!(lines[3].starts_with("total,118.01M"));
    }

    #[test]
    fn test_csv_raw_numbers() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("conv1,118013952,118013952,118013952,9408,150528"));
    }

    #[test]
    fn test_json_output() {
        let mut buf = Vec::new();
        sample().write(ReportFormat::Json, &mut buf, false).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["rows"][0]["name"], "conv1");
        assert_eq!(value["rows"][0]["params"], 9408.0);
        assert_eq!(value["total"]["input_volume"], 953_344.0);
    }
}
