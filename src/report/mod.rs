//! Per-layer cost report.
//!
//! A [`Report`] is built from a propagated model and holds, for every layer in
//! insertion order, the six figures of the profile plus one row of column
//! totals. The writers in [`writer`] render it as a text table, CSV or JSON;
//! [`dot`] exports the layer graph itself.

pub mod dot;
pub mod writer;

pub use writer::{write_csv, write_json, write_table, ReportError, ReportFormat};

use crate::model::Model;
use crate::net::NetResult;
use serde::Serialize;
use std::fmt;

pub const TOTAL_ROW: &str = "total";

const COLUMNS: [&str; 6] = ["layer", "inference", "propagation", "update", "params", "input"];

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReportRow {
    pub name: String,
    pub inference: f64,
    pub propagation: f64,
    pub update: f64,
    pub params: f64,
    pub input_volume: f64,
}

impl ReportRow {
    fn accumulate(&mut self, other: &ReportRow) {
        self.inference += other.inference;
        self.propagation += other.propagation;
        self.update += other.update;
        self.params += other.params;
        self.input_volume += other.input_volume;
    }

    fn values(&self) -> [f64; 5] {
        [self.inference, self.propagation, self.update, self.params, self.input_volume]
    }

    /// Cells of the row, numbers with magnitude suffixes unless `raw`.
    pub fn cells(&self, raw: bool) -> Vec<String> {
        let mut cells = vec![self.name.clone()];
        cells.extend(self.values().iter().map(|&v| {
            if raw {
                v.to_string()
            } else {
                format_magnitude(v)
            }
        }));
        cells
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub total: ReportRow,
}

impl Report {
    /// Evaluates every layer of a propagated model.
    pub fn from_model(model: &Model) -> NetResult<Self> {
        let mut rows = Vec::with_capacity(model.len());
        for net in model.iter() {
            let cost = model.cost(net.id())?;
            rows.push(ReportRow {
                name: net.name().to_string(),
                inference: cost.inference_macs,
                propagation: cost.propagation_macs,
                update: cost.update_macs,
                params: cost.params,
                input_volume: cost.input_volume,
            });
        }
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<ReportRow>) -> Self {
        let mut total = ReportRow {
            name: TOTAL_ROW.to_string(),
            ..Default::default()
        };
        for row in &rows {
            total.accumulate(row);
        }
        Self { rows, total }
    }

    pub fn header() -> [&'static str; 6] {
        COLUMNS
    }

    pub fn row(&self, name: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .chain(std::iter::once(&self.total))
            .map(|row| row.cells(false))
            .collect();

        let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.len()).collect();
        for cells in &body {
            for (w, cell) in widths.iter_mut().zip(cells) {
                *w = (*w).max(cell.len());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, cells: &[String]| -> fmt::Result {
            for (i, (cell, w)) in cells.iter().zip(&widths).enumerate() {
                if i == 0 {
                    write!(f, "{:<width$}", cell, width = w)?;
                } else {
                    write!(f, "  {:>width$}", cell, width = w)?;
                }
            }
            writeln!(f)
        };

        let header: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
        line(f, &header)?;
        let rule: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
        writeln!(f, "{}", "-".repeat(rule))?;
        if let Some((total, rows)) = body.split_last() {
            for cells in rows {
                line(f, cells)?;
            }
            writeln!(f, "{}", "-".repeat(rule))?;
            line(f, total)?;
        }
        Ok(())
    }
}

/// Renders a count with a magnitude suffix once it reaches 1000:
/// K (1e3), M (1e6), G (1e9), B (1e12).
pub fn format_magnitude(n: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "B"), (1e9, "G"), (1e6, "M"), (1e3, "K")];
    for (scale, suffix) in UNITS {
        if n.abs() >= scale {
            return format!("{:.2}{}", n / scale, suffix);
        }
    }
    if n.fract() == 0.0 {
        format!("{:.0}", n)
    } else {
        format!("{:.2}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nn::{Conv2dConfig, LinearConfig};

    #[test]
    fn test_format_magnitude() {
        assert_eq!(format_magnitude(999.0), "999");
        assert_eq!(format_magnitude(0.5), "0.50");
        assert_eq!(format_magnitude(1000.0), "1.00K");
        assert_eq!(format_magnitude(9408.0), "9.41K");
        assert_eq!(format_magnitude(2_500_000.0), "2.50M");
        assert_eq!(format_magnitude(118_013_952.0), "118.01M");
        assert_eq!(format_magnitude(7.6e9), "7.60G");
        assert_eq!(format_magnitude(3.0e12), "3.00B");
    }

    #[test]
    fn test_totals_are_column_sums() {
        let mut model = Model::new();
        let input = model.input("input", vec![3, 32, 32]).unwrap();
        let conv = model.conv2d("conv", &[input], Conv2dConfig::square(16, 3)).unwrap();
        model.fc("fc", &[conv], LinearConfig::new(10)).unwrap();
        let report = model.profile().unwrap();

        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.total.name, TOTAL_ROW);
        let params: f64 = report.rows.iter().map(|r| r.params).sum();
        let inference: f64 = report.rows.iter().map(|r| r.inference).sum();
        assert_eq!(report.total.params, params);
        assert_eq!(report.total.inference, inference);
        assert_eq!(report.row("conv").unwrap().params, (16 * 3 * 3 * 3) as f64);
    }

    #[test]
    fn test_table_lists_every_layer_and_total() {
        let report = Report::from_rows(vec![
            ReportRow { name: "conv1".into(), inference: 1.5e6, ..Default::default() },
            ReportRow { name: "fc".into(), params: 4096.0, ..Default::default() },
        ]);
        let table = report.to_string();
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("layer"));
        assert!(lines[2].starts_with("conv1") && lines[2].contains("1.50M"));
        assert!(lines[3].starts_with("fc") && lines[3].contains("4.10K"));
        assert!(lines.last().unwrap().starts_with("total"));
    }

    #[test]
    fn test_raw_cells() {
        let row = ReportRow { name: "x".into(), inference: 1234.0, ..Default::default() };
        assert_eq!(row.cells(true)[1], "1234");
        assert_eq!(row.cells(false)[1], "1.23K");
    }
}
