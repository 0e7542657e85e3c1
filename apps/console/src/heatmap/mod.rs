//! Entity × time-bucket anomaly heatmap.
//!
//! [`builder`] turns backend payloads into a [`HeatmapPlotData`] grid and
//! [`interaction`] re-slices that grid for sorting, entity filtering and
//! cell selection without going back to the backend.

pub mod builder;
pub mod interaction;

use serde::{Deserialize, Serialize};

use crate::models::{DateRange, Entity};

/// Fixed number of time buckets across the selected date range.
pub const NUM_CELLS: usize = 20;
pub const FULL_OPACITY: f64 = 1.0;
pub const DIMMED_OPACITY: f64 = 0.2;
pub const DEFAULT_TOP_N: usize = 10;
pub const TOP_N_OPTIONS: [usize; 3] = [10, 20, 30];

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    #[default]
    Severity,
    Occurrence,
}

impl SortType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Severity => "By severity",
            Self::Occurrence => "By occurrence",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityOption {
    TopN(usize),
    Individual(Vec<String>),
}

impl Default for EntityOption {
    fn default() -> Self {
        EntityOption::TopN(DEFAULT_TOP_N)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeatmapDisplayOption {
    pub sort_type: SortType,
    pub entity_option: EntityOption,
}

/// Selection produced by clicking a heatmap cell.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapCell {
    pub date_range: DateRange,
    pub entity_list: Vec<Entity>,
    pub model_id: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellValue {
    /// Highest anomaly grade seen in the bucket, drives the cell color.
    pub severity: f64,
    /// Number of anomalies in the bucket, drawn as cell text.
    pub occurrences: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellPosition {
    pub x: usize,
    pub y: usize,
}

/// Plot-ready grid. Rows follow `y`, columns follow `x`; every row of
/// `cells` has exactly `x.len()` entries. `None` cells are not drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatmapPlotData {
    pub x: Vec<i64>,
    pub y: Vec<String>,
    pub entities: Vec<Vec<Entity>>,
    pub model_ids: Vec<Option<String>>,
    pub cells: Vec<Vec<Option<CellValue>>>,
    pub opacity: f64,
    pub cell_time_interval_ms: i64,
}

impl HeatmapPlotData {
    pub fn empty(x: Vec<i64>, cell_time_interval_ms: i64) -> Self {
        Self {
            x,
            y: Vec::new(),
            entities: Vec::new(),
            model_ids: Vec::new(),
            cells: Vec::new(),
            opacity: FULL_OPACITY,
            cell_time_interval_ms,
        }
    }

    pub fn row_count(&self) -> usize {
        self.y.len()
    }

    pub fn column_count(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn cell(&self, pos: CellPosition) -> Option<CellValue> {
        self.cells.get(pos.y).and_then(|row| row.get(pos.x)).copied().flatten()
    }

    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.y.iter().position(|candidate| candidate == label)
    }

    pub fn row_severity(&self, row: usize) -> f64 {
        self.cells
            .get(row)
            .map(|cells| cells.iter().flatten().map(|cell| cell.severity).sum())
            .unwrap_or_default()
    }

    pub fn row_occurrences(&self, row: usize) -> u64 {
        self.cells
            .get(row)
            .map(|cells| {
                cells
                    .iter()
                    .flatten()
                    .map(|cell| u64::from(cell.occurrences))
                    .sum()
            })
            .unwrap_or_default()
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Exact time span covered by column `x`.
    pub fn cell_date_range(&self, x: usize) -> Option<DateRange> {
        self.x
            .get(x)
            .map(|start| DateRange::new(*start, start + self.cell_time_interval_ms))
    }

    /// Copies the listed rows, in the listed order. Columns are untouched.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        let mut grid = Self::empty(self.x.clone(), self.cell_time_interval_ms);
        grid.opacity = self.opacity;
        for &row in rows {
            if row >= self.row_count() {
                continue;
            }
            grid.y.push(self.y[row].clone());
            grid.entities.push(self.entities[row].clone());
            grid.model_ids.push(self.model_ids[row].clone());
            grid.cells.push(self.cells[row].clone());
        }
        grid
    }
}

/// Cell fill for an anomaly grade in `[0, 1]`: pale at low severity,
/// deep red at 1. Empty buckets are drawn neutral.
pub fn severity_color(cell: Option<CellValue>) -> String {
    const LOW: (f64, f64, f64) = (254.0, 224.0, 210.0);
    const HIGH: (f64, f64, f64) = (165.0, 15.0, 21.0);
    match cell {
        Some(value) if value.occurrences > 0 => {
            let t = value.severity.clamp(0.0, 1.0);
            let mix = |low: f64, high: f64| (low + (high - low) * t).round() as u8;
            format!(
                "rgb({}, {}, {})",
                mix(LOW.0, HIGH.0),
                mix(LOW.1, HIGH.1),
                mix(LOW.2, HIGH.2)
            )
        }
        _ => "rgb(241, 245, 249)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> HeatmapPlotData {
        let mut grid = HeatmapPlotData::empty(vec![0, 10], 10);
        for (label, severity) in [("a", 0.5), ("b", 0.9)] {
            grid.y.push(label.to_string());
            grid.entities.push(Vec::new());
            grid.model_ids.push(None);
            grid.cells.push(vec![
                Some(CellValue {
                    severity,
                    occurrences: 1,
                }),
                None,
            ]);
        }
        grid
    }

    #[test]
    fn take_rows_keeps_columns_aligned() {
        let grid = grid();
        let picked = grid.take_rows(&[1, 5, 0]);
        assert_eq!(picked.y, vec!["b", "a"]);
        assert_eq!(picked.x, grid.x);
        assert!(picked.cells.iter().all(|row| row.len() == picked.column_count()));
        assert_eq!(picked.row_severity(0), 0.9);
        assert_eq!(picked.row_occurrences(1), 1);
    }

    #[test]
    fn cell_ranges_use_bucket_width() {
        let grid = grid();
        assert_eq!(grid.cell_date_range(1), Some(DateRange::new(10, 20)));
        assert_eq!(grid.cell_date_range(2), None);
        assert_eq!(grid.cell(CellPosition { x: 1, y: 0 }), None);
    }

    #[test]
    fn severity_scale() {
        assert_eq!(severity_color(None), "rgb(241, 245, 249)");
        let zero = CellValue {
            severity: 0.0,
            occurrences: 0,
        };
        assert_eq!(severity_color(Some(zero)), "rgb(241, 245, 249)");
        let max = CellValue {
            severity: 2.0,
            occurrences: 3,
        };
        assert_eq!(severity_color(Some(max)), "rgb(165, 15, 21)");
    }
}
