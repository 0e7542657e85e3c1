use std::collections::HashMap;

use super::{CellValue, HeatmapPlotData, NUM_CELLS};
use crate::models::{
    entity_label, AnomalyRecord, DateRange, Entity, EntityAnomalySummaries,
};

/// Where the heatmap rows come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeatmapDataKind {
    /// Backend-aggregated summaries, already limited to the requested top-N.
    Aggregated,
    /// Raw anomaly results (preview/sample data), bucketed client-side.
    Sample,
}

impl HeatmapDataKind {
    /// Aggregated data only holds the top-N the backend was asked for, so a
    /// different top-N needs a new request.
    pub fn refetches_on_top_n_change(self) -> bool {
        matches!(self, Self::Aggregated)
    }
}

pub trait HeatmapStrategy {
    fn kind(&self) -> HeatmapDataKind;

    fn build(&self, range: &DateRange, top_n: usize) -> HeatmapPlotData;
}

/// Column starts and the width of one column for `range`.
pub fn time_buckets(range: &DateRange) -> (Vec<i64>, i64) {
    let span = range.span_ms();
    let cells = NUM_CELLS as i64;
    let interval = ((span + cells - 1) / cells).max(1);
    let starts = (0..cells).map(|idx| range.start_ms + idx * interval).collect();
    (starts, interval)
}

/// Column of `range` that counts `ts_ms`. Columns are half-open except the
/// last one, which also takes the closing instant of the range.
pub fn column_of(range: &DateRange, ts_ms: i64) -> Option<usize> {
    let (_, interval) = time_buckets(range);
    bucket_index(range, interval, ts_ms)
}

fn bucket_index(range: &DateRange, interval: i64, ts_ms: i64) -> Option<usize> {
    if !range.contains(ts_ms) {
        return None;
    }
    let idx = ((ts_ms - range.start_ms) / interval) as usize;
    Some(idx.min(NUM_CELLS - 1))
}

struct EntityRow {
    entity: Vec<Entity>,
    model_id: Option<String>,
    cells: Vec<CellValue>,
}

impl EntityRow {
    fn new(entity: Vec<Entity>, model_id: Option<String>) -> Self {
        Self {
            entity,
            model_id,
            cells: vec![CellValue::default(); NUM_CELLS],
        }
    }

    fn record(&mut self, bucket: usize, severity: f64, occurrences: u32) {
        let cell = &mut self.cells[bucket];
        cell.severity = cell.severity.max(severity);
        cell.occurrences += occurrences;
    }

    fn total_severity(&self) -> f64 {
        self.cells.iter().map(|cell| cell.severity).sum()
    }
}

/// Keeps the `top_n` rows with the highest total severity. The sort is
/// stable, so equal totals keep their input order.
fn assemble(mut rows: Vec<EntityRow>, x: Vec<i64>, interval: i64, top_n: usize) -> HeatmapPlotData {
    rows.sort_by(|a, b| b.total_severity().total_cmp(&a.total_severity()));
    rows.truncate(top_n);

    let mut grid = HeatmapPlotData::empty(x, interval);
    for row in rows {
        grid.y.push(entity_label(&row.entity));
        grid.entities.push(row.entity);
        grid.model_ids.push(row.model_id);
        grid.cells.push(row.cells.into_iter().map(Some).collect());
    }
    grid
}

#[derive(Clone, Debug, Default)]
pub struct SummaryStrategy {
    summaries: Vec<EntityAnomalySummaries>,
}

impl SummaryStrategy {
    pub fn new(summaries: Vec<EntityAnomalySummaries>) -> Self {
        Self { summaries }
    }
}

impl HeatmapStrategy for SummaryStrategy {
    fn kind(&self) -> HeatmapDataKind {
        HeatmapDataKind::Aggregated
    }

    fn build(&self, range: &DateRange, top_n: usize) -> HeatmapPlotData {
        let (x, interval) = time_buckets(range);
        let rows = self
            .summaries
            .iter()
            .map(|summary| {
                let mut row = EntityRow::new(summary.entity.clone(), summary.model_id.clone());
                for bucket in &summary.buckets {
                    if let Some(idx) = bucket_index(range, interval, bucket.start_ms) {
                        row.record(idx, bucket.max_anomaly_grade, bucket.anomaly_count);
                    }
                }
                row
            })
            .collect();
        assemble(rows, x, interval, top_n)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SampleStrategy {
    anomalies: Vec<AnomalyRecord>,
}

impl SampleStrategy {
    pub fn new(anomalies: Vec<AnomalyRecord>) -> Self {
        Self { anomalies }
    }
}

impl HeatmapStrategy for SampleStrategy {
    fn kind(&self) -> HeatmapDataKind {
        HeatmapDataKind::Sample
    }

    fn build(&self, range: &DateRange, top_n: usize) -> HeatmapPlotData {
        let (x, interval) = time_buckets(range);
        let mut rows: Vec<EntityRow> = Vec::new();
        let mut row_by_label: HashMap<String, usize> = HashMap::new();

        for record in &self.anomalies {
            let label = entity_label(&record.entity);
            let row_idx = *row_by_label.entry(label).or_insert_with(|| {
                rows.push(EntityRow::new(record.entity.clone(), record.model_id.clone()));
                rows.len() - 1
            });

            if !record.is_anomaly() {
                continue;
            }
            if let Some(bucket) = bucket_index(range, interval, record.start_ms) {
                rows[row_idx].record(bucket, record.anomaly_grade, 1);
            }
        }

        assemble(rows, x, interval, top_n)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::AnomalySummaryBucket;

    pub(crate) fn host(value: &str) -> Vec<Entity> {
        vec![Entity {
            name: "host".into(),
            value: value.into(),
        }]
    }

    pub(crate) fn range() -> DateRange {
        DateRange::new(0, 2_000)
    }

    #[test]
    fn bucket_boundaries_belong_to_the_next_column() {
        assert_eq!(column_of(&range(), 0), Some(0));
        assert_eq!(column_of(&range(), 99), Some(0));
        assert_eq!(column_of(&range(), 100), Some(1));
        assert_eq!(column_of(&range(), 2_000), Some(NUM_CELLS - 1));
        assert_eq!(column_of(&range(), 2_001), None);
        assert_eq!(column_of(&range(), -1), None);
    }

    fn summary(value: &str, buckets: &[(i64, f64, u32)]) -> EntityAnomalySummaries {
        EntityAnomalySummaries {
            entity: host(value),
            model_id: Some(format!("model-{value}")),
            buckets: buckets
                .iter()
                .map(|(start_ms, grade, count)| AnomalySummaryBucket {
                    start_ms: *start_ms,
                    end_ms: start_ms + 100,
                    max_anomaly_grade: *grade,
                    anomaly_count: *count,
                })
                .collect(),
        }
    }

    fn anomaly(value: &str, start_ms: i64, grade: f64) -> AnomalyRecord {
        AnomalyRecord {
            entity: host(value),
            model_id: None,
            start_ms,
            end_ms: start_ms + 10,
            anomaly_grade: grade,
            confidence: 0.9,
        }
    }

    #[test]
    fn buckets_cover_range_deterministically() {
        let (x, interval) = time_buckets(&range());
        assert_eq!(x.len(), NUM_CELLS);
        assert_eq!(interval, 100);
        assert_eq!(x[0], 0);
        assert_eq!(x[19], 1_900);
        assert_eq!(time_buckets(&range()), (x, interval));

        let (_, interval) = time_buckets(&DateRange::new(5, 5));
        assert_eq!(interval, 1);
    }

    #[test]
    fn summary_path_ranks_by_total_severity() {
        let strategy = SummaryStrategy::new(vec![
            summary("a", &[(0, 0.2, 1)]),
            summary("b", &[(100, 0.9, 3), (1_950, 0.5, 1)]),
            summary("c", &[(0, 0.2, 2)]),
            summary("d", &[]),
        ]);
        let grid = strategy.build(&range(), 3);

        assert_eq!(strategy.kind(), HeatmapDataKind::Aggregated);
        assert_eq!(grid.y, vec!["host: b", "host: a", "host: c"]);
        assert_eq!(grid.column_count(), NUM_CELLS);
        assert!(grid.cells.iter().all(|row| row.len() == NUM_CELLS));

        let b_row = &grid.cells[0];
        assert_eq!(b_row[1].unwrap().occurrences, 3);
        assert_eq!(b_row[19].unwrap().severity, 0.5);
        assert_eq!(grid.model_ids[0].as_deref(), Some("model-b"));
    }

    #[test]
    fn summary_buckets_outside_range_are_dropped() {
        let strategy = SummaryStrategy::new(vec![summary("a", &[(5_000, 1.0, 4)])]);
        let grid = strategy.build(&range(), 10);
        assert_eq!(grid.row_occurrences(0), 0);
    }

    #[test]
    fn sample_path_buckets_raw_anomalies() {
        let strategy = SampleStrategy::new(vec![
            anomaly("a", 10, 0.3),
            anomaly("a", 20, 0.6),
            anomaly("b", 150, 0.0),
            anomaly("c", 2_000, 0.4),
        ]);
        let grid = strategy.build(&range(), 10);

        assert_eq!(strategy.kind(), HeatmapDataKind::Sample);
        assert_eq!(grid.y, vec!["host: a", "host: c", "host: b"]);
        let first = grid.cells[0][0].unwrap();
        assert_eq!(first.occurrences, 2);
        assert_eq!(first.severity, 0.6);
        assert_eq!(grid.cells[1][19].unwrap().occurrences, 1);
        assert_eq!(grid.row_occurrences(2), 0);
    }

    #[test]
    fn sample_path_respects_top_n() {
        let strategy = SampleStrategy::new(vec![
            anomaly("a", 10, 0.1),
            anomaly("b", 10, 0.9),
            anomaly("c", 10, 0.5),
        ]);
        let grid = strategy.build(&range(), 2);
        assert_eq!(grid.y, vec!["host: b", "host: c"]);
    }
}
