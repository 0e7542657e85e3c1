use super::builder::{HeatmapDataKind, HeatmapStrategy};
use super::{
    CellPosition, EntityOption, HeatmapCell, HeatmapDisplayOption, HeatmapPlotData, SortType,
    DIMMED_OPACITY, FULL_OPACITY,
};
use crate::models::DateRange;

fn row_score(grid: &HeatmapPlotData, row: usize, sort_type: SortType) -> f64 {
    match sort_type {
        SortType::Severity => grid.row_severity(row),
        SortType::Occurrence => grid.row_occurrences(row) as f64,
    }
}

fn ranked_rows(grid: &HeatmapPlotData, rows: &[usize], sort_type: SortType) -> Vec<usize> {
    let mut ranked = rows.to_vec();
    ranked.sort_by(|a, b| {
        row_score(grid, *b, sort_type).total_cmp(&row_score(grid, *a, sort_type))
    });
    ranked
}

/// Re-ranks rows by cumulative severity or occurrence (descending) and keeps
/// the first `top_n`. Cell values and columns are untouched.
pub fn sort_heatmap_plot_data(
    grid: &HeatmapPlotData,
    sort_type: SortType,
    top_n: usize,
) -> HeatmapPlotData {
    let all: Vec<usize> = (0..grid.row_count()).collect();
    let mut ranked = ranked_rows(grid, &all, sort_type);
    ranked.truncate(top_n);
    grid.take_rows(&ranked)
}

/// Restricts the grid to `labels`. With `sort_type == None` rows follow the
/// order of `labels`; otherwise they are ranked by `sort_type`. Labels that
/// are not in the grid are skipped.
pub fn filter_heatmap_plot_data_by_y(
    grid: &HeatmapPlotData,
    labels: &[String],
    sort_type: Option<SortType>,
) -> HeatmapPlotData {
    let mut rows: Vec<usize> = Vec::with_capacity(labels.len());
    for label in labels {
        if let Some(row) = grid.row_index(label) {
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
    }
    if let Some(sort_type) = sort_type {
        rows = ranked_rows(grid, &rows, sort_type);
    }
    grid.take_rows(&rows)
}

/// Overlay holding only the clicked cell at full opacity. `None` when the
/// cell has no anomalies or is the one already selected.
pub fn select_cell(
    grid: &HeatmapPlotData,
    pos: CellPosition,
    current: Option<CellPosition>,
) -> Option<HeatmapPlotData> {
    if current == Some(pos) {
        return None;
    }
    let value = grid.cell(pos)?;
    if value.occurrences == 0 {
        return None;
    }

    let mut overlay = grid.take_rows(&(0..grid.row_count()).collect::<Vec<_>>());
    for (row_idx, row) in overlay.cells.iter_mut().enumerate() {
        for (col_idx, cell) in row.iter_mut().enumerate() {
            if row_idx != pos.y || col_idx != pos.x {
                *cell = None;
            }
        }
    }
    Some(overlay.with_opacity(FULL_OPACITY))
}

pub fn heatmap_cell_at(grid: &HeatmapPlotData, pos: CellPosition) -> Option<HeatmapCell> {
    let date_range = grid.cell_date_range(pos.x)?;
    let entity_list = grid.entities.get(pos.y)?.clone();
    let model_id = grid.model_ids.get(pos.y).cloned().flatten();
    Some(HeatmapCell {
        date_range,
        entity_list,
        model_id,
    })
}

#[derive(Clone, Debug)]
pub enum HeatmapMessage {
    SetSortType(SortType),
    SetEntityOption(EntityOption),
    ClickCell(CellPosition),
    ClearSelection,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HeatmapEffect {
    /// The selected cell changed; `None` means nothing is selected.
    SelectionChanged(Option<HeatmapCell>),
    /// Aggregated data must be requested again for a new top-N.
    RefetchSummary { top_n: usize },
}

/// Heatmap view model for one chart. Owns the grid built from the last
/// payload and derives the displayed slice from the display option.
pub struct HeatmapInteraction {
    kind: HeatmapDataKind,
    range: DateRange,
    display: HeatmapDisplayOption,
    original: HeatmapPlotData,
    current: HeatmapPlotData,
    overlay: Option<HeatmapPlotData>,
    selected: Option<CellPosition>,
}

impl HeatmapInteraction {
    pub fn new(
        strategy: &dyn HeatmapStrategy,
        range: DateRange,
        display: HeatmapDisplayOption,
    ) -> Self {
        let original = strategy.build(&range, usize::MAX);
        let mut interaction = Self {
            kind: strategy.kind(),
            range,
            current: original.clone(),
            original,
            display,
            overlay: None,
            selected: None,
        };
        interaction.recompute();
        interaction
    }

    /// Swaps in freshly fetched data, keeping the display option.
    pub fn replace_data(&mut self, strategy: &dyn HeatmapStrategy, range: DateRange) {
        self.kind = strategy.kind();
        self.range = range;
        self.original = strategy.build(&range, usize::MAX);
        self.overlay = None;
        self.selected = None;
        self.recompute();
    }

    pub fn kind(&self) -> HeatmapDataKind {
        self.kind
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn display_option(&self) -> &HeatmapDisplayOption {
        &self.display
    }

    pub fn plot(&self) -> &HeatmapPlotData {
        &self.current
    }

    pub fn overlay(&self) -> Option<&HeatmapPlotData> {
        self.overlay.as_ref()
    }

    pub fn selected(&self) -> Option<CellPosition> {
        self.selected
    }

    /// Every entity label available for the "individual entities" picker.
    pub fn entity_labels(&self) -> &[String] {
        &self.original.y
    }

    pub fn update(&mut self, message: HeatmapMessage) -> Vec<HeatmapEffect> {
        match message {
            HeatmapMessage::SetSortType(sort_type) => {
                self.display.sort_type = sort_type;
                let effects = self.clear_selection();
                self.recompute();
                effects
            }
            HeatmapMessage::SetEntityOption(option) => {
                let refetch = match (&option, &self.display.entity_option) {
                    (EntityOption::TopN(next), EntityOption::TopN(prev)) => {
                        self.kind.refetches_on_top_n_change() && next != prev
                    }
                    (EntityOption::TopN(_), EntityOption::Individual(_)) => {
                        self.kind.refetches_on_top_n_change()
                    }
                    (EntityOption::Individual(_), _) => false,
                };
                let top_n = match &option {
                    EntityOption::TopN(n) => *n,
                    EntityOption::Individual(labels) => labels.len(),
                };
                self.display.entity_option = option;
                let mut effects = self.clear_selection();
                self.recompute();
                if refetch {
                    effects.push(HeatmapEffect::RefetchSummary { top_n });
                }
                effects
            }
            HeatmapMessage::ClickCell(pos) => {
                match select_cell(&self.current, pos, self.selected) {
                    Some(overlay) => {
                        self.overlay = Some(overlay);
                        self.selected = Some(pos);
                        self.current.opacity = DIMMED_OPACITY;
                        vec![HeatmapEffect::SelectionChanged(heatmap_cell_at(
                            &self.current,
                            pos,
                        ))]
                    }
                    None => {
                        self.reset_selection();
                        vec![HeatmapEffect::SelectionChanged(None)]
                    }
                }
            }
            HeatmapMessage::ClearSelection => self.clear_selection(),
        }
    }

    fn reset_selection(&mut self) {
        self.overlay = None;
        self.selected = None;
        self.current.opacity = FULL_OPACITY;
    }

    fn clear_selection(&mut self) -> Vec<HeatmapEffect> {
        let had_selection = self.selected.is_some();
        self.reset_selection();
        if had_selection {
            vec![HeatmapEffect::SelectionChanged(None)]
        } else {
            Vec::new()
        }
    }

    fn recompute(&mut self) {
        self.current = match &self.display.entity_option {
            EntityOption::TopN(top_n) => {
                sort_heatmap_plot_data(&self.original, self.display.sort_type, *top_n)
            }
            EntityOption::Individual(labels) => {
                filter_heatmap_plot_data_by_y(&self.original, labels, None)
            }
        }
        .with_opacity(FULL_OPACITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::builder::tests::{host, range};
    use crate::heatmap::builder::{SampleStrategy, SummaryStrategy};
    use crate::heatmap::{CellValue, NUM_CELLS};
    use crate::models::{AnomalyRecord, AnomalySummaryBucket, EntityAnomalySummaries};
    use proptest::prelude::*;

    fn anomaly(value: &str, start_ms: i64, grade: f64) -> AnomalyRecord {
        AnomalyRecord {
            entity: host(value),
            model_id: Some(format!("m-{value}")),
            start_ms,
            end_ms: start_ms + 10,
            anomaly_grade: grade,
            confidence: 1.0,
        }
    }

    /// a: one severe anomaly; b: many mild ones; c: none.
    fn sample() -> SampleStrategy {
        SampleStrategy::new(vec![
            anomaly("a", 10, 0.9),
            anomaly("b", 10, 0.1),
            anomaly("b", 20, 0.1),
            anomaly("b", 30, 0.1),
            anomaly("b", 150, 0.1),
            anomaly("c", 10, 0.0),
        ])
    }

    fn labels(grid: &HeatmapPlotData) -> Vec<&str> {
        grid.y.iter().map(String::as_str).collect()
    }

    #[test]
    fn sort_changes_only_row_order() {
        let grid = sample().build(&range(), usize::MAX);
        let by_severity = sort_heatmap_plot_data(&grid, SortType::Severity, 10);
        let by_occurrence = sort_heatmap_plot_data(&grid, SortType::Occurrence, 10);

        assert_eq!(labels(&by_severity), vec!["host: a", "host: b", "host: c"]);
        assert_eq!(labels(&by_occurrence), vec!["host: b", "host: a", "host: c"]);
        assert_eq!(by_occurrence.x, grid.x);

        let a = grid.row_index("host: a").unwrap();
        let a_sorted = by_occurrence.row_index("host: a").unwrap();
        assert_eq!(grid.cells[a], by_occurrence.cells[a_sorted]);
    }

    #[test]
    fn sort_keeps_top_n() {
        let grid = sample().build(&range(), usize::MAX);
        let top = sort_heatmap_plot_data(&grid, SortType::Occurrence, 1);
        assert_eq!(labels(&top), vec!["host: b"]);
    }

    #[test]
    fn filter_preserves_requested_order() {
        let grid = sample().build(&range(), usize::MAX);
        let wanted = vec!["host: c".to_string(), "host: a".to_string(), "host: zz".to_string()];

        let explicit = filter_heatmap_plot_data_by_y(&grid, &wanted, None);
        assert_eq!(labels(&explicit), vec!["host: c", "host: a"]);

        let resorted = filter_heatmap_plot_data_by_y(&grid, &wanted, Some(SortType::Severity));
        assert_eq!(labels(&resorted), vec!["host: a", "host: c"]);
    }

    #[test]
    fn select_cell_builds_single_cell_overlay() {
        let grid = sample().build(&range(), usize::MAX);
        let pos = CellPosition { x: 0, y: 0 };
        let overlay = select_cell(&grid, pos, None).unwrap();

        assert_eq!(overlay.opacity, FULL_OPACITY);
        let drawn: Vec<CellValue> = overlay.cells.iter().flatten().flatten().copied().collect();
        assert_eq!(drawn.len(), 1);
        assert_eq!(overlay.cell(pos), grid.cell(pos));

        assert!(select_cell(&grid, pos, Some(pos)).is_none());
        let empty = CellPosition { x: 5, y: 0 };
        assert!(select_cell(&grid, empty, None).is_none());
        assert!(select_cell(&grid, CellPosition { x: NUM_CELLS, y: 0 }, None).is_none());
    }

    #[test]
    fn clicking_twice_toggles_selection() {
        let mut view = HeatmapInteraction::new(&sample(), range(), HeatmapDisplayOption::default());
        let pos = CellPosition { x: 0, y: 0 };

        let effects = view.update(HeatmapMessage::ClickCell(pos));
        let HeatmapEffect::SelectionChanged(Some(cell)) = &effects[0] else {
            panic!("expected a selected cell, got {effects:?}");
        };
        assert_eq!(cell.entity_list, host("a"));
        assert_eq!(cell.date_range, DateRange::new(0, 100));
        assert_eq!(cell.model_id.as_deref(), Some("m-a"));
        assert_eq!(view.plot().opacity, DIMMED_OPACITY);
        assert!(view.overlay().is_some());

        let effects = view.update(HeatmapMessage::ClickCell(pos));
        assert_eq!(effects, vec![HeatmapEffect::SelectionChanged(None)]);
        assert_eq!(view.plot().opacity, FULL_OPACITY);
        assert!(view.overlay().is_none());
        assert!(view.selected().is_none());
    }

    #[test]
    fn clicking_another_cell_replaces_selection() {
        let mut view = HeatmapInteraction::new(&sample(), range(), HeatmapDisplayOption::default());
        view.update(HeatmapMessage::ClickCell(CellPosition { x: 0, y: 0 }));
        let next = CellPosition { x: 1, y: 1 };
        let effects = view.update(HeatmapMessage::ClickCell(next));

        assert_eq!(view.selected(), Some(next));
        assert!(matches!(&effects[..], [HeatmapEffect::SelectionChanged(Some(_))]));
        let overlay = view.overlay().unwrap();
        assert_eq!(overlay.cells.iter().flatten().flatten().count(), 1);
    }

    #[test]
    fn zero_occurrence_click_leaves_nothing_selected() {
        let mut view = HeatmapInteraction::new(&sample(), range(), HeatmapDisplayOption::default());
        let effects = view.update(HeatmapMessage::ClickCell(CellPosition { x: 7, y: 2 }));
        assert_eq!(effects, vec![HeatmapEffect::SelectionChanged(None)]);
        assert!(view.selected().is_none());
        assert_eq!(view.plot().opacity, FULL_OPACITY);
    }

    #[test]
    fn sort_change_clears_selection() {
        let mut view = HeatmapInteraction::new(&sample(), range(), HeatmapDisplayOption::default());
        view.update(HeatmapMessage::ClickCell(CellPosition { x: 0, y: 0 }));
        let effects = view.update(HeatmapMessage::SetSortType(SortType::Occurrence));
        assert_eq!(effects, vec![HeatmapEffect::SelectionChanged(None)]);
        assert_eq!(labels(view.plot()), vec!["host: b", "host: a", "host: c"]);
    }

    #[test]
    fn individual_entities_follow_requested_order() {
        let mut view = HeatmapInteraction::new(&sample(), range(), HeatmapDisplayOption::default());
        let wanted = vec!["host: c".to_string(), "host: b".to_string()];
        let effects =
            view.update(HeatmapMessage::SetEntityOption(EntityOption::Individual(wanted)));
        assert!(effects.is_empty());
        assert_eq!(labels(view.plot()), vec!["host: c", "host: b"]);
        assert_eq!(view.entity_labels().len(), 3);
    }

    #[test]
    fn top_n_change_refetches_only_aggregated_data() {
        let mut sample_view =
            HeatmapInteraction::new(&sample(), range(), HeatmapDisplayOption::default());
        let effects = sample_view.update(HeatmapMessage::SetEntityOption(EntityOption::TopN(1)));
        assert!(effects.is_empty());
        assert_eq!(sample_view.plot().row_count(), 1);

        let summary = SummaryStrategy::new(vec![EntityAnomalySummaries {
            entity: host("a"),
            model_id: None,
            buckets: vec![AnomalySummaryBucket {
                start_ms: 0,
                end_ms: 100,
                max_anomaly_grade: 0.5,
                anomaly_count: 2,
            }],
        }]);
        let mut summary_view =
            HeatmapInteraction::new(&summary, range(), HeatmapDisplayOption::default());
        let effects = summary_view.update(HeatmapMessage::SetEntityOption(EntityOption::TopN(20)));
        assert_eq!(effects, vec![HeatmapEffect::RefetchSummary { top_n: 20 }]);

        let effects = summary_view.update(HeatmapMessage::SetEntityOption(EntityOption::TopN(20)));
        assert!(effects.is_empty());
    }

    fn arb_grid() -> impl Strategy<Value = HeatmapPlotData> {
        prop::collection::vec(
            (0usize..6, 0i64..2_000, prop_oneof![Just(0.0), 0.01f64..1.0]),
            0..40,
        )
        .prop_map(|records| {
            let anomalies = records
                .into_iter()
                .map(|(entity, start_ms, grade)| anomaly(&entity.to_string(), start_ms, grade))
                .collect();
            SampleStrategy::new(anomalies).build(&range(), usize::MAX)
        })
    }

    proptest! {
        #[test]
        fn sorting_twice_is_idempotent(grid in arb_grid(), occurrence in prop::bool::ANY, top_n in 1usize..8) {
            let sort_type = if occurrence { SortType::Occurrence } else { SortType::Severity };
            let once = sort_heatmap_plot_data(&grid, sort_type, top_n);
            let twice = sort_heatmap_plot_data(&once, sort_type, top_n);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn derived_slices_keep_columns(grid in arb_grid()) {
            let sorted = sort_heatmap_plot_data(&grid, SortType::Occurrence, 3);
            let filtered = filter_heatmap_plot_data_by_y(&grid, &grid.y, None);
            prop_assert_eq!(&sorted.x, &grid.x);
            prop_assert_eq!(&filtered, &grid);
            for row in sorted.cells.iter() {
                prop_assert_eq!(row.len(), grid.column_count());
            }
        }
    }
}
