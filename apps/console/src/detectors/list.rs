//! View model for the detector list page.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::models::{DetectorListItem, DetectorState};
use crate::query::{GetDetectorsQueryParams, SortDirection};

/// Client-side refinements layered on top of a fetched page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectorListFilters {
    pub states: BTreeSet<DetectorState>,
}

impl DetectorListFilters {
    pub fn toggle_state(&mut self, state: DetectorState) {
        if !self.states.insert(state) {
            self.states.remove(&state);
        }
    }

    pub fn is_selected(&self, state: DetectorState) -> bool {
        self.states.contains(&state)
    }

    pub fn matches(&self, item: &DetectorListItem) -> bool {
        self.states.is_empty() || self.is_selected(item.cur_state)
    }
}

/// Applies state filters and the sort encoded in `params` to one page of detectors.
pub fn visible_detectors(
    items: &[DetectorListItem],
    params: &GetDetectorsQueryParams,
    filters: &DetectorListFilters,
) -> Vec<DetectorListItem> {
    let mut visible: Vec<DetectorListItem> = items
        .iter()
        .filter(|item| filters.matches(item))
        .cloned()
        .collect();

    visible.sort_by(|a, b| {
        let ordering = compare_by_field(a, b, &params.sort_field);
        match params.sort_direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    visible
}

fn compare_by_field(a: &DetectorListItem, b: &DetectorListItem, field: &str) -> Ordering {
    match field {
        "indices" => a.indices.join(",").cmp(&b.indices.join(",")),
        "curState" => a.cur_state.label().cmp(b.cur_state.label()),
        "totalAnomalies" => a.total_anomalies.cmp(&b.total_anomalies),
        "lastActiveAnomaly" => a.last_active_time_ms.cmp(&b.last_active_time_ms),
        "lastUpdateTime" => a.last_update_time_ms.cmp(&b.last_update_time_ms),
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    }
}

pub fn page_count(total: usize, size: usize) -> usize {
    if size == 0 {
        0
    } else {
        total.div_ceil(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, state: DetectorState, anomalies: u64) -> DetectorListItem {
        DetectorListItem {
            id: name.into(),
            name: name.into(),
            cur_state: state,
            total_anomalies: anomalies,
            ..Default::default()
        }
    }

    #[test]
    fn sorts_by_requested_field_and_direction() {
        let items = vec![
            item("beta", DetectorState::Running, 3),
            item("Alpha", DetectorState::Disabled, 9),
            item("gamma", DetectorState::Running, 1),
        ];
        let params = GetDetectorsQueryParams::parse("sortField=totalAnomalies&sortDirection=desc");
        let names: Vec<_> = visible_detectors(&items, &params, &DetectorListFilters::default())
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);

        let by_name = GetDetectorsQueryParams::default();
        let names: Vec<_> = visible_detectors(&items, &by_name, &DetectorListFilters::default())
            .into_iter()
            .map(|item| item.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn state_filter_toggles() {
        let items = vec![
            item("a", DetectorState::Running, 0),
            item("b", DetectorState::Disabled, 0),
        ];
        let mut filters = DetectorListFilters::default();
        filters.toggle_state(DetectorState::Disabled);
        let visible = visible_detectors(&items, &GetDetectorsQueryParams::default(), &filters);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "b");

        filters.toggle_state(DetectorState::Disabled);
        assert!(filters.states.is_empty());
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(41, 20), 3);
        assert_eq!(page_count(5, 0), 0);
    }
}
