use dioxus::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::api::ClientError;
use crate::detectors::list::DetectorListFilters;
use crate::heatmap::builder::HeatmapDataKind;
use crate::models::{
    AnomalyRecord, DateRange, Detector, DetectorListItem, DetectorListPage, DetectorState,
    EntityAnomalySummaries, Monitor,
};
use crate::query::GetDetectorsQueryParams;

pub type AppSignal = Signal<AppState>;

/// Ticket handed out when a load starts; only the latest ticket may land.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestTicket(u64);

/// Generation counter guarding a panel against out-of-order responses.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestTracker {
    latest: u64,
}

impl RequestTracker {
    pub fn issue(&mut self) -> RequestTicket {
        self.latest += 1;
        RequestTicket(self.latest)
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        ticket.0 == self.latest
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectorListState {
    pub params: GetDetectorsQueryParams,
    pub items: Vec<DetectorListItem>,
    pub total: usize,
    #[serde(default)]
    pub monitors: HashMap<String, Monitor>,
    #[serde(skip)]
    pub filters: DetectorListFilters,
    #[serde(default)]
    pub selected: BTreeSet<String>,
    pub is_loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    tracker: RequestTracker,
}

impl DetectorListState {
    pub fn begin_load(&mut self, params: GetDetectorsQueryParams) -> RequestTicket {
        self.params = params;
        self.is_loading = true;
        self.error = None;
        self.tracker.issue()
    }

    /// Applies a finished load. Returns `false` when a newer load superseded it.
    pub fn finish_load(
        &mut self,
        ticket: RequestTicket,
        result: Result<DetectorListPage, String>,
    ) -> bool {
        if !self.tracker.is_current(ticket) {
            tracing::debug!(?ticket, "dropping stale detector list response");
            return false;
        }
        self.is_loading = false;
        match result {
            Ok(page) => {
                self.total = page.total_detectors;
                self.items = page.detector_list;
                let ids: BTreeSet<&str> = self.items.iter().map(|item| item.id.as_str()).collect();
                self.selected.retain(|id| ids.contains(id.as_str()));
                self.monitors.retain(|id, _| ids.contains(id.as_str()));
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }

    pub fn set_monitors(&mut self, ticket: RequestTicket, monitors: HashMap<String, Monitor>) {
        if self.tracker.is_current(ticket) {
            self.monitors = monitors;
        }
    }

    pub fn toggle_selected(&mut self, detector_id: &str) {
        if !self.selected.remove(detector_id) {
            self.selected.insert(detector_id.to_string());
        }
    }

    pub fn set_all_selected(&mut self, ids: impl IntoIterator<Item = String>, selected: bool) {
        if selected {
            self.selected.extend(ids);
        } else {
            self.selected.clear();
        }
    }

    pub fn selected_items(&self) -> Vec<DetectorListItem> {
        self.items
            .iter()
            .filter(|item| self.selected.contains(&item.id))
            .cloned()
            .collect()
    }

    pub fn set_item_state(&mut self, detector_id: &str, state: DetectorState) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == detector_id) {
            item.cur_state = state;
        }
    }

    pub fn remove_items(&mut self, ids: &[String]) {
        let before = self.items.len();
        self.items.retain(|item| !ids.contains(&item.id));
        self.total = self.total.saturating_sub(before - self.items.len());
        for id in ids {
            self.selected.remove(id);
            self.monitors.remove(id);
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectorDetailState {
    pub detector_id: Option<String>,
    pub detector: Option<Detector>,
    pub is_loading: bool,
    pub error: Option<String>,
    #[serde(skip)]
    tracker: RequestTracker,
}

impl DetectorDetailState {
    pub fn begin_load(&mut self, detector_id: &str) -> RequestTicket {
        if self.detector_id.as_deref() != Some(detector_id) {
            self.detector = None;
        }
        self.detector_id = Some(detector_id.to_string());
        self.is_loading = true;
        self.error = None;
        self.tracker.issue()
    }

    pub fn finish_load(&mut self, ticket: RequestTicket, result: Result<Detector, String>) -> bool {
        if !self.tracker.is_current(ticket) {
            tracing::debug!(?ticket, "dropping stale detector response");
            return false;
        }
        self.is_loading = false;
        match result {
            Ok(detector) => {
                self.detector = Some(detector);
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }
}

/// Raw anomaly payload for the results page; the heatmap is derived from it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnomalyResultsState {
    pub detector_id: Option<String>,
    pub range: Option<DateRange>,
    pub summaries: Vec<EntityAnomalySummaries>,
    pub samples: Vec<AnomalyRecord>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Bumped whenever a payload is stored.
    pub revision: u64,
    #[serde(skip)]
    tracker: RequestTracker,
}

#[derive(Clone, Debug)]
pub enum AnomalyPayload {
    Summaries(Vec<EntityAnomalySummaries>),
    Samples(Vec<AnomalyRecord>),
}

impl AnomalyPayload {
    pub fn kind(&self) -> HeatmapDataKind {
        match self {
            Self::Summaries(_) => HeatmapDataKind::Aggregated,
            Self::Samples(_) => HeatmapDataKind::Sample,
        }
    }
}

impl AnomalyResultsState {
    pub fn begin_load(&mut self, detector_id: &str, range: DateRange) -> RequestTicket {
        if self.detector_id.as_deref() != Some(detector_id) {
            self.summaries.clear();
            self.samples.clear();
        }
        self.detector_id = Some(detector_id.to_string());
        self.range = Some(range);
        self.is_loading = true;
        self.error = None;
        self.tracker.issue()
    }

    pub fn finish_load(
        &mut self,
        ticket: RequestTicket,
        result: Result<AnomalyPayload, String>,
    ) -> bool {
        if !self.tracker.is_current(ticket) {
            tracing::debug!(?ticket, "dropping stale anomaly results response");
            return false;
        }
        self.is_loading = false;
        match result {
            Ok(payload) => {
                tracing::debug!(kind = ?payload.kind(), "storing anomaly results");
                match payload {
                    AnomalyPayload::Summaries(summaries) => self.summaries = summaries,
                    AnomalyPayload::Samples(samples) => self.samples = samples,
                }
                self.error = None;
                self.revision += 1;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperationState {
    pub last_message: Option<String>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl OperationState {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            last_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn failure(
        status: Option<u16>,
        context: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        let message = match (detail, status) {
            (Some(detail), _) => detail,
            (None, Some(status)) => http_status_advice(status).to_string(),
            (None, None) => http_status_advice(0).to_string(),
        };
        Self {
            last_message: None,
            error: Some(message),
            last_status: status,
            context: Some(context.into()),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppState {
    pub detector_list: DetectorListState,
    pub detector: DetectorDetailState,
    pub results: AnomalyResultsState,
    pub operation: OperationState,
}

#[derive(Clone, Copy)]
pub struct AppActions {
    state: AppSignal,
}

impl AppActions {
    pub fn new(state: AppSignal) -> Self {
        Self { state }
    }

    fn update<R>(&self, edit: impl FnOnce(&mut AppState) -> R) -> R {
        let mut signal = self.state;
        let mut state = signal.write();
        edit(&mut state)
    }

    pub fn begin_list_load(&self, params: GetDetectorsQueryParams) -> RequestTicket {
        self.update(|state| state.detector_list.begin_load(params))
    }

    pub fn finish_list_load(
        &self,
        ticket: RequestTicket,
        result: Result<DetectorListPage, String>,
    ) -> bool {
        self.update(|state| state.detector_list.finish_load(ticket, result))
    }

    pub fn set_list_monitors(&self, ticket: RequestTicket, monitors: HashMap<String, Monitor>) {
        self.update(|state| state.detector_list.set_monitors(ticket, monitors));
    }

    pub fn toggle_state_filter(&self, detector_state: DetectorState) {
        self.update(|state| state.detector_list.filters.toggle_state(detector_state));
    }

    pub fn clear_state_filters(&self) {
        self.update(|state| state.detector_list.filters = DetectorListFilters::default());
    }

    pub fn toggle_selected(&self, detector_id: &str) {
        self.update(|state| state.detector_list.toggle_selected(detector_id));
    }

    pub fn set_all_selected(&self, ids: Vec<String>, selected: bool) {
        self.update(|state| state.detector_list.set_all_selected(ids, selected));
    }

    pub fn set_item_state(&self, detector_id: &str, detector_state: DetectorState) {
        self.update(|state| {
            state.detector_list.set_item_state(detector_id, detector_state);
            if let Some(detector) = state.detector.detector.as_mut() {
                if detector.id == detector_id {
                    detector.cur_state = detector_state;
                }
            }
        });
    }

    pub fn remove_detectors(&self, ids: &[String]) {
        self.update(|state| state.detector_list.remove_items(ids));
    }

    pub fn begin_detector_load(&self, detector_id: &str) -> RequestTicket {
        self.update(|state| state.detector.begin_load(detector_id))
    }

    pub fn finish_detector_load(
        &self,
        ticket: RequestTicket,
        result: Result<Detector, String>,
    ) -> bool {
        self.update(|state| state.detector.finish_load(ticket, result))
    }

    pub fn set_detector(&self, detector: Detector) {
        self.update(|state| {
            state.detector.detector_id = Some(detector.id.clone());
            state.detector.detector = Some(detector);
            state.detector.error = None;
        });
    }

    pub fn begin_results_load(&self, detector_id: &str, range: DateRange) -> RequestTicket {
        self.update(|state| state.results.begin_load(detector_id, range))
    }

    pub fn finish_results_load(
        &self,
        ticket: RequestTicket,
        result: Result<AnomalyPayload, String>,
    ) -> bool {
        self.update(|state| state.results.finish_load(ticket, result))
    }

    pub fn set_operation_success(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(%message, "operation succeeded");
        self.update(|state| state.operation = OperationState::success(message));
    }

    pub fn set_operation_error(&self, message: impl Into<String>) {
        self.update(|state| {
            state.operation = OperationState {
                error: Some(message.into()),
                ..OperationState::default()
            }
        });
    }

    pub fn record_http_failure(
        &self,
        status: Option<u16>,
        context: impl Into<String>,
        detail: Option<String>,
    ) {
        let context = context.into();
        tracing::error!(?status, %context, ?detail, "backend request failed");
        self.update(|state| state.operation = OperationState::failure(status, context, detail));
    }

    pub fn record_client_error(&self, context: impl Into<String>, err: &ClientError) {
        let detail = match err {
            ClientError::Api { message, .. } => Some(message.clone()),
            _ => None,
        };
        self.record_http_failure(err.status().map(|status| status.as_u16()), context, detail);
    }

    pub fn clear_operation_status(&self) {
        self.update(|state| state.operation = OperationState::default());
    }
}

fn http_status_advice(status: u16) -> &'static str {
    match status {
        400 => "400 Bad request: check the detector definition and try again.",
        401 => "401 Unauthorized: the session token is missing or expired, sign in again.",
        403 => "403 Forbidden: your role lacks permission for anomaly detection.",
        404 => "404 Not found: the detector may have been deleted.",
        409 => "409 Conflict: the detector changed since it was loaded, refresh and retry.",
        429 => "429 Too many requests: wait a moment before retrying.",
        500..=599 => "The anomaly detection backend is unavailable, try again later.",
        _ => "Request failed, check the browser console for details.",
    }
}

pub fn use_app_state() -> AppSignal {
    use_context::<AppSignal>()
}

pub fn use_app_actions() -> AppActions {
    AppActions::new(use_app_state())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> DetectorListItem {
        DetectorListItem {
            id: id.into(),
            name: id.into(),
            ..Default::default()
        }
    }

    fn page(ids: &[&str]) -> DetectorListPage {
        DetectorListPage {
            detector_list: ids.iter().map(|id| item(id)).collect(),
            total_detectors: ids.len(),
        }
    }

    #[test]
    fn tracker_only_accepts_latest_ticket() {
        let mut tracker = RequestTracker::default();
        let first = tracker.issue();
        let second = tracker.issue();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
        let third = tracker.issue();
        assert!(!tracker.is_current(second));
        assert!(tracker.is_current(third));
    }

    #[test]
    fn stale_list_response_is_dropped() {
        let mut list = DetectorListState::default();
        let slow = list.begin_load(GetDetectorsQueryParams::default());
        let fast = list.begin_load(GetDetectorsQueryParams::default().with_search("cpu"));

        assert!(list.finish_load(fast, Ok(page(&["cpu"]))));
        assert!(!list.finish_load(slow, Ok(page(&["a", "b"]))));
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.params.search, "cpu");
        assert!(!list.is_loading);
    }

    #[test]
    fn reload_prunes_selection_and_monitors() {
        let mut list = DetectorListState::default();
        let ticket = list.begin_load(GetDetectorsQueryParams::default());
        list.finish_load(ticket, Ok(page(&["a", "b"])));
        list.toggle_selected("a");
        list.toggle_selected("b");
        list.monitors.insert("b".into(), Monitor::default());

        let ticket = list.begin_load(GetDetectorsQueryParams::default());
        list.finish_load(ticket, Ok(page(&["a"])));
        assert_eq!(list.selected.iter().collect::<Vec<_>>(), vec!["a"]);
        assert!(list.monitors.is_empty());
    }

    #[test]
    fn failed_load_keeps_previous_items() {
        let mut list = DetectorListState::default();
        let ticket = list.begin_load(GetDetectorsQueryParams::default());
        list.finish_load(ticket, Ok(page(&["a"])));
        let ticket = list.begin_load(GetDetectorsQueryParams::default());
        list.finish_load(ticket, Err("boom".into()));
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.error.as_deref(), Some("boom"));
    }

    #[test]
    fn removing_items_updates_total_and_selection() {
        let mut list = DetectorListState::default();
        let ticket = list.begin_load(GetDetectorsQueryParams::default());
        list.finish_load(ticket, Ok(page(&["a", "b", "c"])));
        list.set_all_selected(vec!["a".to_string(), "b".to_string()], true);
        assert_eq!(list.selected_items().len(), 2);

        list.remove_items(&["a".to_string()]);
        assert_eq!(list.total, 2);
        assert_eq!(list.selected.len(), 1);
        list.set_all_selected(Vec::new(), false);
        assert!(list.selected.is_empty());
    }

    #[test]
    fn detector_switch_clears_previous_detector() {
        let mut detail = DetectorDetailState::default();
        let ticket = detail.begin_load("d1");
        detail.finish_load(
            ticket,
            Ok(Detector {
                id: "d1".into(),
                ..Default::default()
            }),
        );
        detail.begin_load("d2");
        assert!(detail.detector.is_none());
        assert!(detail.is_loading);
    }

    #[test]
    fn results_keep_payload_kinds_apart() {
        let mut results = AnomalyResultsState::default();
        let range = DateRange::new(0, 1000);
        let ticket = results.begin_load("d1", range);
        let payload = AnomalyPayload::Samples(vec![AnomalyRecord::default()]);
        assert_eq!(payload.kind(), HeatmapDataKind::Sample);
        assert!(results.finish_load(ticket, Ok(payload)));
        assert_eq!(results.samples.len(), 1);
        assert!(results.summaries.is_empty());
        assert_eq!(results.range, Some(range));
        assert_eq!(results.revision, 1);
    }

    #[test]
    fn failure_message_prefers_backend_detail() {
        let op = OperationState::failure(Some(404), "load detector", None);
        assert!(op.error.as_deref().unwrap_or_default().starts_with("404"));
        let op = OperationState::failure(Some(400), "save", Some("Invalid interval".into()));
        assert_eq!(op.error.as_deref(), Some("Invalid interval"));
        assert_eq!(op.context.as_deref(), Some("save"));
        let op = OperationState::failure(None, "start", None);
        assert!(op.error.is_some());
    }
}
