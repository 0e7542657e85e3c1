use dioxus::prelude::*;
use futures::future::join_all;

use crate::api::AdClient;
use crate::detectors::{
    detectors_for_action, get_detector_monitors, group_monitors_by_detector, BatchActionReport,
    DetectorAction,
};
use crate::models::{DetectorListItem, DetectorState};
use crate::query::GetDetectorsQueryParams;
use crate::state::{use_app_actions, AppActions};
use crate::API_CLIENT;

/// Reloads the detector list whenever the route's query params change.
pub fn use_detector_list(params: GetDetectorsQueryParams) {
    let actions = use_app_actions();

    use_future(use_reactive!(|params| async move {
        load_detector_list(actions, params).await;
    }));
}

pub async fn load_detector_list(actions: AppActions, params: GetDetectorsQueryParams) {
    let Some(client) = API_CLIENT.get().cloned() else {
        actions.set_operation_error("The anomaly detection API client is not configured");
        return;
    };

    let ticket = actions.begin_list_load(params.clone());
    tracing::debug!(query = %params, "loading detector list");

    let page = match client.list_detectors(&params).await {
        Ok(page) => page,
        Err(err) => {
            if actions.finish_list_load(ticket, Err(err.to_string())) {
                actions.record_client_error("Unable to load detectors", &err);
            }
            return;
        }
    };

    let items = page.detector_list.clone();
    if !actions.finish_list_load(ticket, Ok(page)) {
        return;
    }

    let ids: Vec<String> = items.iter().map(|item| item.id.clone()).collect();
    match client.search_monitors(&ids).await {
        Ok(monitors) => {
            let grouped = group_monitors_by_detector(monitors);
            actions.set_list_monitors(ticket, get_detector_monitors(&items, &grouped));
        }
        Err(err) => tracing::warn!("monitor lookup failed: {err}"),
    }
}

async fn run_action(
    client: &AdClient,
    action: DetectorAction,
    detector_id: &str,
) -> Result<(), String> {
    let result = match action {
        DetectorAction::Start => client.start_detector(detector_id).await,
        DetectorAction::Stop => client.stop_detector(detector_id).await,
        DetectorAction::Delete => client.delete_detector(detector_id).await,
    };
    result.map(|_| ()).map_err(|err| err.to_string())
}

/// State a detector moves to right after `action` succeeds.
fn state_after(action: DetectorAction) -> Option<DetectorState> {
    match action {
        DetectorAction::Start => Some(DetectorState::Init),
        DetectorAction::Stop => Some(DetectorState::Disabled),
        DetectorAction::Delete => None,
    }
}

/// Runs `action` concurrently on every eligible item and reports the outcome
/// through the operation toast.
pub async fn run_batch_action(
    actions: AppActions,
    action: DetectorAction,
    items: Vec<DetectorListItem>,
) -> BatchActionReport {
    let eligible = detectors_for_action(&items, action);
    let Some(client) = API_CLIENT.get().cloned() else {
        actions.set_operation_error("The anomaly detection API client is not configured");
        return BatchActionReport::default();
    };
    if eligible.is_empty() {
        actions.set_operation_error(format!(
            "None of the selected detectors can be {}",
            action.past_tense()
        ));
        return BatchActionReport::default();
    }

    tracing::info!(%action, count = eligible.len(), "running batch detector action");
    let outcomes = join_all(eligible.iter().map(|item| {
        let client = &client;
        async move { (item, run_action(client, action, &item.id).await) }
    }))
    .await;

    let mut done = Vec::new();
    for (item, outcome) in &outcomes {
        match outcome {
            Ok(()) => done.push(item.id.clone()),
            Err(err) => {
                tracing::warn!(detector = %item.id, %action, "detector action failed: {err}")
            }
        }
    }

    match state_after(action) {
        Some(next) => done.iter().for_each(|id| actions.set_item_state(id, next)),
        None => actions.remove_detectors(&done),
    }
    actions.set_all_selected(Vec::new(), false);

    let report = BatchActionReport::collect(
        outcomes
            .into_iter()
            .map(|(item, outcome)| (item.name.clone(), outcome)),
    );
    if report.is_success() {
        actions.set_operation_success(report.summary(action));
    } else {
        actions.record_http_failure(
            None,
            format!("{} detectors", action.verb()),
            Some(report.summary(action)),
        );
    }
    report
}

/// Runs `action` on one detector, e.g. from the configuration page header.
pub async fn run_detector_action(
    actions: AppActions,
    action: DetectorAction,
    detector_id: String,
) -> bool {
    let Some(client) = API_CLIENT.get().cloned() else {
        actions.set_operation_error("The anomaly detection API client is not configured");
        return false;
    };
    match run_action(&client, action, &detector_id).await {
        Ok(()) => {
            match state_after(action) {
                Some(next) => actions.set_item_state(&detector_id, next),
                None => actions.remove_detectors(&[detector_id.clone()]),
            }
            actions.set_operation_success(format!("Detector {}", action.past_tense()));
            true
        }
        Err(message) => {
            actions.record_http_failure(None, format!("{} detector", action.verb()), Some(message));
            false
        }
    }
}
