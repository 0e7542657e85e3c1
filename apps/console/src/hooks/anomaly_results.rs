use dioxus::prelude::*;

use crate::heatmap::builder::HeatmapDataKind;
use crate::models::DateRange;
use crate::state::{use_app_actions, AnomalyPayload, AppActions};
use crate::API_CLIENT;

/// Fetches the anomaly payload behind the heatmap once the data kind is
/// known. Summary data is limited server-side to `top_n` entities, so
/// `top_n` only matters for that kind.
pub fn use_anomaly_results(
    detector_id: String,
    range: DateRange,
    kind: Option<HeatmapDataKind>,
    top_n: usize,
) {
    let actions = use_app_actions();
    let fetch_top_n = match kind {
        Some(kind) if kind.refetches_on_top_n_change() => top_n,
        _ => 0,
    };

    use_future(use_reactive!(|detector_id, range, kind, fetch_top_n| async move {
        if let Some(kind) = kind {
            load_anomaly_results(actions, detector_id, range, kind, fetch_top_n).await;
        }
    }));
}

pub async fn load_anomaly_results(
    actions: AppActions,
    detector_id: String,
    range: DateRange,
    kind: HeatmapDataKind,
    top_n: usize,
) {
    let Some(client) = API_CLIENT.get().cloned() else {
        actions.set_operation_error("The anomaly detection API client is not configured");
        return;
    };

    let ticket = actions.begin_results_load(&detector_id, range);
    tracing::debug!(%detector_id, ?kind, top_n, "loading anomaly results");

    let result = match kind {
        HeatmapDataKind::Aggregated => client
            .get_entity_summaries(&detector_id, range, top_n)
            .await
            .map(AnomalyPayload::Summaries),
        HeatmapDataKind::Sample => client
            .get_anomaly_results(&detector_id, range)
            .await
            .map(|page| AnomalyPayload::Samples(page.anomalies)),
    };

    match result {
        Ok(payload) => {
            actions.finish_results_load(ticket, Ok(payload));
        }
        Err(err) => {
            if actions.finish_results_load(ticket, Err(err.to_string())) {
                actions.record_client_error("Unable to load anomaly results", &err);
            }
        }
    }
}
