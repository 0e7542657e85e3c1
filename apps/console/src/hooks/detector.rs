use dioxus::prelude::*;

use crate::api::ClientError;
use crate::models::Detector;
use crate::state::{use_app_actions, AppActions};
use crate::validation::validate_detector_name;
use crate::API_CLIENT;

/// Loads one detector into the shared detail state; `None` (a detector
/// still being created) loads nothing.
pub fn use_detector(detector_id: Option<String>) {
    let actions = use_app_actions();

    use_future(use_reactive!(|detector_id| async move {
        if let Some(detector_id) = detector_id {
            load_detector(actions, detector_id).await;
        }
    }));
}

pub async fn load_detector(actions: AppActions, detector_id: String) {
    let Some(client) = API_CLIENT.get().cloned() else {
        actions.set_operation_error("The anomaly detection API client is not configured");
        return;
    };

    let ticket = actions.begin_detector_load(&detector_id);
    match client.get_detector(&detector_id).await {
        Ok(detector) => {
            actions.finish_detector_load(ticket, Ok(detector));
        }
        Err(err) => {
            tracing::error!(%detector_id, status = ?err.status(), "detector fetch failed: {err}");
            if actions.finish_detector_load(ticket, Err(err.to_string())) {
                actions.record_client_error("Unable to load detector", &err);
            }
        }
    }
}

/// Creates the detector when `detector_id` is `None`, updates it otherwise.
pub async fn save_detector(
    actions: AppActions,
    detector_id: Option<String>,
    detector: Detector,
) -> Result<Detector, ClientError> {
    let Some(client) = API_CLIENT.get().cloned() else {
        actions.set_operation_error("The anomaly detection API client is not configured");
        return Err(ClientError::Internal("API client is not configured".into()));
    };

    let result = match detector_id.as_deref() {
        Some(id) => client.update_detector(id, &detector).await,
        None => client.create_detector(&detector).await,
    };

    match &result {
        Ok(saved) => {
            tracing::info!(detector_id = %saved.id, name = %saved.name, "detector saved");
            actions.set_detector(saved.clone());
            actions.set_operation_success(format!("Detector {} saved", saved.name));
        }
        Err(err) => actions.record_client_error("Unable to save detector", err),
    }
    result
}

/// Name field check including the backend uniqueness lookup.
pub async fn check_detector_name(name: String, original: Option<String>) -> Option<String> {
    validate_detector_name(&name, original.as_deref(), |candidate| async move {
        match API_CLIENT.get() {
            Some(client) => client.detector_name_exists(&candidate).await,
            None => Err(ClientError::Internal("API client is not configured".into())),
        }
    })
    .await
}
