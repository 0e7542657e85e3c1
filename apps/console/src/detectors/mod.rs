//! Detector bulk actions and monitor association.

pub mod list;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{DetectorListItem, DetectorState, Monitor};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DetectorAction {
    Start,
    Stop,
    Delete,
}

impl DetectorAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Delete => "delete",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
            Self::Delete => "Delete",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Delete => "deleted",
        }
    }

    pub fn allows(self, state: DetectorState) -> bool {
        match self {
            Self::Start => matches!(
                state,
                DetectorState::Disabled
                    | DetectorState::InitFailure
                    | DetectorState::UnexpectedFailure
            ),
            Self::Stop => matches!(
                state,
                DetectorState::Init | DetectorState::Running | DetectorState::FeatureRequired
            ),
            Self::Delete => true,
        }
    }
}

impl fmt::Display for DetectorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for DetectorAction {
    type Err = UnknownAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "delete" => Ok(Self::Delete),
            _ => Err(UnknownAction(value.to_string())),
        }
    }
}

/// Items eligible for `action`, in input order.
pub fn detectors_for_action(
    detectors: &[DetectorListItem],
    action: DetectorAction,
) -> Vec<DetectorListItem> {
    detectors
        .iter()
        .filter(|detector| action.allows(detector.cur_state))
        .cloned()
        .collect()
}

/// Same as [`detectors_for_action`] for a raw action tag; unknown tags select nothing.
pub fn get_detectors_for_action(
    detectors: &[DetectorListItem],
    action: &str,
) -> Vec<DetectorListItem> {
    match action.parse::<DetectorAction>() {
        Ok(action) => detectors_for_action(detectors, action),
        Err(UnknownAction(tag)) => {
            tracing::debug!(%tag, "ignoring unknown detector action");
            Vec::new()
        }
    }
}

/// Maps each detector to its associated monitor. Detectors without monitors
/// are left out; when several monitors reference one detector the first wins.
pub fn get_detector_monitors(
    detectors: &[DetectorListItem],
    monitors: &HashMap<String, Vec<Monitor>>,
) -> HashMap<String, Monitor> {
    detectors
        .iter()
        .filter_map(|detector| {
            monitors
                .get(&detector.id)
                .and_then(|list| list.first())
                .map(|monitor| (detector.id.clone(), monitor.clone()))
        })
        .collect()
}

/// Groups a flat monitor search result by the detector each monitor watches.
pub fn group_monitors_by_detector(monitors: Vec<Monitor>) -> HashMap<String, Vec<Monitor>> {
    let mut grouped: HashMap<String, Vec<Monitor>> = HashMap::new();
    for monitor in monitors {
        if let Some(detector_id) = monitor.detector_id.clone() {
            grouped.entry(detector_id).or_default().push(monitor);
        }
    }
    grouped
}

/// Outcome of running one action over a set of detectors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchActionReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchActionReport {
    /// Collects per-detector results, keyed by detector name.
    pub fn collect<E: fmt::Display>(
        results: impl IntoIterator<Item = (String, Result<(), E>)>,
    ) -> Self {
        let mut report = Self::default();
        for (name, result) in results {
            match result {
                Ok(()) => report.succeeded.push(name),
                Err(err) => report.failed.push((name, err.to_string())),
            }
        }
        report
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self, action: DetectorAction) -> String {
        let verb = action.as_str();
        if self.failed.is_empty() {
            return format!("Successfully ran {verb} on {} detector(s)", self.succeeded.len());
        }
        let failures = self
            .failed
            .iter()
            .map(|(name, err)| format!("{name}: {err}"))
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "Failed to {verb} {} of {} detector(s): {failures}",
            self.failed.len(),
            self.failed.len() + self.succeeded.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, state: DetectorState) -> DetectorListItem {
        DetectorListItem {
            id: id.into(),
            name: format!("detector-{id}"),
            cur_state: state,
            ..Default::default()
        }
    }

    fn all_states() -> Vec<DetectorListItem> {
        DetectorState::ALL
            .iter()
            .enumerate()
            .map(|(idx, state)| item(&idx.to_string(), *state))
            .collect()
    }

    fn states(items: &[DetectorListItem]) -> Vec<DetectorState> {
        items.iter().map(|item| item.cur_state).collect()
    }

    #[test]
    fn start_selects_stopped_and_failed_to_start() {
        let detectors = vec![
            item("a", DetectorState::Disabled),
            item("b", DetectorState::Init),
            item("c", DetectorState::Running),
            item("d", DetectorState::FeatureRequired),
            item("e", DetectorState::InitFailure),
            item("f", DetectorState::UnexpectedFailure),
        ];
        let eligible = get_detectors_for_action(&detectors, "START");
        assert_eq!(
            states(&eligible),
            vec![
                DetectorState::Disabled,
                DetectorState::InitFailure,
                DetectorState::UnexpectedFailure
            ]
        );
    }

    #[test]
    fn stop_selects_active_detectors() {
        let eligible = get_detectors_for_action(&all_states(), "stop");
        assert_eq!(
            states(&eligible),
            vec![
                DetectorState::Init,
                DetectorState::Running,
                DetectorState::FeatureRequired
            ]
        );
    }

    #[test]
    fn delete_keeps_everything_in_order() {
        let detectors = all_states();
        let eligible = get_detectors_for_action(&detectors, "delete");
        assert_eq!(eligible, detectors);
    }

    #[test]
    fn unknown_action_selects_nothing() {
        assert!(get_detectors_for_action(&all_states(), "restart").is_empty());
        assert!(get_detectors_for_action(&all_states(), "").is_empty());
        assert!(get_detectors_for_action(&[], "start").is_empty());
    }

    fn monitor(id: &str, detector: &str) -> Monitor {
        Monitor {
            id: id.into(),
            name: format!("monitor-{id}"),
            enabled: true,
            detector_id: Some(detector.into()),
        }
    }

    #[test]
    fn monitors_resolve_to_first_entry() {
        let detectors = vec![
            item("a", DetectorState::Running),
            item("b", DetectorState::Running),
            item("c", DetectorState::Running),
        ];
        let mut monitors = HashMap::new();
        monitors.insert("a".to_string(), vec![monitor("m1", "a"), monitor("m2", "a")]);
        monitors.insert("b".to_string(), Vec::new());

        let resolved = get_detector_monitors(&detectors, &monitors);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved["a"].id, "m1");
        assert!(!resolved.contains_key("b"));
        assert!(!resolved.contains_key("c"));
    }

    #[test]
    fn grouping_skips_unlinked_monitors() {
        let mut orphan = monitor("m3", "x");
        orphan.detector_id = None;
        let grouped =
            group_monitors_by_detector(vec![monitor("m1", "a"), orphan, monitor("m2", "a")]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["a"].len(), 2);
    }

    #[test]
    fn batch_report_summarizes_failures() {
        let report = BatchActionReport::collect(vec![
            ("a".to_string(), Ok(())),
            ("b".to_string(), Err("already stopped")),
        ]);
        assert!(!report.is_success());
        assert_eq!(
            report.summary(DetectorAction::Stop),
            "Failed to stop 1 of 2 detector(s): b: already stopped"
        );

        let ok = BatchActionReport::collect::<String>(vec![("a".to_string(), Ok(()))]);
        assert_eq!(ok.summary(DetectorAction::Start), "Successfully ran start on 1 detector(s)");
    }
}
