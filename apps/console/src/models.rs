use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::FeatureAttributes;
use crate::filters::DataFilter;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectorState {
    Disabled,
    Init,
    Running,
    FeatureRequired,
    InitFailure,
    UnexpectedFailure,
    Failed,
}

impl DetectorState {
    pub const ALL: [DetectorState; 7] = [
        Self::Disabled,
        Self::Init,
        Self::Running,
        Self::FeatureRequired,
        Self::InitFailure,
        Self::UnexpectedFailure,
        Self::Failed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Disabled => "Stopped",
            Self::Init => "Initializing",
            Self::Running => "Running",
            Self::FeatureRequired => "Feature required",
            Self::InitFailure => "Initialization failure",
            Self::UnexpectedFailure => "Unexpected failure",
            Self::Failed => "Failed",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Self::Running => "bg-emerald-100 text-emerald-800",
            Self::Init => "bg-sky-100 text-sky-800",
            Self::Disabled => "bg-slate-100 text-slate-700",
            Self::FeatureRequired => "bg-amber-100 text-amber-800",
            Self::InitFailure | Self::UnexpectedFailure | Self::Failed => {
                "bg-red-100 text-red-800"
            }
        }
    }
}

impl Default for DetectorState {
    fn default() -> Self {
        DetectorState::Disabled
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectorListItem {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub cur_state: DetectorState,
    #[serde(default)]
    pub feature_attributes_count: usize,
    #[serde(default)]
    pub total_anomalies: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active_time_ms: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time_ms: Option<i64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorListPage {
    #[serde(default)]
    pub detector_list: Vec<DetectorListItem>,
    #[serde(default)]
    pub total_detectors: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Detector {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub time_field: String,
    #[serde(default)]
    pub detection_interval_minutes: u32,
    #[serde(default)]
    pub window_delay_minutes: u32,
    #[serde(default)]
    pub category_fields: Vec<String>,
    #[serde(default)]
    pub feature_attributes: Vec<FeatureAttributes>,
    #[serde(default)]
    pub filters: Vec<DataFilter>,
    /// Query DSL built from `filters`, sent alongside them on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_query: Option<Value>,
    #[serde(default)]
    pub cur_state: DetectorState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time_ms: Option<i64>,
}

impl Detector {
    pub fn is_multi_entity(&self) -> bool {
        !self.category_fields.is_empty()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detector_id: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Entity {
    pub name: String,
    pub value: String,
}

pub const ENTITY_LABEL_DELIMITER: &str = "\n";

/// Axis label for an entity list, e.g. `host: i-1\nregion: us-east`.
pub fn entity_label(entities: &[Entity]) -> String {
    entities
        .iter()
        .map(|entity| format!("{}: {}", entity.name, entity.value))
        .collect::<Vec<_>>()
        .join(ENTITY_LABEL_DELIMITER)
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl DateRange {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    pub fn span_ms(&self) -> i64 {
        (self.end_ms - self.start_ms).max(0)
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms <= self.end_ms
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnomalySummaryBucket {
    pub start_ms: i64,
    #[serde(default)]
    pub end_ms: i64,
    #[serde(default)]
    pub max_anomaly_grade: f64,
    #[serde(default)]
    pub anomaly_count: u32,
}

/// Pre-aggregated anomaly buckets for one entity, as returned by the summary endpoint.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnomalySummaries {
    pub entity: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub buckets: Vec<AnomalySummaryBucket>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRecord {
    #[serde(default)]
    pub entity: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub start_ms: i64,
    #[serde(default)]
    pub end_ms: i64,
    #[serde(default)]
    pub anomaly_grade: f64,
    #[serde(default)]
    pub confidence: f64,
}

impl AnomalyRecord {
    pub fn is_anomaly(&self) -> bool {
        self.anomaly_grade > 0.0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyResultsPage {
    #[serde(default)]
    pub anomalies: Vec<AnomalyRecord>,
    #[serde(default)]
    pub total: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySummaryPayload {
    #[serde(default)]
    pub entities: Vec<EntityAnomalySummaries>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameMatch {
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub matched: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSearchPayload {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectorActionResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub result: Option<Value>,
}
