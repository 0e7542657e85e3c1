//! Feature definitions and their backend aggregation queries.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub const MAX_FEATURE_NUM: usize = 5;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMethod {
    Avg,
    Sum,
    Min,
    Max,
    ValueCount,
}

impl AggregationMethod {
    pub const ALL: [AggregationMethod; 5] = [
        Self::Avg,
        Self::Sum,
        Self::Min,
        Self::Max,
        Self::ValueCount,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::ValueCount => "value_count",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Avg => "average()",
            Self::Sum => "sum()",
            Self::Min => "min()",
            Self::Max => "max()",
            Self::ValueCount => "count()",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|method| method.as_str() == value)
    }
}

/// How a feature's value is computed for each detection interval.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "featureType", rename_all = "snake_case")]
pub enum Feature {
    SimpleAggregation {
        field: String,
        method: AggregationMethod,
        enabled: bool,
    },
    CustomAggregation {
        expression: String,
        enabled: bool,
    },
}

impl Feature {
    pub fn enabled(&self) -> bool {
        match self {
            Self::SimpleAggregation { enabled, .. } | Self::CustomAggregation { enabled, .. } => {
                *enabled
            }
        }
    }

    pub fn set_enabled(&mut self, value: bool) {
        match self {
            Self::SimpleAggregation { enabled, .. } | Self::CustomAggregation { enabled, .. } => {
                *enabled = value
            }
        }
    }

    pub fn aggregation_query(&self, feature_name: &str) -> Result<Value, FeatureError> {
        match self {
            Self::SimpleAggregation { field, method, .. } => {
                if field.trim().is_empty() {
                    return Err(FeatureError::MissingField);
                }
                let mut metric = Map::new();
                metric.insert(method.as_str().to_string(), json!({ "field": field }));
                let mut query = Map::new();
                query.insert(feature_name.to_string(), Value::Object(metric));
                Ok(Value::Object(query))
            }
            Self::CustomAggregation { expression, .. } => parse_custom_expression(expression),
        }
    }

    /// Recovers the form representation from a stored feature. Queries that
    /// are not a single supported metric on one field come back as custom.
    pub fn from_attributes(attributes: &FeatureAttributes) -> Self {
        let enabled = attributes.feature_enabled;
        if let Some((method, field)) = simple_aggregation(&attributes.aggregation_query) {
            return Self::SimpleAggregation {
                field,
                method,
                enabled,
            };
        }
        Self::CustomAggregation {
            expression: serde_json::to_string_pretty(&attributes.aggregation_query)
                .unwrap_or_default(),
            enabled,
        }
    }
}

fn simple_aggregation(query: &Value) -> Option<(AggregationMethod, String)> {
    let (_, body) = single_entry(query.as_object()?)?;
    let (method, params) = single_entry(body.as_object()?)?;
    let method = AggregationMethod::parse(method)?;
    let params = params.as_object()?;
    if params.len() != 1 {
        return None;
    }
    let field = params.get("field")?.as_str()?;
    Some((method, field.to_string()))
}

fn single_entry(map: &Map<String, Value>) -> Option<(&String, &Value)> {
    if map.len() == 1 {
        map.iter().next()
    } else {
        None
    }
}

/// A custom expression must be a JSON object naming exactly one aggregation.
pub fn parse_custom_expression(expression: &str) -> Result<Value, FeatureError> {
    if expression.trim().is_empty() {
        return Err(FeatureError::EmptyExpression);
    }
    let value: Value = serde_json::from_str(expression)?;
    match value.as_object() {
        Some(map) if map.len() == 1 => Ok(value),
        Some(_) => Err(FeatureError::AggregationCount),
        None => Err(FeatureError::NotAnObject),
    }
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("Field is required")]
    MissingField,
    #[error("Custom expression is required")]
    EmptyExpression,
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Custom expression must be a JSON object")]
    NotAnObject,
    #[error("Custom expression must contain exactly one aggregation")]
    AggregationCount,
}

/// Feature as stored on a detector.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_id: Option<String>,
    pub feature_name: String,
    #[serde(default)]
    pub feature_enabled: bool,
    #[serde(default)]
    pub aggregation_query: Value,
}

/// One row of the feature form. `key` is stable across renders, new rows get
/// a fresh uuid.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureDraft {
    pub key: String,
    pub feature_id: Option<String>,
    pub name: String,
    pub feature: Feature,
}

impl FeatureDraft {
    pub fn new_simple() -> Self {
        Self {
            key: uuid::Uuid::new_v4().to_string(),
            feature_id: None,
            name: String::new(),
            feature: Feature::SimpleAggregation {
                field: String::new(),
                method: AggregationMethod::Sum,
                enabled: true,
            },
        }
    }

    pub fn from_attributes(attributes: &FeatureAttributes) -> Self {
        Self {
            key: attributes
                .feature_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            feature_id: attributes.feature_id.clone(),
            name: attributes.feature_name.clone(),
            feature: Feature::from_attributes(attributes),
        }
    }

    pub fn to_attributes(&self) -> Result<FeatureAttributes, FeatureError> {
        Ok(FeatureAttributes {
            feature_id: self.feature_id.clone(),
            feature_name: self.name.trim().to_string(),
            feature_enabled: self.feature.enabled(),
            aggregation_query: self.feature.aggregation_query(self.name.trim())?,
        })
    }
}
