//! Form view models for creating and editing detectors.

use crate::features::{FeatureDraft, FeatureError};
use crate::filters::{filters_to_query, DataFilter, DataFilterErrors};
use crate::models::Detector;
use crate::validation::{
    validate_category_fields, validate_description, validate_feature_count,
    validate_feature_names, validate_name, validate_non_negative_integer,
    validate_positive_integer, validate_required,
};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 10;
pub const DEFAULT_WINDOW_DELAY_MINUTES: u32 = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct DetectorDefinitionForm {
    pub name: String,
    pub description: String,
    pub indices: Vec<String>,
    pub time_field: String,
    pub interval: String,
    pub window_delay: String,
    pub category_fields: Vec<String>,
    pub filters: Vec<DataFilter>,
}

impl Default for DetectorDefinitionForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            indices: Vec::new(),
            time_field: String::new(),
            interval: DEFAULT_INTERVAL_MINUTES.to_string(),
            window_delay: DEFAULT_WINDOW_DELAY_MINUTES.to_string(),
            category_fields: Vec::new(),
            filters: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefinitionErrors {
    pub name: Option<String>,
    pub description: Option<String>,
    pub indices: Option<String>,
    pub time_field: Option<String>,
    pub interval: Option<String>,
    pub window_delay: Option<String>,
    pub category_fields: Option<String>,
    pub filters: Vec<DataFilterErrors>,
}

impl DefinitionErrors {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.indices.is_none()
            && self.time_field.is_none()
            && self.interval.is_none()
            && self.window_delay.is_none()
            && self.category_fields.is_none()
            && self.filters.iter().all(DataFilterErrors::is_empty)
    }
}

impl DetectorDefinitionForm {
    pub fn from_detector(detector: &Detector) -> Self {
        Self {
            name: detector.name.clone(),
            description: detector.description.clone(),
            indices: detector.indices.clone(),
            time_field: detector.time_field.clone(),
            interval: detector.detection_interval_minutes.to_string(),
            window_delay: detector.window_delay_minutes.to_string(),
            category_fields: detector.category_fields.clone(),
            filters: detector.filters.clone(),
        }
    }

    /// Synchronous checks only; name uniqueness runs separately.
    pub fn validate(&self) -> DefinitionErrors {
        DefinitionErrors {
            name: validate_name(&self.name),
            description: validate_description(&self.description),
            indices: self
                .indices
                .iter()
                .all(|index| index.trim().is_empty())
                .then(|| "Must specify an index".to_string()),
            time_field: validate_required(&self.time_field),
            interval: validate_positive_integer(&self.interval),
            window_delay: validate_non_negative_integer(&self.window_delay),
            category_fields: validate_category_fields(&self.category_fields),
            filters: self.filters.iter().map(DataFilter::validate).collect(),
        }
    }

    /// Writes the form into `detector`, or returns the field errors.
    pub fn apply_to(&self, detector: &mut Detector) -> Result<(), DefinitionErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        detector.name = self.name.trim().to_string();
        detector.description = self.description.trim().to_string();
        detector.indices = self
            .indices
            .iter()
            .map(|index| index.trim().to_string())
            .filter(|index| !index.is_empty())
            .collect();
        detector.time_field = self.time_field.trim().to_string();
        detector.detection_interval_minutes = self
            .interval
            .trim()
            .parse()
            .unwrap_or(DEFAULT_INTERVAL_MINUTES);
        detector.window_delay_minutes = self
            .window_delay
            .trim()
            .parse()
            .unwrap_or(DEFAULT_WINDOW_DELAY_MINUTES);
        detector.category_fields = self.category_fields.clone();
        detector.filters = self.filters.clone();
        detector.filter_query = Some(filters_to_query(&self.filters));
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureListForm {
    pub features: Vec<FeatureDraft>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureListErrors {
    pub count: Option<String>,
    pub names: Vec<Option<String>>,
    pub definitions: Vec<Option<String>>,
}

impl FeatureListErrors {
    pub fn is_empty(&self) -> bool {
        self.count.is_none()
            && self.names.iter().all(Option::is_none)
            && self.definitions.iter().all(Option::is_none)
    }
}

impl FeatureListForm {
    pub fn from_detector(detector: &Detector) -> Self {
        Self {
            features: detector
                .feature_attributes
                .iter()
                .map(FeatureDraft::from_attributes)
                .collect(),
        }
    }

    pub fn add(&mut self) {
        self.features.push(FeatureDraft::new_simple());
    }

    pub fn remove(&mut self, key: &str) {
        self.features.retain(|feature| feature.key != key);
    }

    pub fn update(&mut self, key: &str, edit: impl FnOnce(&mut FeatureDraft)) {
        if let Some(feature) = self.features.iter_mut().find(|feature| feature.key == key) {
            edit(feature);
        }
    }

    pub fn validate(&self) -> FeatureListErrors {
        FeatureListErrors {
            count: validate_feature_count(self.features.len()),
            names: validate_feature_names(&self.features),
            definitions: self
                .features
                .iter()
                .map(|feature| {
                    feature
                        .feature
                        .aggregation_query(feature.name.trim())
                        .err()
                        .map(|err: FeatureError| err.to_string())
                })
                .collect(),
        }
    }

    pub fn apply_to(&self, detector: &mut Detector) -> Result<(), FeatureListErrors> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        let attributes = self
            .features
            .iter()
            .map(FeatureDraft::to_attributes)
            .collect::<Result<Vec<_>, _>>();
        match attributes {
            Ok(attributes) => {
                detector.feature_attributes = attributes;
                Ok(())
            }
            Err(err) => Err(FeatureListErrors {
                count: Some(err.to_string()),
                ..Default::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::features::{AggregationMethod, Feature};
    use crate::filters::FilterOperator;
    use crate::validation::REQUIRED;

    fn valid_form() -> DetectorDefinitionForm {
        DetectorDefinitionForm {
            name: "cpu-detector".into(),
            indices: vec!["metrics-*".into()],
            time_field: "@timestamp".into(),
            ..Default::default()
        }
    }

    #[test]
    fn default_form_reports_required_fields() {
        let errors = DetectorDefinitionForm::default().validate();
        assert_eq!(errors.name.as_deref(), Some(REQUIRED));
        assert!(errors.indices.is_some());
        assert_eq!(errors.time_field.as_deref(), Some(REQUIRED));
        assert!(errors.interval.is_none());
        assert!(!errors.is_empty());
    }

    #[test]
    fn valid_form_applies_to_detector() {
        let mut detector = Detector::default();
        let mut form = valid_form();
        form.interval = " 5 ".into();
        form.indices.push("  ".into());
        form.apply_to(&mut detector).unwrap();
        assert_eq!(detector.name, "cpu-detector");
        assert_eq!(detector.indices, vec!["metrics-*"]);
        assert_eq!(detector.detection_interval_minutes, 5);
        assert_eq!(detector.window_delay_minutes, DEFAULT_WINDOW_DELAY_MINUTES);

        let round_trip = DetectorDefinitionForm::from_detector(&detector);
        assert_eq!(round_trip.interval, "5");
    }

    #[test]
    fn saved_detector_carries_the_filter_query() {
        let mut detector = Detector::default();
        let mut form = valid_form();
        form.apply_to(&mut detector).unwrap();
        assert_eq!(detector.filter_query, Some(json!({ "match_all": {} })));

        form.filters.push(DataFilter {
            field_name: "host".into(),
            operator: FilterOperator::Is,
            value: "web-1".into(),
            ..Default::default()
        });
        form.apply_to(&mut detector).unwrap();
        assert_eq!(
            detector.filter_query,
            Some(json!({ "bool": { "filter": [ { "term": { "host": "web-1" } } ] } }))
        );
        let body = serde_json::to_value(&detector).unwrap();
        assert_eq!(body["filterQuery"]["bool"]["filter"][0]["term"]["host"], "web-1");
    }

    #[test]
    fn feature_list_validation_and_apply() {
        let mut form = FeatureListForm::default();
        form.add();
        let key = form.features[0].key.clone();
        let errors = form.validate();
        assert_eq!(errors.names[0].as_deref(), Some(REQUIRED));
        assert!(errors.definitions[0].is_some());

        form.update(&key, |draft| {
            draft.name = "bytes_sum".into();
            draft.feature = Feature::SimpleAggregation {
                field: "bytes".into(),
                method: AggregationMethod::Sum,
                enabled: true,
            };
        });
        let mut detector = Detector::default();
        form.apply_to(&mut detector).unwrap();
        assert_eq!(detector.feature_attributes.len(), 1);
        assert_eq!(detector.feature_attributes[0].feature_name, "bytes_sum");

        form.remove(&key);
        assert!(form.features.is_empty());
    }

    #[test]
    fn feature_limit_is_enforced() {
        let mut form = FeatureListForm::default();
        for _ in 0..6 {
            form.add();
        }
        assert!(form.validate().count.is_some());
    }
}
