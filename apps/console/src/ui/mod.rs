pub mod anomaly_results;
pub mod browser;
pub mod data_filters;
pub mod detector_config;
pub mod detector_list;
pub mod feature_editor;
pub mod fields;
pub mod notifications;
