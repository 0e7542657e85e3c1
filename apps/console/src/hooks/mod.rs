pub mod anomaly_results;
pub mod detector;
pub mod detector_list;
