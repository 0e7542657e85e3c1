//! Field validation rules. Every rule returns the message to show next to the
//! field, `None` when the value is acceptable.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;

use crate::features::{FeatureDraft, MAX_FEATURE_NUM};

pub const REQUIRED: &str = "Required";
pub const MUST_BE_NUMBER: &str = "Must be a number";
pub const MAX_NAME_SIZE: usize = 64;
pub const MAX_DESCRIPTION_SIZE: usize = 400;
pub const MAX_CATEGORY_FIELDS: usize = 2;
pub const NAME_IN_USE: &str = "Name is already in use";
pub const INVALID_NAME_CHARS: &str =
    "Valid characters are a-z, A-Z, 0-9, -(hyphen), _(underscore) and .(period)";

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-')
}

/// Shared rule for detector and feature names.
pub fn validate_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return Some(REQUIRED.to_string());
    }
    if name.chars().count() > MAX_NAME_SIZE {
        return Some(format!("Name cannot exceed {MAX_NAME_SIZE} characters"));
    }
    if !name.chars().all(is_name_char) {
        return Some(INVALID_NAME_CHARS.to_string());
    }
    None
}

/// Full detector name check, including the backend uniqueness lookup.
/// `original` is the saved name when editing, which may be kept as is.
/// A failed lookup does not block the form.
pub async fn validate_detector_name<F, Fut, E>(
    name: &str,
    original: Option<&str>,
    name_exists: F,
) -> Option<String>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Display,
{
    if let Some(error) = validate_name(name) {
        return Some(error);
    }
    let name = name.trim();
    if original.map(str::trim) == Some(name) {
        return None;
    }
    match name_exists(name.to_string()).await {
        Ok(true) => Some(NAME_IN_USE.to_string()),
        Ok(false) => None,
        Err(err) => {
            tracing::warn!(%name, "detector name lookup failed: {err}");
            None
        }
    }
}

/// Per-row errors for a detector's feature list; names only need to be
/// unique within this list.
pub fn validate_feature_names(features: &[FeatureDraft]) -> Vec<Option<String>> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for feature in features {
        *counts.entry(feature.name.trim()).or_default() += 1;
    }

    features
        .iter()
        .map(|feature| {
            validate_name(&feature.name).or_else(|| {
                (counts.get(feature.name.trim()).copied().unwrap_or_default() > 1)
                    .then(|| NAME_IN_USE.to_string())
            })
        })
        .collect()
}

pub fn validate_feature_count(count: usize) -> Option<String> {
    (count > MAX_FEATURE_NUM).then(|| format!("You can add up to {MAX_FEATURE_NUM} features"))
}

pub fn validate_description(description: &str) -> Option<String> {
    (description.chars().count() > MAX_DESCRIPTION_SIZE)
        .then(|| format!("Description cannot exceed {MAX_DESCRIPTION_SIZE} characters"))
}

pub fn validate_required(value: &str) -> Option<String> {
    value.trim().is_empty().then(|| REQUIRED.to_string())
}

pub fn validate_positive_integer(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(REQUIRED.to_string());
    }
    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => None,
        _ => Some("Must be a positive integer".to_string()),
    }
}

pub fn validate_non_negative_integer(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(REQUIRED.to_string());
    }
    match value.trim().parse::<u32>() {
        Ok(_) => None,
        Err(_) => Some("Must be a non-negative integer".to_string()),
    }
}

pub fn validate_category_fields(fields: &[String]) -> Option<String> {
    (fields.len() > MAX_CATEGORY_FIELDS)
        .then(|| format!("You can select up to {MAX_CATEGORY_FIELDS} category fields"))
}

/// Parses a numeric form value; blank input is `None`.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

/// A filled-in numeric field, or the message to show under it.
fn required_number(value: &str) -> Result<f64, String> {
    if value.trim().is_empty() {
        return Err(REQUIRED.to_string());
    }
    parse_number(value).ok_or_else(|| MUST_BE_NUMBER.to_string())
}

pub fn validate_range_start(start: &str, end: &str) -> Option<String> {
    let start = match required_number(start) {
        Ok(start) => start,
        Err(message) => return Some(message),
    };
    match parse_number(end) {
        Some(end) if start >= end => Some("Start value should be less than end value".to_string()),
        _ => None,
    }
}

pub fn validate_range_end(start: &str, end: &str) -> Option<String> {
    let end = match required_number(end) {
        Ok(end) => end,
        Err(message) => return Some(message),
    };
    match parse_number(start) {
        Some(start) if end <= start => {
            Some("End value should be greater than start value".to_string())
        }
        _ => None,
    }
}
