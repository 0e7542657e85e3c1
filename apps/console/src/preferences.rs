//! Per-browser UI preferences kept in local storage.

use gloo_storage::{LocalStorage, Storage};
use serde::{Deserialize, Serialize};

use crate::heatmap::{EntityOption, HeatmapDisplayOption, SortType, DEFAULT_TOP_N, TOP_N_OPTIONS};

const STORAGE_KEY: &str = "anomaly-console.preferences";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub heatmap_sort_type: SortType,
    pub heatmap_top_n: usize,
    pub page_size: Option<usize>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            heatmap_sort_type: SortType::Severity,
            heatmap_top_n: DEFAULT_TOP_N,
            page_size: None,
        }
    }
}

impl Preferences {
    /// Reads stored preferences; missing or unreadable entries give defaults.
    pub fn load() -> Self {
        match LocalStorage::get::<Preferences>(STORAGE_KEY) {
            Ok(preferences) => preferences.sanitized(),
            Err(err) => {
                tracing::debug!("no stored preferences: {err}");
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        if let Err(err) = LocalStorage::set(STORAGE_KEY, self) {
            tracing::warn!("failed to store preferences: {err}");
        }
    }

    /// Drops values the UI no longer offers.
    pub fn sanitized(mut self) -> Self {
        if !TOP_N_OPTIONS.contains(&self.heatmap_top_n) {
            self.heatmap_top_n = DEFAULT_TOP_N;
        }
        self.page_size = self.page_size.filter(|size| *size > 0);
        self
    }

    pub fn heatmap_display_option(&self) -> HeatmapDisplayOption {
        HeatmapDisplayOption {
            sort_type: self.heatmap_sort_type,
            entity_option: EntityOption::TopN(self.heatmap_top_n),
        }
    }

    /// Remembers the sort and top-N parts of a display option. Individual
    /// entity picks are per-detector and not stored.
    pub fn remember_heatmap(&mut self, option: &HeatmapDisplayOption) -> bool {
        let mut changed = false;
        if self.heatmap_sort_type != option.sort_type {
            self.heatmap_sort_type = option.sort_type;
            changed = true;
        }
        if let EntityOption::TopN(top_n) = option.entity_option {
            if self.heatmap_top_n != top_n {
                self.heatmap_top_n = top_n;
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_stale_values() {
        let stored: Preferences =
            serde_json::from_str(r#"{"heatmapSortType":"occurrence","heatmapTopN":7,"pageSize":0}"#)
                .unwrap();
        let preferences = stored.sanitized();
        assert_eq!(preferences.heatmap_sort_type, SortType::Occurrence);
        assert_eq!(preferences.heatmap_top_n, DEFAULT_TOP_N);
        assert_eq!(preferences.page_size, None);
    }

    #[test]
    fn missing_keys_use_defaults() {
        let stored: Preferences = serde_json::from_str("{}").unwrap();
        assert_eq!(stored, Preferences::default());
    }

    #[test]
    fn remembers_sort_and_top_n_only() {
        let mut preferences = Preferences::default();
        let changed = preferences.remember_heatmap(&HeatmapDisplayOption {
            sort_type: SortType::Occurrence,
            entity_option: EntityOption::Individual(vec!["host: a".into()]),
        });
        assert!(changed);
        assert_eq!(preferences.heatmap_top_n, DEFAULT_TOP_N);

        let changed = preferences.remember_heatmap(&HeatmapDisplayOption {
            sort_type: SortType::Occurrence,
            entity_option: EntityOption::TopN(30),
        });
        assert!(changed);
        assert_eq!(preferences.heatmap_display_option().entity_option, EntityOption::TopN(30));
        let current = preferences.heatmap_display_option();
        assert!(!preferences.remember_heatmap(&current));
    }
}
