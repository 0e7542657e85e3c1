//! URL search-string state for the detector list.
//!
//! Parsing never fails: unknown keys are ignored and malformed values fall
//! back to the defaults below.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const DEFAULT_FROM: usize = 0;
pub const DEFAULT_SIZE: usize = 20;
pub const DEFAULT_SORT_FIELD: &str = "name";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GetDetectorsQueryParams {
    pub from: usize,
    pub size: usize,
    pub search: String,
    pub indices: String,
    pub sort_field: String,
    pub sort_direction: SortDirection,
}

impl Default for GetDetectorsQueryParams {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM,
            size: DEFAULT_SIZE,
            search: String::new(),
            indices: String::new(),
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_direction: SortDirection::Asc,
        }
    }
}

impl GetDetectorsQueryParams {
    pub fn parse(search: &str) -> Self {
        let raw = search.trim().trim_start_matches('?');
        let mut params = Self::default();

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "from" => params.from = value.trim().parse().unwrap_or(DEFAULT_FROM),
                "size" => params.size = value.trim().parse().unwrap_or(DEFAULT_SIZE),
                "search" => params.search = value.into_owned(),
                "indices" => params.indices = value.into_owned(),
                "sortField" => {
                    params.sort_field = if value.trim().is_empty() {
                        DEFAULT_SORT_FIELD.to_string()
                    } else {
                        value.into_owned()
                    }
                }
                "sortDirection" => params.sort_direction = SortDirection::parse(&value),
                _ => {}
            }
        }

        params
    }

    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("from", &self.from.to_string())
            .append_pair("size", &self.size.to_string())
            .append_pair("search", &self.search)
            .append_pair("indices", &self.indices)
            .append_pair("sortField", &self.sort_field)
            .append_pair("sortDirection", self.sort_direction.as_str())
            .finish()
    }

    /// Zero-based page index for the current `from`/`size` window.
    pub fn page_index(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.from / self.size
        }
    }

    pub fn with_page(&self, page_index: usize) -> Self {
        Self {
            from: page_index * self.size,
            ..self.clone()
        }
    }

    pub fn with_search(&self, search: &str) -> Self {
        Self {
            from: DEFAULT_FROM,
            search: search.trim().to_string(),
            ..self.clone()
        }
    }

    pub fn with_indices(&self, indices: &str) -> Self {
        Self {
            from: DEFAULT_FROM,
            indices: indices.trim().to_string(),
            ..self.clone()
        }
    }

    /// Changing the page size goes back to the first page.
    pub fn with_size(&self, size: usize) -> Self {
        Self {
            from: DEFAULT_FROM,
            size: size.max(1),
            ..self.clone()
        }
    }

    /// Sorting by the current field flips direction; a new field starts ascending.
    pub fn with_sort(&self, field: &str) -> Self {
        let sort_direction = if self.sort_field == field {
            self.sort_direction.toggled()
        } else {
            SortDirection::Asc
        };
        Self {
            sort_field: field.to_string(),
            sort_direction,
            ..self.clone()
        }
    }
}

impl fmt::Display for GetDetectorsQueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

/// Lets the router decode the list route's query string.
impl From<&str> for GetDetectorsQueryParams {
    fn from(search: &str) -> Self {
        Self::parse(search)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn page_size_change_resets_offset() {
        let params = GetDetectorsQueryParams::parse("from=40&size=20&search=cpu").with_size(50);
        assert_eq!(params.from, 0);
        assert_eq!(params.size, 50);
        assert_eq!(params.search, "cpu");
        assert_eq!(params.with_size(0).size, 1);
    }

    #[test]
    fn empty_search_yields_defaults() {
        assert_eq!(GetDetectorsQueryParams::parse(""), GetDetectorsQueryParams::default());
        let defaults = GetDetectorsQueryParams::parse("?");
        assert_eq!(defaults.from, 0);
        assert_eq!(defaults.size, 20);
        assert_eq!(defaults.search, "");
        assert_eq!(defaults.indices, "");
        assert_eq!(defaults.sort_field, "name");
        assert_eq!(defaults.sort_direction, SortDirection::Asc);
    }

    #[test]
    fn decodes_full_search_string() {
        let params = GetDetectorsQueryParams::parse(
            "from=100&size=5&indices=someIndex&search=test&sortField=name&sortDirection=desc",
        );
        assert_eq!(
            params,
            GetDetectorsQueryParams {
                from: 100,
                size: 5,
                search: "test".into(),
                indices: "someIndex".into(),
                sort_field: "name".into(),
                sort_direction: SortDirection::Desc,
            }
        );
    }

    #[test]
    fn malformed_values_fail_closed() {
        let params =
            GetDetectorsQueryParams::parse("?from=abc&size=-3&sortDirection=sideways&sortField=");
        assert_eq!(params, GetDetectorsQueryParams::default());
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        assert_eq!(
            GetDetectorsQueryParams::parse("sortDirection=DESC").sort_direction,
            SortDirection::Desc
        );
        assert_eq!(
            GetDetectorsQueryParams::parse("sortDirection=Asc").sort_direction,
            SortDirection::Asc
        );
    }

    #[test]
    fn paging_and_sorting_helpers() {
        let params = GetDetectorsQueryParams::parse("from=40&size=20&sortField=name");
        assert_eq!(params.page_index(), 2);
        assert_eq!(params.with_page(0).from, 0);

        let flipped = params.with_sort("name");
        assert_eq!(flipped.sort_direction, SortDirection::Desc);
        let other = flipped.with_sort("curState");
        assert_eq!(other.sort_field, "curState");
        assert_eq!(other.sort_direction, SortDirection::Asc);

        let searched = params.with_search("  cpu ");
        assert_eq!(searched.search, "cpu");
        assert_eq!(searched.from, 0);
    }

    fn arb_params() -> impl Strategy<Value = GetDetectorsQueryParams> {
        (
            0usize..100_000,
            0usize..1_000,
            ".{0,16}",
            "[a-z*,-]{0,16}",
            "[a-zA-Z]{1,12}",
            prop::bool::ANY,
        )
            .prop_map(|(from, size, search, indices, sort_field, desc)| {
                GetDetectorsQueryParams {
                    from,
                    size,
                    search,
                    indices,
                    sort_field,
                    sort_direction: if desc {
                        SortDirection::Desc
                    } else {
                        SortDirection::Asc
                    },
                }
            })
    }

    proptest! {
        #[test]
        fn encoding_round_trips(params in arb_params()) {
            let encoded = params.to_query_string();
            prop_assert_eq!(GetDetectorsQueryParams::parse(&encoded), params);
        }

        #[test]
        fn parse_never_panics(raw in ".{0,64}") {
            let parsed = GetDetectorsQueryParams::parse(&raw);
            let reparsed = GetDetectorsQueryParams::parse(&parsed.to_query_string());
            prop_assert_eq!(parsed, reparsed);
        }
    }
}
