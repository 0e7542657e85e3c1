//! Data filters applied to the source index before features are computed.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::validation::{
    parse_number, validate_range_end, validate_range_start, MUST_BE_NUMBER, REQUIRED,
};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
    #[default]
    Keyword,
    Text,
    Boolean,
    Date,
    Ip,
}

impl FieldType {
    pub const ALL: [FieldType; 6] = [
        Self::Number,
        Self::Keyword,
        Self::Text,
        Self::Boolean,
        Self::Date,
        Self::Ip,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Keyword => "keyword",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Ip => "ip",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Date)
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    #[default]
    Is,
    IsNot,
    IsNull,
    IsNotNull,
    Gt,
    Gte,
    Lt,
    Lte,
    InRange,
    NotInRange,
    StartsWith,
    NotStartsWith,
    Contains,
    NotContains,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 14] = [
        Self::Is,
        Self::IsNot,
        Self::IsNull,
        Self::IsNotNull,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::InRange,
        Self::NotInRange,
        Self::StartsWith,
        Self::NotStartsWith,
        Self::Contains,
        Self::NotContains,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Is => "is",
            Self::IsNot => "is not",
            Self::IsNull => "is null",
            Self::IsNotNull => "is not null",
            Self::Gt => "is greater than",
            Self::Gte => "is greater than or equal to",
            Self::Lt => "is less than",
            Self::Lte => "is less than or equal to",
            Self::InRange => "is in range",
            Self::NotInRange => "is not in range",
            Self::StartsWith => "starts with",
            Self::NotStartsWith => "does not start with",
            Self::Contains => "contains",
            Self::NotContains => "does not contain",
        }
    }

    /// Operators offered for a field of the given type.
    pub fn for_field_type(field_type: FieldType) -> Vec<FilterOperator> {
        let text_ops = [
            Self::StartsWith,
            Self::NotStartsWith,
            Self::Contains,
            Self::NotContains,
        ];
        let numeric_ops = [
            Self::Gt,
            Self::Gte,
            Self::Lt,
            Self::Lte,
            Self::InRange,
            Self::NotInRange,
        ];
        let mut operators = vec![Self::Is, Self::IsNot, Self::IsNull, Self::IsNotNull];
        if field_type.is_numeric() {
            operators.extend(numeric_ops);
        } else if matches!(field_type, FieldType::Keyword | FieldType::Text) {
            operators.extend(text_ops);
        }
        operators
    }

    pub fn needs_value(self) -> bool {
        !matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::InRange | Self::NotInRange
        )
    }

    pub fn is_range(self) -> bool {
        matches!(self, Self::InRange | Self::NotInRange)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataFilter {
    pub field_name: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataFilterErrors {
    pub field_name: Option<String>,
    pub value: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DataFilterErrors {
    pub fn is_empty(&self) -> bool {
        self.field_name.is_none()
            && self.value.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }
}

impl DataFilter {
    pub fn validate(&self) -> DataFilterErrors {
        let mut errors = DataFilterErrors::default();
        if self.field_name.trim().is_empty() {
            errors.field_name = Some(REQUIRED.to_string());
        }

        if self.operator.is_range() {
            errors.start = validate_range_start(&self.start, &self.end);
            errors.end = validate_range_end(&self.start, &self.end);
        } else if self.operator.needs_value() {
            if self.value.trim().is_empty() {
                errors.value = Some(REQUIRED.to_string());
            } else if self.field_type.is_numeric()
                && matches!(
                    self.operator,
                    FilterOperator::Gt
                        | FilterOperator::Gte
                        | FilterOperator::Lt
                        | FilterOperator::Lte
                )
                && parse_number(&self.value).is_none()
            {
                errors.value = Some(MUST_BE_NUMBER.to_string());
            }
        }
        errors
    }

    fn typed_value(&self) -> Value {
        let raw = self.value.trim();
        match self.field_type {
            FieldType::Number => parse_number(raw).map(Value::from).unwrap_or_else(|| json!(raw)),
            FieldType::Boolean => raw
                .parse::<bool>()
                .map(Value::Bool)
                .unwrap_or_else(|_| json!(raw)),
            _ => json!(raw),
        }
    }

    /// Query DSL clause for this filter.
    pub fn to_query(&self) -> Value {
        let field = self.field_name.as_str();
        let value = self.typed_value();
        let range = |bounds: Value| json!({ "range": { field: bounds } });
        let must_not = |clause: Value| json!({ "bool": { "must_not": [clause] } });

        match self.operator {
            FilterOperator::Is => json!({ "term": { field: value } }),
            FilterOperator::IsNot => must_not(json!({ "term": { field: value } })),
            FilterOperator::IsNull => must_not(json!({ "exists": { "field": field } })),
            FilterOperator::IsNotNull => json!({ "exists": { "field": field } }),
            FilterOperator::Gt => range(json!({ "gt": value })),
            FilterOperator::Gte => range(json!({ "gte": value })),
            FilterOperator::Lt => range(json!({ "lt": value })),
            FilterOperator::Lte => range(json!({ "lte": value })),
            FilterOperator::InRange | FilterOperator::NotInRange => {
                let clause = range(json!({
                    "gte": parse_number(&self.start),
                    "lte": parse_number(&self.end),
                }));
                if self.operator == FilterOperator::InRange {
                    clause
                } else {
                    must_not(clause)
                }
            }
            FilterOperator::StartsWith => json!({ "prefix": { field: value } }),
            FilterOperator::NotStartsWith => must_not(json!({ "prefix": { field: value } })),
            FilterOperator::Contains => wildcard_query(field, self.value.trim()),
            FilterOperator::NotContains => must_not(wildcard_query(field, self.value.trim())),
        }
    }
}

fn wildcard_query(field: &str, value: &str) -> Value {
    json!({
        "query_string": {
            "query": format!("*{value}*"),
            "default_field": field,
        }
    })
}

/// Combined filter query for a detector, `match_all` when no filter is set.
pub fn filters_to_query(filters: &[DataFilter]) -> Value {
    if filters.is_empty() {
        return json!({ "match_all": {} });
    }
    let clauses: Vec<Value> = filters.iter().map(DataFilter::to_query).collect();
    json!({ "bool": { "filter": clauses } })
}
