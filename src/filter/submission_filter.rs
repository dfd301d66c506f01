use serde_json::{json, Value};

use super::error::FilterError;

/// Query parameter prefix for per-field equality filters,
/// e.g. `?filter_age=30` filters on submission field `age`.
pub const FIELD_FILTER_PREFIX: &str = "filter_";

/// Query parameter for the substring search over the whole data blob.
pub const SEARCH_PARAM: &str = "search";

/// Equality predicate on one submission data field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPredicate {
    pub field_id: String,
    pub value: String,
}

/// SQL fragment produced by a filter: WHERE clauses with positional
/// placeholders and the values to bind, in placeholder order.
#[derive(Debug, Clone)]
pub struct SqlConditions {
    pub clauses: Vec<String>,
    pub params: Vec<Value>,
}

/// Typed filter over a schema's submissions, built from request query
/// parameters. Field predicates are validated against the schema's declared
/// field ids, so arbitrary request keys never reach the SQL layer. All
/// conditions combine with AND; a repeated `filter_<fieldId>` key adds one
/// predicate per occurrence.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub search: Option<String>,
    pub predicates: Vec<FieldPredicate>,
}

impl SubmissionFilter {
    /// Build from raw query pairs. Pairs (not a map) so repeated keys
    /// survive; each occurrence contributes its own predicate.
    pub fn from_query(
        params: &[(String, String)],
        allowed_fields: &[&str],
    ) -> Result<Self, FilterError> {
        let mut filter = SubmissionFilter::default();

        // Sort for a deterministic predicate order regardless of how the
        // framework hands us the query string.
        let mut entries: Vec<(&String, &String)> = params.iter().map(|(k, v)| (k, v)).collect();
        entries.sort();

        for (key, value) in entries {
            if key == SEARCH_PARAM {
                if !value.is_empty() {
                    filter.search = Some(value.clone());
                }
            } else if let Some(field_id) = key.strip_prefix(FIELD_FILTER_PREFIX) {
                if field_id.is_empty() || value.is_empty() {
                    return Err(FilterError::EmptyValue(field_id.to_string()));
                }
                if !allowed_fields.contains(&field_id) {
                    return Err(FilterError::UnknownField(field_id.to_string()));
                }
                filter.predicates.push(FieldPredicate {
                    field_id: field_id.to_string(),
                    value: value.clone(),
                });
            }
            // Unrelated query parameters are ignored
        }

        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.predicates.is_empty()
    }

    /// Render the filter as AND-ed SQL conditions over a JSONB `data`
    /// column. Placeholders start at `starting_param_index + 1`.
    pub fn to_sql(&self, starting_param_index: usize) -> SqlConditions {
        let mut clauses = vec![];
        let mut params = vec![];
        let mut index = starting_param_index;

        if let Some(search) = &self.search {
            index += 1;
            clauses.push(format!("data::text ILIKE ${}", index));
            params.push(Value::String(format!("%{}%", escape_like(search))));
        }

        for predicate in &self.predicates {
            index += 1;
            clauses.push(format!("data @> ${}::jsonb", index));
            params.push(json!({ predicate.field_id.clone(): predicate.value.clone() }));
        }

        SqlConditions { clauses, params }
    }
}

/// Escape LIKE metacharacters so a search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
